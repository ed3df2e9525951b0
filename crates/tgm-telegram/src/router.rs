use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use tgm_core::{
    config::Config,
    filter::{FilterEvaluator, WhatlangDetector},
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    registry::Registry,
    relay::Relayer,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub registry: Arc<dyn Registry>,
    pub messenger: Arc<dyn MessagingPort>,
    pub relayer: Arc<Relayer>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<dyn Registry>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let evaluator = FilterEvaluator::new(
            Arc::new(WhatlangDetector),
            cfg.language_min_chars,
            cfg.language_max_chars,
        );
        let relayer = Arc::new(Relayer::new(
            messenger.clone(),
            registry.clone(),
            evaluator,
        ));
        Self {
            cfg,
            registry,
            messenger,
            relayer,
        }
    }
}

pub async fn run_polling(cfg: Arc<Config>, registry: Arc<dyn Registry>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(bot = %me.username(), "tgm started"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        allowed_users = cfg.telegram_allowed_users.len(),
        database = %cfg.database_path.display(),
        "configuration loaded"
    );

    // Relays fan out to many watchers at once; the throttle keeps us under the
    // flood limits and the adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(ThrottledMessenger::new(raw_messenger, cfg.throttle));

    let state = Arc::new(AppState::new(cfg, registry, messenger));

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped");
    Ok(())
}
