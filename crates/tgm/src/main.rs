use std::sync::Arc;

use tracing::error;

use tgm_core::{config::Config, registry::Registry};
use tgm_store::SqliteRegistry;

#[tokio::main]
async fn main() -> Result<(), tgm_core::Error> {
    tgm_core::logging::init("tgm")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!(error = %e, "startup aborted");
            return Err(e);
        }
    };

    let registry: Arc<dyn Registry> = Arc::new(SqliteRegistry::open(&cfg.database_path)?);

    tgm_telegram::router::run_polling(cfg, registry)
        .await
        .map_err(|e| tgm_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
