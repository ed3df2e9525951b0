//! Telegram update handlers.
//!
//! Private chats carry the administrative commands; group and supergroup
//! messages feed the relay pipeline. Channel posts and edits are not routed.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

pub mod commands;
mod group;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.chat.is_private() {
        return commands::handle_private(bot, msg, state).await;
    }

    if msg.chat.is_group() || msg.chat.is_supergroup() {
        group::handle_group_message(&msg, &state).await;
    }

    Ok(())
}
