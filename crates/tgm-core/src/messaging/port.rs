use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound messaging port.
///
/// Telegram is the implementation; every call may fail with a transport error
/// (rate limiting, disconnect, missing permission).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Send text anchored as a reply to a message already in `chat_id`.
    async fn send_html_reply(
        &self,
        chat_id: ChatId,
        html: &str,
        reply_to: MessageRef,
    ) -> Result<MessageRef>;

    /// Forward `source` (from any chat the bot can read) into `chat_id`.
    async fn forward_message(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption_html: &str,
    ) -> Result<MessageRef>;
}
