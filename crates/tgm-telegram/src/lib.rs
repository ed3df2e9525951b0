//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgm-core` MessagingPort over Telegram Bot API and
//! turns incoming updates into `InboundMessage`s for the relay pipeline.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod inbound;
pub mod router;

use tgm_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn msg_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(retry_after = ?d, "telegram flood limit; retrying");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_html_reply(
        &self,
        chat_id: ChatId,
        html: &str,
        reply_to: MessageRef,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_to_message_id(Self::tg_msg_id(reply_to.message_id))
                    .allow_sending_without_reply(true)
            })
            .await?;

        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn forward_message(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot.forward_message(
                    Self::tg_chat(chat_id),
                    Self::tg_chat(source.chat_id),
                    Self::tg_msg_id(source.message_id),
                )
            })
            .await?;

        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption_html: &str,
    ) -> Result<MessageRef> {
        let file = InputFile::memory(bytes).file_name(file_name.to_string());
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_document(Self::tg_chat(chat_id), file.clone());
                if !caption_html.is_empty() {
                    req = req
                        .caption(caption_html.to_string())
                        .parse_mode(ParseMode::Html);
                }
                req
            })
            .await?;

        Ok(Self::msg_ref(chat_id, &msg))
    }
}
