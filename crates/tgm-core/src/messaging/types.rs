use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, MessageRef, UserId},
    matcher::Originator,
    media::MediaDescriptor,
};

/// A message observed in a monitored group, already unwrapped from the transport.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Where the message lives (`chat_id` is the source group).
    pub source: MessageRef,
    pub originator: Originator,
    /// Handle of the immediate sender, used to keep the account directory fresh.
    pub sender_handle: Option<String>,
    pub text: Option<String>,
    pub media: Option<MediaDescriptor>,
    pub reply_to: Option<ParentMessage>,
    pub date: DateTime<Utc>,
}

impl InboundMessage {
    pub fn group_id(&self) -> ChatId {
        self.source.chat_id
    }
}

/// The message an inbound message replies to.
#[derive(Clone, Debug)]
pub struct ParentMessage {
    pub source: MessageRef,
    /// `None` when the parent's author cannot be determined.
    pub sender: Option<UserId>,
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
