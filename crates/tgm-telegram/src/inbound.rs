//! Telegram `Message` → `InboundMessage`.

use teloxide::types::{ForwardedFrom, Message, User};

use tgm_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    matcher::Originator,
    media::MediaDescriptor,
    messaging::types::{InboundMessage, ParentMessage},
};

pub fn to_inbound(msg: &Message) -> InboundMessage {
    let sender = direct_sender(msg);

    InboundMessage {
        source: msg_ref(msg),
        originator: Originator::resolve(sender.map(user_id), forward_origin(msg)),
        sender_handle: sender.and_then(|u| u.username.clone()),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        media: media_descriptor(msg),
        reply_to: msg.reply_to_message().map(|parent| ParentMessage {
            source: msg_ref(parent),
            sender: direct_sender(parent).map(user_id),
        }),
        date: msg.date,
    }
}

fn msg_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}

fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

/// The posting account. Messages sent on behalf of a chat (anonymous admins,
/// linked channels) have no account behind them.
fn direct_sender(msg: &Message) -> Option<&User> {
    if msg.sender_chat().is_some() {
        return None;
    }
    msg.from()
}

/// `None` when not forwarded; `Some(None)` when the original author is hidden.
fn forward_origin(msg: &Message) -> Option<Option<UserId>> {
    let forward = msg.forward()?;
    Some(match &forward.from {
        ForwardedFrom::User(user) => Some(user_id(user)),
        ForwardedFrom::Chat(_) | ForwardedFrom::SenderName(_) => None,
    })
}

/// Bot API payloads, expressed as photo / typed file / other.
fn media_descriptor(msg: &Message) -> Option<MediaDescriptor> {
    fn mime(m: Option<&impl ToString>, fallback: &str) -> Option<String> {
        Some(m.map_or_else(|| fallback.to_string(), ToString::to_string))
    }

    if msg.photo().is_some() {
        return Some(MediaDescriptor::photo());
    }
    if let Some(d) = msg.document() {
        return Some(MediaDescriptor::document(
            d.mime_type.as_ref().map(ToString::to_string),
        ));
    }
    if let Some(v) = msg.video() {
        return Some(MediaDescriptor::document(mime(v.mime_type.as_ref(), "video/mp4")));
    }
    if msg.video_note().is_some() {
        return Some(MediaDescriptor::document(Some("video/mp4".to_string())));
    }
    if let Some(a) = msg.animation() {
        return Some(MediaDescriptor::document(mime(a.mime_type.as_ref(), "video/mp4")));
    }
    if let Some(a) = msg.audio() {
        return Some(MediaDescriptor::document(mime(a.mime_type.as_ref(), "audio/mpeg")));
    }
    if let Some(v) = msg.voice() {
        return Some(MediaDescriptor::document(mime(v.mime_type.as_ref(), "audio/ogg")));
    }
    if msg.sticker().is_some() {
        return Some(MediaDescriptor::document(Some("image/webp".to_string())));
    }

    let other = if msg.location().is_some() {
        "location"
    } else if msg.venue().is_some() {
        "venue"
    } else if msg.contact().is_some() {
        "contact"
    } else if msg.poll().is_some() {
        "poll"
    } else if msg.dice().is_some() {
        "dice"
    } else {
        return None;
    };
    Some(MediaDescriptor::other(other))
}
