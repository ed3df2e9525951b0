use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Groups and supergroups are negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, unique per chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Registry row id of a [`Target`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse media category of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Text,
    Photo,
    Video,
    Audio,
    Image,
    Document,
    Media,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 7] = [
        MediaCategory::Text,
        MediaCategory::Photo,
        MediaCategory::Video,
        MediaCategory::Audio,
        MediaCategory::Image,
        MediaCategory::Document,
        MediaCategory::Media,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Text => "text",
            MediaCategory::Photo => "photo",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Image => "image",
            MediaCategory::Document => "document",
            MediaCategory::Media => "media",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase();
        let found = MediaCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == norm);
        found.ok_or(norm)
    }
}

/// Per-target filter rules. `None` on a field means "no constraint".
///
/// Values held here are always normalized (trimmed, lower-cased, non-empty);
/// build them through [`FilterRule::from_input`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterRule {
    pub keywords: Option<Vec<String>>,
    pub language: Option<String>,
    pub media_types: Option<Vec<MediaCategory>>,
}

impl FilterRule {
    /// Normalize raw comma-separated input. Empty-after-trim fields become `None`
    /// and unknown media names are dropped (validate first to report them).
    pub fn from_input(
        keywords: Option<&str>,
        language: Option<&str>,
        media_types: Option<&str>,
    ) -> Self {
        let keywords = keywords.map(split_csv_lower).and_then(non_empty_vec);
        let language = language
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());
        let media_types = media_types
            .map(|m| {
                split_csv_lower(m)
                    .iter()
                    .filter_map(|s| s.parse::<MediaCategory>().ok())
                    .fold(Vec::new(), |mut acc, c| {
                        if !acc.contains(&c) {
                            acc.push(c);
                        }
                        acc
                    })
            })
            .and_then(non_empty_vec);

        Self {
            keywords,
            language,
            media_types,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_none() && self.language.is_none() && self.media_types.is_none()
    }

    pub fn keywords_csv(&self) -> Option<String> {
        self.keywords.as_ref().map(|k| k.join(","))
    }

    pub fn media_types_csv(&self) -> Option<String> {
        self.media_types.as_ref().map(|m| {
            m.iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

fn split_csv_lower(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

fn non_empty_vec<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// A registered end user who receives relayed content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Watcher {
    pub id: UserId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// A (monitored account, source group) pair a Watcher wants relayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub watcher_id: UserId,
    pub account_id: UserId,
    pub account_handle: String,
    pub group_id: ChatId,
    pub group_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub filter: FilterRule,
}

impl Target {
    /// Private chat with the owning Watcher.
    pub fn watcher_chat(&self) -> ChatId {
        ChatId(self.watcher_id.0)
    }
}

/// Input for registering (or reactivating) a Target.
#[derive(Clone, Debug)]
pub struct NewTarget {
    pub watcher_id: UserId,
    pub account_id: UserId,
    pub account_handle: String,
    pub group_id: ChatId,
    pub group_name: String,
}

/// Immutable history entry of one successful relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayRecord {
    pub id: i64,
    pub target_id: TargetId,
    pub source_message_id: MessageId,
    pub text: String,
    pub media_type: MediaCategory,
    pub original_date: DateTime<Utc>,
    pub relayed_at: DateTime<Utc>,
}

/// Input for appending a [`RelayRecord`].
#[derive(Clone, Debug)]
pub struct NewRelayRecord {
    pub target_id: TargetId,
    pub source_message_id: MessageId,
    pub text: String,
    pub media_type: MediaCategory,
    pub original_date: DateTime<Utc>,
}

/// A relay record joined with its target, for exports.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub record: RelayRecord,
    pub account_handle: String,
    pub group_name: String,
}

/// Strip a leading `@` from a user-supplied handle.
pub fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}
