//! Formatting utilities (Telegram HTML for relay headers and command replies).

use chrono::{DateTime, Utc};

use crate::{
    domain::{FilterRule, MediaCategory, Target},
    messaging::types::ParentMessage,
};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars.saturating_sub(3)).collect::<String>();
    out.push_str("...");
    out
}

/// `@handle`, or the bare id for accounts registered by numeric id.
pub fn display_handle(handle: &str) -> String {
    if !handle.is_empty() && handle.bytes().all(|b| b.is_ascii_digit()) {
        handle.to_string()
    } else {
        format!("@{}", escape_html(handle))
    }
}

/// Who wrote the message being replied to.
pub fn provenance_note(parent: &ParentMessage) -> String {
    match parent.sender {
        Some(id) => format!("Reply to a message from user {id}"),
        None => "Reply to a message from Unknown".to_string(),
    }
}

/// Header sent ahead of every relay.
pub fn relay_header(
    target: &Target,
    date: &DateTime<Utc>,
    media: MediaCategory,
    provenance: Option<&str>,
) -> String {
    let mut lines = vec![
        format!(
            "🎯 <b>New message from {}</b>",
            display_handle(&target.account_handle)
        ),
        format!("📍 Group: {}", escape_html(&target.group_name)),
        format!("🕒 Time: {}", format_timestamp(date)),
        format!("📎 Type: {media}"),
    ];
    if let Some(note) = provenance {
        lines.push(format!("↩️ {}", escape_html(note)));
    }
    lines.join("\n")
}

/// Body of the reply-anchored relay. Media-only messages get a placeholder
/// because Telegram rejects empty text.
pub fn reply_body(text: &str, media: MediaCategory, max_chars: usize) -> String {
    if text.trim().is_empty() {
        return format!("<i>[{media}]</i>");
    }
    escape_html(&truncate_text(text, max_chars))
}

pub fn filter_summary(rule: &FilterRule) -> String {
    let mut lines = Vec::new();
    if let Some(k) = rule.keywords_csv() {
        lines.push(format!("Keywords: {}", escape_html(&k)));
    }
    if let Some(l) = &rule.language {
        lines.push(format!("Language: {}", escape_html(l)));
    }
    if let Some(m) = rule.media_types_csv() {
        lines.push(format!("Media types: {m}"));
    }
    if lines.is_empty() {
        return "No filters set".to_string();
    }
    lines.join("\n")
}

/// `/viewtargets` listing.
pub fn target_list(targets: &[Target]) -> String {
    let mut out = String::from("🎯 <b>Your Active Targets:</b>\n");
    for (i, t) in targets.iter().enumerate() {
        let status = if t.filter.is_empty() {
            "No filters"
        } else {
            "Filtered"
        };
        out.push_str(&format!(
            "\n<b>{}.</b> {}\n   📍 Group: {}\n   🔧 Status: {status}\n   📅 Added: {}\n",
            i + 1,
            display_handle(&t.account_handle),
            escape_html(&t.group_name),
            t.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, MessageRef, TargetId, UserId};
    use chrono::TimeZone;

    fn target() -> Target {
        Target {
            id: TargetId(1),
            watcher_id: UserId(10),
            account_id: UserId(20),
            account_handle: "alice".to_string(),
            group_id: ChatId(-100),
            group_name: "Traders <VIP>".to_string(),
            active: true,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 0).unwrap(),
            filter: FilterRule::default(),
        }
    }

    #[test]
    fn header_contains_handle_group_time_and_type() {
        let date = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let h = relay_header(&target(), &date, MediaCategory::Photo, None);
        assert!(h.contains("@alice"));
        assert!(h.contains("Traders &lt;VIP&gt;"));
        assert!(h.contains("2024-05-06 07:08:09"));
        assert!(h.contains("Type: photo"));
        assert!(!h.contains("↩️"));
    }

    #[test]
    fn numeric_handle_renders_as_bare_id() {
        let mut by_id = target();
        by_id.account_handle = "5".to_string();
        let h = relay_header(&by_id, &Utc::now(), MediaCategory::Text, None);
        assert!(h.contains("New message from 5</b>"));
        assert!(!h.contains("@5"));
        assert!(target_list(&[by_id]).contains("<b>1.</b> 5\n"));
        assert_eq!(display_handle("alice"), "@alice");
    }

    #[test]
    fn header_includes_provenance_when_present() {
        let parent = ParentMessage {
            source: MessageRef {
                chat_id: ChatId(-100),
                message_id: MessageId(3),
            },
            sender: None,
        };
        let note = provenance_note(&parent);
        assert_eq!(note, "Reply to a message from Unknown");
        let h = relay_header(&target(), &Utc::now(), MediaCategory::Text, Some(&note));
        assert!(h.contains("↩️ Reply to a message from Unknown"));
    }

    #[test]
    fn reply_body_uses_placeholder_for_media_only() {
        assert_eq!(reply_body("  ", MediaCategory::Video, 100), "<i>[video]</i>");
        assert_eq!(reply_body("a<b", MediaCategory::Text, 100), "a&lt;b");
    }

    #[test]
    fn truncate_respects_char_limit() {
        let t = truncate_text(&"é".repeat(50), 10);
        assert_eq!(t.chars().count(), 10);
        assert!(t.ends_with("..."));
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn filter_summary_lists_set_fields() {
        let rule = FilterRule::from_input(Some("btc,eth"), Some("en"), None);
        assert_eq!(filter_summary(&rule), "Keywords: btc,eth\nLanguage: en");
        assert_eq!(filter_summary(&FilterRule::default()), "No filters set");
    }

    #[test]
    fn target_list_shows_status_and_added_date() {
        let mut filtered = target();
        filtered.filter = FilterRule::from_input(Some("x"), None, None);
        let out = target_list(&[target(), filtered]);
        assert!(out.contains("<b>1.</b> @alice"));
        assert!(out.contains("No filters"));
        assert!(out.contains("Filtered"));
        assert!(out.contains("📅 Added: 2024-03-01 08:05"));
    }
}
