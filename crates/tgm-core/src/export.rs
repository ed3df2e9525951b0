//! CSV export of a watcher's relay history.

use chrono::{DateTime, Utc};

use crate::{domain::HistoryEntry, formatting::format_timestamp};

const HEADER: [&str; 7] = [
    "Message ID",
    "Target Username",
    "Group Name",
    "Message Text",
    "Media Type",
    "Original Date",
    "Tracked Date",
];

/// Render history as RFC 4180 CSV (CRLF line endings, quoted where needed).
pub fn history_csv(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().map(|s| s.to_string()));

    for e in entries {
        let r = &e.record;
        push_row(
            &mut out,
            [
                r.source_message_id.0.to_string(),
                e.account_handle.clone(),
                e.group_name.clone(),
                r.text.clone(),
                r.media_type.to_string(),
                format_timestamp(&r.original_date),
                format_timestamp(&r.relayed_at),
            ],
        );
    }
    out
}

/// `export_YYYYMMDD_HHMMSS.csv`
pub fn export_file_name(now: &DateTime<Utc>) -> String {
    format!("export_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row = fields
        .into_iter()
        .map(|f| escape_field(&f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MediaCategory, MessageId, RelayRecord, TargetId};
    use chrono::TimeZone;

    fn entry(text: &str) -> HistoryEntry {
        HistoryEntry {
            record: RelayRecord {
                id: 1,
                target_id: TargetId(1),
                source_message_id: MessageId(42),
                text: text.to_string(),
                media_type: MediaCategory::Photo,
                original_date: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
                relayed_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 7).unwrap(),
            },
            account_handle: "alice".to_string(),
            group_name: "Traders".to_string(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let csv = history_csv(&[entry("plain")]);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(
            lines[0],
            "Message ID,Target Username,Group Name,Message Text,Media Type,Original Date,Tracked Date"
        );
        assert_eq!(
            lines[1],
            "42,alice,Traders,plain,photo,2024-02-03 04:05:06,2024-02-03 04:05:07"
        );
    }

    #[test]
    fn quotes_fields_with_separators() {
        let csv = history_csv(&[entry("say \"hi\", then\nleave")]);
        assert!(csv.contains("\"say \"\"hi\"\", then\nleave\""));
    }

    #[test]
    fn file_name_uses_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap();
        assert_eq!(export_file_name(&now), "export_20241231_235901.csv");
    }
}
