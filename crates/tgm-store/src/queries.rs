use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

use tgm_core::{
    domain::{
        normalize_handle, ChatId, FilterRule, HistoryEntry, MediaCategory, MessageId,
        NewRelayRecord, NewTarget, RelayRecord, Target, TargetId, UserId, Watcher,
    },
    registry::Registry,
    Result,
};

use crate::SqliteRegistry;

const TARGET_COLS: &str = "id, watcher_id, account_id, account_handle, group_id, group_name, \
                           is_active, created_at, keywords, language, media_types";

#[async_trait]
impl Registry for SqliteRegistry {
    async fn ensure_watcher(&self, id: UserId, display_name: &str) -> Result<Watcher> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO watchers (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                params![id.0, display_name, ts(&Utc::now())],
            )?;
            query_watcher(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    async fn get_watcher(&self, id: UserId) -> Result<Option<Watcher>> {
        self.with_conn(|conn| query_watcher(conn, id))
    }

    async fn list_active_targets(&self) -> Result<Vec<Target>> {
        self.with_conn(|conn| {
            query_targets(
                conn,
                &format!("SELECT {TARGET_COLS} FROM targets WHERE is_active = 1 ORDER BY id"),
                params![],
            )
        })
    }

    async fn list_watcher_targets(&self, watcher: UserId) -> Result<Vec<Target>> {
        self.with_conn(|conn| {
            query_targets(
                conn,
                &format!(
                    "SELECT {TARGET_COLS} FROM targets
                     WHERE watcher_id = ?1 AND is_active = 1 ORDER BY id"
                ),
                [watcher.0],
            )
        })
    }

    async fn find_target(&self, watcher: UserId, handle: &str) -> Result<Option<Target>> {
        let handle = normalize_handle(handle);
        self.with_conn(|conn| query_active_by_handle(conn, watcher, &handle))
    }

    async fn upsert_target(&self, target: NewTarget) -> Result<Target> {
        let handle = normalize_handle(&target.account_handle);
        self.with_conn(|conn| {
            // The triple is unique regardless of status: a removed target comes back
            // with the same id (and its previous filters).
            conn.execute(
                "INSERT INTO targets
                    (watcher_id, account_id, account_handle, group_id, group_name, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
                 ON CONFLICT(watcher_id, account_id, group_id) DO UPDATE SET
                    is_active = 1,
                    account_handle = excluded.account_handle,
                    group_name = excluded.group_name",
                params![
                    target.watcher_id.0,
                    target.account_id.0,
                    handle,
                    target.group_id.0,
                    target.group_name,
                    ts(&Utc::now()),
                ],
            )?;

            conn.query_row(
                &format!(
                    "SELECT {TARGET_COLS} FROM targets
                     WHERE watcher_id = ?1 AND account_id = ?2 AND group_id = ?3"
                ),
                params![target.watcher_id.0, target.account_id.0, target.group_id.0],
                target_from_row,
            )
        })
    }

    async fn deactivate_target(&self, watcher: UserId, handle: &str) -> Result<bool> {
        let handle = normalize_handle(handle);
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE targets SET is_active = 0
                 WHERE watcher_id = ?1 AND account_handle = ?2 AND is_active = 1",
                params![watcher.0, handle],
            )?;
            Ok(n > 0)
        })
    }

    async fn set_filter(
        &self,
        watcher: UserId,
        handle: &str,
        rule: &FilterRule,
    ) -> Result<Option<Target>> {
        let handle = normalize_handle(handle);
        let keywords = rule.keywords_csv();
        let language = rule.language.clone();
        let media_types = rule.media_types_csv();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let n = tx.execute(
                "UPDATE targets SET keywords = ?3, language = ?4, media_types = ?5
                 WHERE watcher_id = ?1 AND account_handle = ?2 AND is_active = 1",
                params![watcher.0, handle, keywords, language, media_types],
            )?;
            if n == 0 {
                return Ok(None);
            }
            let updated = query_active_by_handle(&tx, watcher, &handle)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    async fn clear_filter(&self, watcher: UserId, handle: &str) -> Result<bool> {
        let handle = normalize_handle(handle);
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE targets SET keywords = NULL, language = NULL, media_types = NULL
                 WHERE watcher_id = ?1 AND account_handle = ?2 AND is_active = 1",
                params![watcher.0, handle],
            )?;
            Ok(n > 0)
        })
    }

    async fn append_relay_record(&self, record: NewRelayRecord) -> Result<RelayRecord> {
        let relayed_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO relay_records
                    (target_id, source_message_id, message_text, media_type, original_date, relayed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.target_id.0,
                    record.source_message_id.0,
                    record.text,
                    record.media_type.as_str(),
                    ts(&record.original_date),
                    ts(&relayed_at),
                ],
            )?;

            Ok(RelayRecord {
                id: conn.last_insert_rowid(),
                target_id: record.target_id,
                source_message_id: record.source_message_id,
                text: record.text.clone(),
                media_type: record.media_type,
                original_date: record.original_date,
                relayed_at,
            })
        })
    }

    async fn watcher_history(&self, watcher: UserId) -> Result<Vec<HistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.target_id, r.source_message_id, r.message_text, r.media_type,
                        r.original_date, r.relayed_at, t.account_handle, t.group_name
                 FROM relay_records r
                 JOIN targets t ON r.target_id = t.id
                 WHERE t.watcher_id = ?1
                 ORDER BY r.relayed_at, r.id",
            )?;

            let rows = stmt
                .query_map([watcher.0], |row| {
                    let media: String = row.get(4)?;
                    Ok(HistoryEntry {
                        record: RelayRecord {
                            id: row.get(0)?,
                            target_id: TargetId(row.get(1)?),
                            source_message_id: MessageId(row.get(2)?),
                            text: row.get(3)?,
                            media_type: media.parse().unwrap_or(MediaCategory::Media),
                            original_date: parse_ts(row, 5)?,
                            relayed_at: parse_ts(row, 6)?,
                        },
                        account_handle: row.get(7)?,
                        group_name: row.get(8)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(rows)
        })
    }

    async fn remember_account(&self, account: UserId, handle: &str) -> Result<()> {
        let handle = normalize_handle(handle);
        if handle.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (account_id, handle, last_seen) VALUES (?1, ?2, ?3)
                 ON CONFLICT(account_id) DO UPDATE SET
                    handle = excluded.handle,
                    last_seen = excluded.last_seen",
                params![account.0, handle, ts(&Utc::now())],
            )?;
            Ok(())
        })
    }

    async fn resolve_handle(&self, handle: &str) -> Result<Option<UserId>> {
        let handle = normalize_handle(handle);
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT account_id FROM accounts WHERE handle = ?1
                 ORDER BY last_seen DESC LIMIT 1",
                [&handle],
                |row| row.get(0).map(UserId),
            )
            .optional()
        })
    }
}

fn query_watcher(conn: &Connection, id: UserId) -> rusqlite::Result<Option<Watcher>> {
    conn.query_row(
        "SELECT id, display_name, created_at FROM watchers WHERE id = ?1",
        [id.0],
        |row| {
            Ok(Watcher {
                id: UserId(row.get(0)?),
                display_name: row.get(1)?,
                created_at: parse_ts(row, 2)?,
            })
        },
    )
    .optional()
}

fn query_active_by_handle(
    conn: &Connection,
    watcher: UserId,
    handle: &str,
) -> rusqlite::Result<Option<Target>> {
    conn.query_row(
        &format!(
            "SELECT {TARGET_COLS} FROM targets
             WHERE watcher_id = ?1 AND account_handle = ?2 AND is_active = 1
             ORDER BY id LIMIT 1"
        ),
        params![watcher.0, handle],
        target_from_row,
    )
    .optional()
}

fn query_targets<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<Target>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, target_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn target_from_row(row: &Row<'_>) -> rusqlite::Result<Target> {
    let keywords: Option<String> = row.get(8)?;
    let language: Option<String> = row.get(9)?;
    let media_types: Option<String> = row.get(10)?;

    Ok(Target {
        id: TargetId(row.get(0)?),
        watcher_id: UserId(row.get(1)?),
        account_id: UserId(row.get(2)?),
        account_handle: row.get(3)?,
        group_id: ChatId(row.get(4)?),
        group_name: row.get(5)?,
        active: row.get(6)?,
        created_at: parse_ts(row, 7)?,
        filter: FilterRule::from_input(
            keywords.as_deref(),
            language.as_deref(),
            media_types.as_deref(),
        ),
    })
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const W1: UserId = UserId(100);
    const W2: UserId = UserId(200);
    const ALICE: UserId = UserId(5);
    const GROUP: ChatId = ChatId(-1001);

    fn new_target(watcher: UserId, account: UserId, group: ChatId) -> NewTarget {
        NewTarget {
            watcher_id: watcher,
            account_id: account,
            account_handle: "@Alice".to_string(),
            group_id: group,
            group_name: "Traders".to_string(),
        }
    }

    async fn registry() -> SqliteRegistry {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.ensure_watcher(W1, "One").await.unwrap();
        reg.ensure_watcher(W2, "Two").await.unwrap();
        reg
    }

    #[tokio::test]
    async fn ensure_watcher_is_idempotent() {
        let reg = registry().await;
        let again = reg.ensure_watcher(W1, "Renamed").await.unwrap();
        assert_eq!(again.display_name, "One");
        assert!(reg.get_watcher(UserId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_strips_at_and_lists_active() {
        let reg = registry().await;
        let t = reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();
        assert_eq!(t.account_handle, "Alice");
        assert!(t.active);
        assert!(t.filter.is_empty());

        let found = reg.find_target(W1, "@alice").await.unwrap().unwrap();
        assert_eq!(found.id, t.id);
        assert_eq!(reg.list_active_targets().await.unwrap().len(), 1);
        assert_eq!(reg.list_watcher_targets(W2).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn reregistering_removed_target_reactivates_same_id() {
        let reg = registry().await;
        let first = reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();
        reg.set_filter(W1, "alice", &FilterRule::from_input(Some("btc"), None, None))
            .await
            .unwrap();

        assert!(reg.deactivate_target(W1, "alice").await.unwrap());
        assert!(reg.list_active_targets().await.unwrap().is_empty());
        assert!(reg.find_target(W1, "alice").await.unwrap().is_none());
        assert!(!reg.deactivate_target(W1, "alice").await.unwrap());

        let again = reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();
        assert_eq!(again.id, first.id);
        assert!(again.active);
        assert_eq!(again.filter.keywords, Some(vec!["btc".to_string()]));
    }

    #[tokio::test]
    async fn same_account_for_two_watchers_are_distinct_targets() {
        let reg = registry().await;
        let a = reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();
        let b = reg.upsert_target(new_target(W2, ALICE, GROUP)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(reg.list_active_targets().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn set_and_clear_filter_round_trip() {
        let reg = registry().await;
        reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();

        let rule = FilterRule::from_input(Some("alpha,beta"), Some("en"), Some("photo,video"));
        let updated = reg.set_filter(W1, "alice", &rule).await.unwrap().unwrap();
        assert_eq!(updated.filter, rule);

        assert!(reg.clear_filter(W1, "alice").await.unwrap());
        let cleared = reg.find_target(W1, "alice").await.unwrap().unwrap();
        assert!(cleared.filter.is_empty());

        assert!(reg.set_filter(W1, "nobody", &rule).await.unwrap().is_none());
        assert!(!reg.clear_filter(W1, "nobody").await.unwrap());
    }

    #[tokio::test]
    async fn relay_records_feed_history() {
        let reg = registry().await;
        let t = reg.upsert_target(new_target(W1, ALICE, GROUP)).await.unwrap();
        let original = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let rec = reg
            .append_relay_record(NewRelayRecord {
                target_id: t.id,
                source_message_id: MessageId(77),
                text: "this is beta test".to_string(),
                media_type: MediaCategory::Text,
                original_date: original,
            })
            .await
            .unwrap();
        assert!(rec.id > 0);

        // History survives target removal.
        reg.deactivate_target(W1, "alice").await.unwrap();
        let history = reg.watcher_history(W1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record.source_message_id, MessageId(77));
        assert_eq!(history[0].record.original_date, original);
        assert_eq!(history[0].account_handle, "Alice");
        assert!(reg.watcher_history(W2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn relay_record_requires_existing_target() {
        let reg = registry().await;
        let err = reg
            .append_relay_record(NewRelayRecord {
                target_id: TargetId(4242),
                source_message_id: MessageId(1),
                text: String::new(),
                media_type: MediaCategory::Text,
                original_date: Utc::now(),
            })
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn account_directory_tracks_latest_handle() {
        let reg = registry().await;
        reg.remember_account(ALICE, "alice").await.unwrap();
        assert_eq!(reg.resolve_handle("@ALICE").await.unwrap(), Some(ALICE));

        reg.remember_account(ALICE, "alice_new").await.unwrap();
        assert_eq!(reg.resolve_handle("alice").await.unwrap(), None);
        assert_eq!(reg.resolve_handle("alice_new").await.unwrap(), Some(ALICE));
    }
}
