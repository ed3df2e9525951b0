use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS watchers (
            id              INTEGER PRIMARY KEY,
            display_name    TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS targets (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            watcher_id      INTEGER NOT NULL REFERENCES watchers(id),
            account_id      INTEGER NOT NULL,
            account_handle  TEXT NOT NULL COLLATE NOCASE,
            group_id        INTEGER NOT NULL,
            group_name      TEXT NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            keywords        TEXT,
            language        TEXT,
            media_types     TEXT,
            UNIQUE(watcher_id, account_id, group_id)
        );

        CREATE INDEX IF NOT EXISTS idx_targets_active
            ON targets(is_active, group_id, account_id);

        CREATE TABLE IF NOT EXISTS relay_records (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            target_id           INTEGER NOT NULL REFERENCES targets(id),
            source_message_id   INTEGER NOT NULL,
            message_text        TEXT NOT NULL,
            media_type          TEXT NOT NULL,
            original_date       TEXT NOT NULL,
            relayed_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_relay_records_target
            ON relay_records(target_id, relayed_at);

        CREATE TABLE IF NOT EXISTS accounts (
            account_id      INTEGER PRIMARY KEY,
            handle          TEXT NOT NULL COLLATE NOCASE,
            last_seen       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_handle
            ON accounts(handle);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
