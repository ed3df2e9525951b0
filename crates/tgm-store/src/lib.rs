//! SQLite implementation of the `tgm-core` registry port.

pub mod migrations;
mod queries;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use tgm_core::{errors::Error, Result};

pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(map_err)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(map_err)?;
        let registry = Self::init(conn)?;

        info!("Database opened at {}", path.display());
        Ok(registry)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(map_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(map_err)?;
        migrations::run(&conn).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| Error::Registry(format!("DB lock poisoned: {e}")))?;
        f(&mut conn).map_err(map_err)
    }
}

fn map_err(e: rusqlite::Error) -> Error {
    Error::Registry(format!("sqlite error: {e}"))
}
