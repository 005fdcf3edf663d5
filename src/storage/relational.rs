//! Relational record engine
//!
//! A thin adapter over SQLite. Id allocation is the table's
//! `AUTOINCREMENT` column, so ids are never reused even across restarts,
//! and durability comes from SQLite's write-ahead journal with
//! `synchronous = FULL`.
//! Errors map onto the same kinds as the key-value engine: a missing row is
//! `NotFound`, everything else is a `Database` error (`ErrorKind::Io`).

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, VaultError};
use crate::record::Record;

use super::Storage;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
)";
const GET_USER: &str = "SELECT id, name FROM users WHERE id = ?1";
const ADD_USER: &str = "INSERT INTO users (name) VALUES (?1)";

/// Record engine backed by a SQLite database file
pub struct RelationalStorage {
    /// `None` once closed
    conn: Mutex<Option<Connection>>,
}

impl RelationalStorage {
    /// Open (creating if absent) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to open database");
            e
        })?;
        Self::init(conn)
    }

    /// Open a private in-memory database (tests, throwaway instances)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // In-memory databases report "memory"
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        tracing::debug!(%journal, "Initialized database");
        conn.execute(CREATE_TABLE, [])?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

impl Storage for RelationalStorage {
    fn set(&self, value: &str) -> Result<i64> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(VaultError::Closed)?;

        let mut stmt = conn.prepare_cached(ADD_USER)?;
        stmt.execute(params![value]).map_err(|e| {
            tracing::error!(error = %e, "Failed to insert record");
            e
        })?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, "Stored record");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Record> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(VaultError::Closed)?;

        let mut stmt = conn.prepare_cached(GET_USER)?;
        let record = stmt
            .query_row(params![id], |row| {
                Ok(Record {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;

        record.ok_or(VaultError::NotFound { id })
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take().ok_or(VaultError::Closed)?;
        tracing::info!("Closing database connection");
        conn.close().map_err(|(_, e)| VaultError::Database(e))
    }
}
