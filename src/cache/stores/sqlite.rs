//! Record store over a single SQLite key/value table
//!
//! Models a size-constrained persistent key/value medium: records larger than
//! the configured ceiling are rejected with [`StorageError::QuotaExceeded`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::cache::error::StorageError;
use crate::cache::storage::{RecordStore, StoreKind};

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    max_record_bytes: usize,
}

impl SqliteRecordStore {
    pub fn new(db_path: &Path, max_record_bytes: usize) -> Result<Self, StorageError> {
        info!("Initializing record database at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        debug!("Record table ready");

        Ok(Self {
            conn: Mutex::new(conn),
            max_record_bytes,
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    fn kind(&self) -> StoreKind {
        StoreKind::LocalStorage
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let conn = self.lock_conn()?;
        let found = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE key = ?1)",
            [key],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    async fn write(&self, key: &str, text: &str) -> Result<(), StorageError> {
        if text.len() > self.max_record_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size: text.len(),
                limit: self.max_record_bytes,
            });
        }

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO records (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            (key, text, Self::current_timestamp_ms()),
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM records WHERE key = ?1", [key])?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT key FROM records ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
