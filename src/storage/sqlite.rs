//! SQLite-backed pair store.
//!
//! Items are stored as JSON blobs keyed by `(pk, sk)`. `rusqlite::Connection`
//! is not `Sync`, so the connection sits behind a `Mutex` and async lookups
//! hop onto the blocking pool.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::traits::DataLookup;
use crate::domain::LookupRecord;
use crate::error::{Result, VerimathError};
use crate::id::now_ms;

/// Pair store over a single SQLite database file.
#[derive(Clone)]
pub struct SqlitePairStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqlitePairStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePairStore").finish_non_exhaustive()
    }
}

impl SqlitePairStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "Opened pair store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                pk TEXT NOT NULL,
                sk TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                json_data TEXT NOT NULL,
                PRIMARY KEY (pk, sk)
            );

            CREATE INDEX IF NOT EXISTS idx_items_pk ON items(pk);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| VerimathError::Storage(e.to_string()))
    }

    /// Insert or replace an item.
    pub fn put(&self, pk: &str, sk: &str, record: &LookupRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO items (pk, sk, updated_at, json_data) VALUES (?1, ?2, ?3, ?4)",
            params![pk, sk, now_ms() as i64, json],
        )?;
        Ok(())
    }

    pub fn get(&self, pk: &str, sk: &str) -> Result<Option<LookupRecord>> {
        let json: Option<String> = self
            .lock()?
            .query_row(
                "SELECT json_data FROM items WHERE pk = ?1 AND sk = ?2",
                params![pk, sk],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DataLookup for SqlitePairStore {
    async fn get_item(&self, partition_key: &str, sort_key: &str) -> Result<Option<LookupRecord>> {
        let store = self.clone();
        let pk = partition_key.to_string();
        let sk = sort_key.to_string();
        tokio::task::spawn_blocking(move || store.get(&pk, &sk))
            .await
            .map_err(|e| VerimathError::Storage(format!("lookup task failed: {}", e)))?
    }
}
