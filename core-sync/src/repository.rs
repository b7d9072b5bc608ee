//! # Record Repository
//!
//! SQLite-backed [`RecordStore`] for local runs.
//!
//! ## Overview
//!
//! Records live in a single table keyed by item id:
//!
//! ```sql
//! CREATE TABLE purchases (
//!     id INTEGER PRIMARY KEY NOT NULL,
//!     name TEXT NOT NULL,
//!     url TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! )
//! ```
//!
//! `upsert` inserts or overwrites the row for an id in one statement, so a
//! re-archived item never produces a duplicate. Rows are never deleted.

use async_trait::async_trait;
use bridge_traits::catalog::ItemId;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::record::{Record, RecordStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::{Result, SyncError};

const DEFAULT_TABLE: &str = "purchases";

/// SQLite implementation of [`RecordStore`]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Wrap an existing pool. Call [`initialize`](Self::initialize) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path`
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(|e| SyncError::Database(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        info!(path = %path.display(), "Opened SQLite record store");
        Ok(Self::new(pool))
    }

    /// Create the records table if it does not exist
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {DEFAULT_TABLE} (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Database row representation of a record
#[derive(Debug, FromRow)]
struct RecordRow {
    id: i64,
    name: String,
    url: String,
    updated_at: String,
}

impl TryFrom<RecordRow> for Record {
    type Error = BridgeError;

    fn try_from(row: RecordRow) -> BridgeResult<Self> {
        let id = u64::try_from(row.id)
            .map_err(|_| BridgeError::DatabaseError(format!("negative item id {}", row.id)))?;
        Ok(Record {
            id: ItemId(id),
            name: row.name,
            url: row.url,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_all(&self) -> BridgeResult<Vec<Record>> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT id, name, url, updated_at FROM {DEFAULT_TABLE} ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        debug!(count = rows.len(), "Loaded record snapshot");
        rows.into_iter().map(Record::try_from).collect()
    }

    async fn upsert(&self, record: &Record) -> BridgeResult<()> {
        let id = i64::try_from(record.id.get()).map_err(|_| {
            BridgeError::DatabaseError(format!("item id {} exceeds SQLite INTEGER", record.id))
        })?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {DEFAULT_TABLE} (id, name, url, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                updated_at = excluded.updated_at
            "#
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.url)
        .bind(&record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_store() -> SqliteRecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteRecordStore::new(pool);
        store.initialize().await.unwrap();
        store
    }

    fn record(id: u64, updated_at: &str) -> Record {
        Record {
            id: ItemId(id),
            name: format!("Item {}", id),
            url: format!("https://themeforest.net/item/item-{}/{}", id, id),
            updated_at: updated_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let store = create_test_store().await;
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let store = create_test_store().await;

        store.upsert(&record(42, "2023-01-01T00:00:00Z")).await.unwrap();
        store.upsert(&record(7, "2022-01-01T00:00:00Z")).await.unwrap();
        store.upsert(&record(42, "2023-06-01T00:00:00Z")).await.unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record(7, "2022-01-01T00:00:00Z"));
        assert_eq!(records[1], record(42, "2023-06-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = create_test_store().await;
        store.upsert(&record(1, "a")).await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_ids_beyond_sqlite_range() {
        let store = create_test_store().await;
        let err = store.upsert(&record(u64::MAX, "a")).await.unwrap_err();
        assert!(matches!(err, BridgeError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        let store = SqliteRecordStore::connect(&path).await.unwrap();
        store.initialize().await.unwrap();
        store.upsert(&record(3, "x")).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
