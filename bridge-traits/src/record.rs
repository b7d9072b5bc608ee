//! Archive Record Abstraction
//!
//! A [`Record`] is the persisted memory of an item that was archived
//! successfully. Stores are keyed by `id`; `upsert` inserts or replaces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemId, ItemMetadata};
use crate::error::Result;

/// Last successfully archived state of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: ItemId,
    pub name: String,
    pub url: String,
    pub updated_at: String,
}

impl From<&ItemMetadata> for Record {
    fn from(item: &ItemMetadata) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            url: item.url.clone(),
            updated_at: item.updated_at.clone(),
        }
    }
}

/// Persistent store of archive records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Snapshot of every stored record
    async fn list_all(&self) -> Result<Vec<Record>>;

    /// Insert the record or replace the one with the same id
    async fn upsert(&self, record: &Record) -> Result<()>;
}
