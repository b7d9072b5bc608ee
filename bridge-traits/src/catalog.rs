//! Purchase Catalog Abstraction
//!
//! The remote marketplace that lists what the account owns and hands out
//! short-lived download locations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Marketplace item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One purchased item as listed by the catalog during a poll
///
/// `updated_at` is kept as the exact string the catalog returned; change
/// detection compares it byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub item_id: ItemId,
    pub name: String,
    pub url: String,
    pub updated_at: String,
    pub site: String,
    pub classification: String,
    pub preview_url: Option<String>,
}

/// Full item metadata resolved right before an item is archived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: ItemId,
    pub name: String,
    pub url: String,
    pub site: String,
    pub classification: String,
    pub updated_at: String,
    pub preview_url: Option<String>,
}

/// Catalog of purchased items
///
/// # Errors
///
/// Implementations report authentication failures as
/// [`BridgeError::Unauthorized`](crate::error::BridgeError::Unauthorized) and
/// throttling as [`BridgeError::RateLimited`](crate::error::BridgeError::RateLimited)
/// so callers never inspect message strings.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Every purchase currently visible to the account
    async fn list_purchases(&self) -> Result<Vec<Purchase>>;

    /// Full metadata for a single item
    async fn get_item_metadata(&self, item_id: ItemId) -> Result<ItemMetadata>;

    /// Time-limited URL the item archive can be fetched from
    async fn get_download_location(&self, item_id: ItemId) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_is_transparent() {
        let id: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(id, ItemId(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }
}
