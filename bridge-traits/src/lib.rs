//! # Host Bridge Traits
//!
//! Abstract seams between the purchase sync core and the outside world.
//!
//! ## Overview
//!
//! The sync core only ever talks to the traits in this crate. Concrete
//! adapters live elsewhere (`bridge-desktop` for transport and file I/O, the
//! `provider-*` crates for vendor APIs) and are injected as `Arc<dyn Trait>`.
//!
//! ## Traits
//!
//! ### Transport & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with streamed download and upload
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Staging file I/O
//!
//! ### Sync Collaborators
//! - [`CatalogSource`](catalog::CatalogSource) - Lists purchases, resolves metadata and download URLs
//! - [`ObjectStore`](object_store::ObjectStore) - Durable archive storage keyed by path
//! - [`RecordStore`](record::RecordStore) - Persisted per-item sync state
//! - [`Notifier`](notify::Notifier) - Best-effort sync event sink
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Adapters map
//! vendor failures onto its typed variants (`Unauthorized`, `RateLimited`,
//! `NotFound`, `Http`) so the core can branch on the variant rather than on
//! error text.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; a single adapter instance is
//! shared by every concurrently running sync task.
//!
//! ## Examples
//!
//! ### Implementing RecordStore
//!
//! ```ignore
//! use bridge_traits::record::{Record, RecordStore};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct InMemoryRecords {
//!     rows: tokio::sync::Mutex<Vec<Record>>,
//! }
//!
//! #[async_trait]
//! impl RecordStore for InMemoryRecords {
//!     async fn list_all(&self) -> Result<Vec<Record>> {
//!         Ok(self.rows.lock().await.clone())
//!     }
//!
//!     async fn upsert(&self, record: &Record) -> Result<()> {
//!         let mut rows = self.rows.lock().await;
//!         rows.retain(|r| r.id != record.id);
//!         rows.push(record.clone());
//!         Ok(())
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod http;
pub mod notify;
pub mod object_store;
pub mod record;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{CatalogSource, ItemId, ItemMetadata, Purchase};
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use notify::{NotificationField, Notifier, SyncNotification};
pub use object_store::ObjectStore;
pub use record::{Record, RecordStore};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, FixedClock, SystemClock};
