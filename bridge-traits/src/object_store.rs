//! Object Storage Abstraction

use async_trait::async_trait;

use crate::error::Result;
use crate::http::ByteStream;

/// Durable key/value blob storage (S3-compatible buckets and the like)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content_length` bytes read from `body` under `key`, replacing
    /// any previous object with that key.
    async fn put(&self, key: &str, body: ByteStream, content_length: u64) -> Result<()>;

    /// Whether an object is stored under `key`
    async fn exists(&self, key: &str) -> Result<bool>;
}
