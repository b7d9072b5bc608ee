use bridge_traits::catalog::ItemId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to resolve metadata for item {item_id}: {message}")]
    Metadata { item_id: ItemId, message: String },

    #[error("Cannot derive storage key: {0}")]
    KeyDerivation(String),

    #[error("Catalog rejected credentials: {0}")]
    Auth(String),

    #[error("Catalog rate limit hit (retry after {retry_after_secs:?} seconds)")]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Failed to list catalog purchases: {0}")]
    Catalog(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task queue is closed")]
    QueueClosed,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl SyncError {
    /// Whether this error ends the task it occurred in.
    ///
    /// Notification failures are the only per-item errors that do not.
    pub fn is_task_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Metadata { .. }
                | SyncError::KeyDerivation(_)
                | SyncError::Auth(_)
                | SyncError::RateLimit { .. }
                | SyncError::Download(_)
                | SyncError::Upload { .. }
                | SyncError::RecordStore(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
