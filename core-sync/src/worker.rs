//! # Sync Worker
//!
//! Archives a single changed purchase.
//!
//! ## Pipeline
//!
//! 1. Resolve full item metadata from the catalog
//! 2. Derive the object key
//! 3. Acquire a signed download location
//! 4. Stream the archive into a task-owned staging file
//! 5. Upload the staged bytes with their exact length
//! 6. Upsert the record from the resolved metadata
//! 7. Send a notification (best effort)
//!
//! Steps run strictly in order and the first failure ends the task. The
//! record is only written after the object store confirmed the upload, so a
//! failed task leaves the item eligible for the next cycle. The staging file
//! is gone before [`SyncWorker::execute`] returns, whatever the outcome.

use std::sync::Arc;

use bridge_traits::catalog::{CatalogSource, ItemId, ItemMetadata};
use bridge_traits::error::BridgeError;
use bridge_traits::http::HttpClient;
use bridge_traits::notify::{NotificationField, Notifier, SyncNotification};
use bridge_traits::object_store::ObjectStore;
use bridge_traits::record::{Record, RecordStore};
use bridge_traits::time::{Clock, SystemClock};
use chrono::DateTime;
use tracing::{debug, error, info, instrument, warn};

use crate::staging::{StagingArea, StagingFile};
use crate::storage_key::derive_storage_key;
use crate::task::{ChangeKind, SyncTask, TaskLifecycle, TaskPhase, TaskState};
use crate::{Result, SyncError};

/// Embed color for newly archived items (green)
pub const NEW_COLOR: u32 = 3_066_993;
/// Embed color for re-archived items (gold)
pub const UPDATED_COLOR: u32 = 15_844_367;

/// Summary of a successfully archived item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub item_id: ItemId,
    pub kind: ChangeKind,
    pub key: String,
    pub bytes: u64,
    pub notified: bool,
}

struct TaskFailure {
    phase: TaskPhase,
    error: SyncError,
}

impl TaskFailure {
    fn at(phase: TaskPhase) -> impl FnOnce(SyncError) -> Self {
        move |error| Self { phase, error }
    }
}

/// Executes [`SyncTask`]s against the external seams
pub struct SyncWorker {
    catalog: Arc<dyn CatalogSource>,
    http: Arc<dyn HttpClient>,
    object_store: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    notifier: Option<Arc<dyn Notifier>>,
    staging: Arc<StagingArea>,
    clock: Arc<dyn Clock>,
}

impl SyncWorker {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        http: Arc<dyn HttpClient>,
        object_store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        staging: Arc<StagingArea>,
    ) -> Self {
        Self {
            catalog,
            http,
            object_store,
            records,
            notifier: None,
            staging,
            clock: Arc::new(SystemClock),
        }
    }

    /// Enable notifications after each archived item
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the full pipeline for one task
    ///
    /// Task-fatal failures are logged here with the item context and the
    /// failing phase, then returned. Notification failures are not errors.
    #[instrument(skip(self, task), fields(item_id = %task.item_id(), kind = %task.kind))]
    pub async fn execute(&self, task: SyncTask) -> Result<TaskReport> {
        let mut lifecycle = TaskLifecycle::new(task.item_id());

        match self.run(&task, &mut lifecycle).await {
            Ok(report) => Ok(report),
            Err(TaskFailure { phase, error }) => {
                error!(
                    item_id = %task.item_id(),
                    item_name = %task.purchase.name,
                    phase = %phase,
                    error = %error,
                    "Sync task failed"
                );
                if let Err(e) = lifecycle.abort(phase, error.to_string()) {
                    debug!(error = %e, "Lifecycle already past abortable states");
                }
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        task: &SyncTask,
        lifecycle: &mut TaskLifecycle,
    ) -> std::result::Result<TaskReport, TaskFailure> {
        let item_id = task.item_id();

        let metadata = self
            .catalog
            .get_item_metadata(item_id)
            .await
            .map_err(|e| SyncError::Metadata {
                item_id,
                message: e.to_string(),
            })
            .map_err(TaskFailure::at(TaskPhase::Metadata))?;
        advance(lifecycle, TaskState::MetadataResolved, TaskPhase::Metadata)?;

        let key = derive_storage_key(&metadata).map_err(TaskFailure::at(TaskPhase::KeyDerivation))?;
        advance(lifecycle, TaskState::KeyDerived, TaskPhase::KeyDerivation)?;

        info!(item_id = %item_id, item_name = %metadata.name, key = %key, "Fetching download location");
        let location = self
            .catalog
            .get_download_location(item_id)
            .await
            .map_err(classify_location_error)
            .map_err(TaskFailure::at(TaskPhase::DownloadLocation))?;

        let staged = self.staging.allocate(item_id);
        let transfer = self.transfer(&staged, &location, &key, lifecycle).await;
        if let Err(e) = staged.release().await {
            warn!(item_id = %item_id, error = %e, "Failed to release staging file");
        }
        let bytes = transfer?;

        self.records
            .upsert(&Record::from(&metadata))
            .await
            .map_err(|e| SyncError::RecordStore(e.to_string()))
            .map_err(TaskFailure::at(TaskPhase::Record))?;
        advance(lifecycle, TaskState::Recorded, TaskPhase::Record)?;
        info!(
            item_id = %item_id,
            item_name = %metadata.name,
            updated_at = %metadata.updated_at,
            kind = %task.kind,
            "Record stored"
        );

        let notified = self.notify(task.kind, &metadata).await;
        if notified {
            advance(lifecycle, TaskState::Notified, TaskPhase::Notify)?;
        }
        advance(lifecycle, TaskState::Done, TaskPhase::Notify)?;

        Ok(TaskReport {
            item_id,
            kind: task.kind,
            key,
            bytes,
            notified,
        })
    }

    /// Download into `staged` then upload it under `key`
    async fn transfer(
        &self,
        staged: &StagingFile,
        location: &str,
        key: &str,
        lifecycle: &mut TaskLifecycle,
    ) -> std::result::Result<u64, TaskFailure> {
        let item_id = lifecycle.item_id();

        let source = self
            .http
            .download_stream(location.to_string())
            .await
            .map_err(|e| SyncError::Download(e.to_string()))
            .map_err(TaskFailure::at(TaskPhase::Download))?;
        let bytes = staged
            .fill_from(source)
            .await
            .map_err(TaskFailure::at(TaskPhase::Download))?;
        advance(lifecycle, TaskState::Downloaded, TaskPhase::Download)?;
        info!(item_id = %item_id, bytes, "Archive downloaded");

        let body = staged.open().await.map_err(TaskFailure::at(TaskPhase::Upload))?;
        self.object_store
            .put(key, body, bytes)
            .await
            .map_err(|e| SyncError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })
            .map_err(TaskFailure::at(TaskPhase::Upload))?;
        advance(lifecycle, TaskState::Uploaded, TaskPhase::Upload)?;
        info!(item_id = %item_id, key = %key, bytes, "Archive uploaded");

        Ok(bytes)
    }

    /// Returns whether the notification went out
    async fn notify(&self, kind: ChangeKind, metadata: &ItemMetadata) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };

        let notification = build_notification(kind, metadata, self.clock.as_ref());
        match notifier.send(&notification).await {
            Ok(()) => true,
            Err(e) => {
                let error = SyncError::Notify(e.to_string());
                warn!(
                    item_id = %metadata.id,
                    item_name = %metadata.name,
                    error = %error,
                    "Notification not delivered"
                );
                false
            }
        }
    }
}

fn advance(
    lifecycle: &mut TaskLifecycle,
    to: TaskState,
    phase: TaskPhase,
) -> std::result::Result<(), TaskFailure> {
    lifecycle.advance(to).map_err(TaskFailure::at(phase))
}

fn classify_location_error(error: BridgeError) -> SyncError {
    match error {
        BridgeError::Unauthorized(message) => SyncError::Auth(message),
        BridgeError::RateLimited { retry_after_secs } => SyncError::RateLimit { retry_after_secs },
        other => SyncError::Download(format!("cannot acquire download location: {}", other)),
    }
}

/// Build the announcement for an archived item
pub fn build_notification(
    kind: ChangeKind,
    metadata: &ItemMetadata,
    clock: &dyn Clock,
) -> SyncNotification {
    let (title, description, color) = match kind {
        ChangeKind::New => (
            "🆕 New purchase archived",
            format!("**{}** was added to the archive.", metadata.name),
            NEW_COLOR,
        ),
        ChangeKind::Updated => (
            "🔄 Update archived",
            format!("A new version of **{}** was archived.", metadata.name),
            UPDATED_COLOR,
        ),
    };

    SyncNotification {
        title: title.to_string(),
        description,
        url: metadata.url.clone(),
        color,
        fields: vec![
            NotificationField::new("ID", metadata.id.to_string(), true),
            NotificationField::new("Site", metadata.site.clone(), true),
            NotificationField::new("Category", metadata.classification.clone(), true),
            NotificationField::new("Updated at", display_timestamp(&metadata.updated_at), false),
        ],
        thumbnail_url: metadata.preview_url.clone(),
        timestamp: clock.now(),
    }
}

fn display_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S %:z").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::FixedClock;
    use chrono::{TimeZone, Utc};

    fn metadata() -> ItemMetadata {
        ItemMetadata {
            id: ItemId(42),
            name: "Avada".to_string(),
            url: "https://themeforest.net/item/avada/42".to_string(),
            site: "themeforest.net".to_string(),
            classification: "wordpress/corporate".to_string(),
            updated_at: "2023-01-01T00:00:00Z".to_string(),
            preview_url: Some("https://cdn.example/preview.jpg".to_string()),
        }
    }

    #[test]
    fn test_new_notification() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let n = build_notification(ChangeKind::New, &metadata(), &clock);

        assert_eq!(n.title, "🆕 New purchase archived");
        assert_eq!(n.color, NEW_COLOR);
        assert!(n.description.contains("**Avada**"));
        assert_eq!(n.url, "https://themeforest.net/item/avada/42");
        assert_eq!(n.thumbnail_url.as_deref(), Some("https://cdn.example/preview.jpg"));
        assert_eq!(n.timestamp, clock.0);

        let names: Vec<_> = n.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "Site", "Category", "Updated at"]);
        assert_eq!(n.fields[0].value, "42");
        assert_eq!(n.fields[3].value, "2023-01-01 00:00:00 +00:00");
        assert!(!n.fields[3].inline);
    }

    #[test]
    fn test_updated_notification() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let n = build_notification(ChangeKind::Updated, &metadata(), &clock);

        assert_eq!(n.title, "🔄 Update archived");
        assert_eq!(n.color, UPDATED_COLOR);
    }

    #[test]
    fn test_unparseable_timestamp_is_shown_verbatim() {
        assert_eq!(display_timestamp("last tuesday"), "last tuesday");
    }

    #[test]
    fn test_location_errors_are_classified() {
        assert!(matches!(
            classify_location_error(BridgeError::Unauthorized("bad token".into())),
            SyncError::Auth(_)
        ));
        assert!(matches!(
            classify_location_error(BridgeError::RateLimited {
                retry_after_secs: Some(60)
            }),
            SyncError::RateLimit {
                retry_after_secs: Some(60)
            }
        ));
        assert!(matches!(
            classify_location_error(BridgeError::Http {
                status: 500,
                message: "oops".into()
            }),
            SyncError::Download(_)
        ));
    }
}
