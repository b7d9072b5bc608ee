//! # Sync Task State Machine
//!
//! Unit of work for one changed purchase and the lifecycle it moves through.
//!
//! ## State Machine
//!
//! ```text
//! Pending → MetadataResolved → KeyDerived → Downloaded → Uploaded → Recorded → Notified → Done
//!    │             │                │            │           │           └──────────────────↑
//!    └─────────────┴────────────────┴────────────┴───────────┴──→ Aborted { phase, reason }
//! ```
//!
//! `Recorded → Done` is taken when the notification could not be sent: the
//! archive and its record are already committed, so the task still finishes.

use serde::{Deserialize, Serialize};
use std::fmt;

use bridge_traits::catalog::{ItemId, Purchase};

use crate::{Result, SyncError};

/// Whether the item was never archived or has changed since
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    New,
    Updated,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Updated => "updated",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase to archive during the current cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub purchase: Purchase,
    pub kind: ChangeKind,
}

impl SyncTask {
    pub fn new(purchase: Purchase, kind: ChangeKind) -> Self {
        Self { purchase, kind }
    }

    pub fn item_id(&self) -> ItemId {
        self.purchase.item_id
    }

    pub fn is_new(&self) -> bool {
        self.kind == ChangeKind::New
    }

    /// Short human label used by the task queue logs
    pub fn label(&self) -> String {
        format!("{} ({})", self.purchase.name, self.purchase.item_id)
    }
}

/// Pipeline step a task can fail in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Metadata,
    KeyDerivation,
    DownloadLocation,
    Download,
    Upload,
    Record,
    Notify,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPhase::Metadata => "metadata",
            TaskPhase::KeyDerivation => "key_derivation",
            TaskPhase::DownloadLocation => "download_location",
            TaskPhase::Download => "download",
            TaskPhase::Upload => "upload",
            TaskPhase::Record => "record",
            TaskPhase::Notify => "notify",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a single task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    MetadataResolved,
    KeyDerived,
    Downloaded,
    Uploaded,
    Recorded,
    Notified,
    Done,
    Aborted { phase: TaskPhase, reason: String },
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::MetadataResolved => "metadata_resolved",
            TaskState::KeyDerived => "key_derived",
            TaskState::Downloaded => "downloaded",
            TaskState::Uploaded => "uploaded",
            TaskState::Recorded => "recorded",
            TaskState::Notified => "notified",
            TaskState::Done => "done",
            TaskState::Aborted { .. } => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Aborted { .. })
    }

    /// States from which a task may still abort
    fn can_abort(&self) -> bool {
        matches!(
            self,
            TaskState::Pending
                | TaskState::MetadataResolved
                | TaskState::KeyDerived
                | TaskState::Downloaded
                | TaskState::Uploaded
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one task through [`TaskState`], rejecting out-of-order moves
#[derive(Debug, Clone)]
pub struct TaskLifecycle {
    item_id: ItemId,
    state: TaskState,
}

impl TaskLifecycle {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            state: TaskState::Pending,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// Move to the next pipeline state
    pub fn advance(&mut self, to: TaskState) -> Result<()> {
        self.validate_transition(&to)?;
        self.state = to;
        Ok(())
    }

    /// End the task in `Aborted`
    pub fn abort(&mut self, phase: TaskPhase, reason: impl Into<String>) -> Result<()> {
        let to = TaskState::Aborted {
            phase,
            reason: reason.into(),
        };
        self.validate_transition(&to)?;
        self.state = to;
        Ok(())
    }

    fn validate_transition(&self, to: &TaskState) -> Result<()> {
        use TaskState::*;

        let valid = match (&self.state, to) {
            (Pending, MetadataResolved) => true,
            (MetadataResolved, KeyDerived) => true,
            (KeyDerived, Downloaded) => true,
            (Downloaded, Uploaded) => true,
            (Uploaded, Recorded) => true,
            (Recorded, Notified) => true,
            (Recorded, Done) => true,
            (Notified, Done) => true,

            (from, Aborted { .. }) => from.can_abort(),

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Task for item {} cannot move from {} to {}",
                    self.item_id, self.state, to
                ),
            });
        }

        Ok(())
    }
}
