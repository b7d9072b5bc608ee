//! # Purchase Sync Core
//!
//! Reconciles a purchase catalog against archived records and archives what
//! changed.
//!
//! ## Overview
//!
//! Each cycle lists every purchase, diffs it against the record snapshot, and
//! hands one task per new or updated item to a bounded-concurrency queue.
//! A worker runs each task through metadata resolution, key derivation,
//! download, upload, record upsert and notification.
//!
//! ## Components
//!
//! - **Diff Engine** (`diff`): Classifies purchases as new, updated or unchanged
//! - **Sync Task** (`task`): Unit of work and its validated lifecycle
//! - **Storage Keys** (`storage_key`): Deterministic object key derivation
//! - **Staging** (`staging`): Task-owned temporary files for downloads
//! - **Task Queue** (`task_queue`): FIFO executor with a concurrency bound
//! - **Sync Worker** (`worker`): The per-item archive pipeline
//! - **Sync Coordinator** (`coordinator`): One full reconciliation cycle
//! - **Repository** (`repository`): SQLite record store

pub mod coordinator;
pub mod diff;
pub mod error;
pub mod repository;
pub mod staging;
pub mod storage_key;
pub mod task;
pub mod task_queue;
pub mod worker;

pub use coordinator::{CycleOutcome, CycleReport, SyncCoordinator};
pub use diff::{Classification, DiffPlan};
pub use error::{Result, SyncError};
pub use repository::SqliteRecordStore;
pub use staging::{StagingArea, StagingFile};
pub use storage_key::derive_storage_key;
pub use task::{ChangeKind, SyncTask, TaskLifecycle, TaskPhase, TaskState};
pub use task_queue::{QueueStats, TaskQueue};
pub use worker::{build_notification, SyncWorker, TaskReport};
