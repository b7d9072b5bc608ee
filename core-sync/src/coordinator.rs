//! # Sync Coordinator
//!
//! Runs one reconciliation cycle between the purchase catalog and the record
//! store.
//!
//! ## Workflow
//!
//! 1. List every purchase from the catalog
//! 2. Snapshot the stored records
//! 3. Diff the two into a task list
//! 4. Submit one worker job per task to the shared [`TaskQueue`]
//! 5. Wait for the queue to drain
//!
//! A failure in step 1 or 2 fails the whole cycle with nothing submitted.
//! Failures inside individual tasks are counted in the [`CycleReport`] and
//! never fail the cycle.
//!
//! ## Overlap
//!
//! Only one cycle runs at a time. A trigger that fires while a cycle is still
//! draining gets [`CycleOutcome::Skipped`] immediately.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = SyncCoordinator::new(catalog, records, worker, queue);
//! match coordinator.run_cycle().await? {
//!     CycleOutcome::Completed(report) => println!("{} archived", report.succeeded),
//!     CycleOutcome::Skipped => println!("previous cycle still running"),
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_traits::catalog::CatalogSource;
use bridge_traits::record::RecordStore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::diff;
use crate::task_queue::TaskQueue;
use crate::worker::SyncWorker;
use crate::{Result, SyncError};

/// Counters for one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Purchases returned by the catalog
    pub listed: usize,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Tasks that reached `Done`
    pub succeeded: usize,
    /// Tasks that aborted or panicked
    pub failed: usize,
    pub duration: Duration,
}

impl CycleReport {
    pub fn submitted(&self) -> usize {
        self.new + self.updated
    }
}

/// Result of asking the coordinator to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// A previous cycle was still running
    Skipped,
}

/// Drives sync cycles over a shared worker and task queue
pub struct SyncCoordinator {
    catalog: Arc<dyn CatalogSource>,
    records: Arc<dyn RecordStore>,
    worker: Arc<SyncWorker>,
    queue: Arc<TaskQueue>,
    cycle_guard: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        records: Arc<dyn RecordStore>,
        worker: Arc<SyncWorker>,
        queue: Arc<TaskQueue>,
    ) -> Self {
        Self {
            catalog,
            records,
            worker,
            queue,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Wait for a running cycle to finish and for the queue to empty
    ///
    /// Does not stop new cycles from starting afterwards; stop the trigger
    /// first.
    pub async fn wait_idle(&self) -> Result<()> {
        let _guard = self.cycle_guard.lock().await;
        self.queue.drain().await
    }

    /// Run one cycle, or skip if another is in progress
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Catalog`] when the purchase listing fails and
    /// [`SyncError::RecordStore`] when the record snapshot cannot be read.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("Previous sync cycle still running; skipping this trigger");
            return Ok(CycleOutcome::Skipped);
        };

        let started = Instant::now();
        info!("Checking purchases");

        let purchases = self
            .catalog
            .list_purchases()
            .await
            .map_err(|e| SyncError::Catalog(e.to_string()))?;
        let records = self
            .records
            .list_all()
            .await
            .map_err(|e| SyncError::RecordStore(format!("cannot load record snapshot: {}", e)))?;

        let plan = diff::plan(&purchases, &records);
        let mut report = CycleReport {
            listed: purchases.len(),
            new: plan.new_count(),
            updated: plan.updated_count(),
            unchanged: plan.unchanged.len(),
            ..CycleReport::default()
        };
        info!(
            listed = report.listed,
            new = report.new,
            updated = report.updated,
            unchanged = report.unchanged,
            "Diff computed"
        );

        let succeeded = Arc::new(AtomicUsize::new(0));
        let mut submitted = 0usize;
        for task in plan.tasks {
            let worker = Arc::clone(&self.worker);
            let succeeded = Arc::clone(&succeeded);
            let label = task.label();

            let job = async move {
                worker.execute(task).await?;
                succeeded.fetch_add(1, Ordering::SeqCst);
                Ok::<(), SyncError>(())
            };

            match self.queue.submit(label, job) {
                Ok(()) => submitted += 1,
                Err(e) => warn!(error = %e, "Task could not be queued"),
            }
        }

        self.queue.drain().await?;

        report.succeeded = succeeded.load(Ordering::SeqCst);
        report.failed = report.submitted().saturating_sub(report.succeeded);
        report.duration = started.elapsed();

        info!(
            submitted,
            succeeded = report.succeeded,
            failed = report.failed,
            duration_ms = report.duration.as_millis() as u64,
            "Sync cycle finished"
        );

        Ok(CycleOutcome::Completed(report))
    }
}
