//! Cron-driven cycle scheduling.
//!
//! [`CycleScheduler`] runs one cycle immediately at startup and then one per
//! cron tick, evaluated in the configured timezone. A failing cycle is logged
//! and the schedule keeps running. A tick that lands while the previous
//! cycle is still going is skipped by the coordinator.

use std::time::Duration;

use chrono_tz::Tz;
use core_sync::CycleOutcome;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::error::{CoreError, Result};
use crate::CoreService;

pub struct CycleScheduler {
    scheduler: JobScheduler,
    service: CoreService,
    startup_cycle: JoinHandle<()>,
}

impl CycleScheduler {
    /// Start the schedule. `schedule` must be a six-field, seconds-first
    /// cron expression.
    pub async fn start(service: CoreService, schedule: &str, timezone: Tz) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| CoreError::Scheduler(e.to_string()))?;

        let scheduled_service = service.clone();
        let job = Job::new_async_tz(schedule, timezone, move |_uuid, _lock| {
            let service = scheduled_service.clone();
            Box::pin(async move {
                run_logged(&service).await;
            })
        })
        .map_err(|e| CoreError::Scheduler(format!("invalid schedule '{}': {}", schedule, e)))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| CoreError::Scheduler(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| CoreError::Scheduler(e.to_string()))?;

        info!(schedule = %schedule, timezone = %timezone, "Scheduler started");

        let startup_service = service.clone();
        let startup_cycle = tokio::spawn(async move {
            info!("Running startup cycle");
            run_logged(&startup_service).await;
        });

        Ok(Self {
            scheduler,
            service,
            startup_cycle,
        })
    }

    /// Stop firing new cycles, then wait up to `grace` for the running
    /// cycle and its queued tasks to finish.
    ///
    /// Work still running when `grace` elapses is left to be dropped with
    /// the runtime; its items are picked up again by the next start.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| CoreError::Scheduler(e.to_string()))?;
        info!(grace_secs = grace.as_secs(), "Scheduler stopped; waiting for running work");

        let service = self.service.clone();
        let startup_cycle = &mut self.startup_cycle;
        let settle = async move {
            if let Err(e) = startup_cycle.await {
                if e.is_panic() {
                    error!(error = %e, "Startup cycle panicked");
                }
            }
            service.wait_idle().await
        };

        let settled = tokio::time::timeout(grace, settle).await;
        match settled {
            Ok(Ok(())) => info!("All sync work finished"),
            Ok(Err(e)) => warn!(error = %e, "Could not wait for sync work"),
            Err(_) => {
                let stats = self.service.coordinator().queue().stats();
                warn!(
                    pending = stats.pending,
                    running = stats.running,
                    "Shutdown grace period elapsed with sync work still running"
                );
                self.startup_cycle.abort();
            }
        }
        Ok(())
    }
}

async fn run_logged(service: &CoreService) {
    match service.run_cycle().await {
        Ok(CycleOutcome::Completed(report)) => info!(
            listed = report.listed,
            new = report.new,
            updated = report.updated,
            unchanged = report.unchanged,
            succeeded = report.succeeded,
            failed = report.failed,
            duration_ms = report.duration.as_millis() as u64,
            "Cycle completed"
        ),
        Ok(CycleOutcome::Skipped) => warn!("Cycle skipped; previous cycle still running"),
        Err(e) => error!(error = %e, "Cycle failed"),
    }
}
