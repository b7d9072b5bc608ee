//! # Task Queue
//!
//! Bounded-concurrency executor for sync jobs.
//!
//! ## Overview
//!
//! [`TaskQueue::submit`] never waits: the job goes onto an unbounded FIFO
//! channel. A dispatcher task pulls jobs in order and spawns each one only
//! after acquiring a semaphore permit, so at most `max_concurrent` jobs run at
//! any instant while the rest wait in submission order.
//!
//! [`TaskQueue::drain`] resolves once every submitted job, pending or
//! running, has finished. It is the only synchronization point between jobs.
//!
//! ## Failure isolation
//!
//! A job that returns `Err` or panics is counted as failed and logged; it
//! never cancels sibling jobs or stops the dispatcher. The in-flight counter
//! is decremented by a guard that also runs while a panicking job unwinds, so
//! `drain` cannot hang on a crashed job.
//!
//! ## Usage
//!
//! ```ignore
//! let queue = TaskQueue::new(4)?;
//! for task in plan.tasks {
//!     let worker = Arc::clone(&worker);
//!     queue.submit(task.label(), async move { worker.execute(task).await.map(|_| ()) })?;
//! }
//! queue.drain().await?;
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{Result, SyncError};

struct Job {
    label: String,
    future: BoxFuture<'static, Result<()>>,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    running: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of queue activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs submitted but not started
    pub pending: usize,
    /// Jobs currently executing
    pub running: usize,
    /// Jobs that returned `Ok` since the queue was created
    pub completed: u64,
    /// Jobs that returned `Err` or panicked since the queue was created
    pub failed: u64,
    /// Concurrency limit
    pub max_concurrent: usize,
}

impl QueueStats {
    /// Jobs not yet finished
    pub fn in_flight(&self) -> usize {
        self.pending + self.running
    }
}

/// Bounded-concurrency FIFO executor
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<Counters>,
    in_flight: Arc<watch::Sender<usize>>,
    max_concurrent: usize,
    dispatcher: JoinHandle<()>,
}

impl TaskQueue {
    /// Create a queue running at most `max_concurrent` jobs at once.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidInput`] when `max_concurrent` is zero.
    pub fn new(max_concurrent: usize) -> Result<Self> {
        if max_concurrent == 0 {
            return Err(SyncError::InvalidInput(
                "task queue concurrency must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let (in_flight, _) = watch::channel(0usize);
        let in_flight = Arc::new(in_flight);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        let dispatcher = tokio::spawn(dispatch(
            receiver,
            semaphore,
            Arc::clone(&counters),
            Arc::clone(&in_flight),
        ));

        Ok(Self {
            sender,
            counters,
            in_flight,
            max_concurrent,
            dispatcher,
        })
    }

    /// Admit a job without waiting for it to start or finish
    pub fn submit<F>(&self, label: impl Into<String>, future: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();

        self.in_flight.send_modify(|n| *n += 1);
        self.counters.pending.fetch_add(1, Ordering::SeqCst);

        let job = Job {
            label,
            future: future.boxed(),
        };

        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            self.in_flight.send_modify(|n| *n -= 1);
            error!(task = %job.label, "Task queue dispatcher is gone; job rejected");
            return Err(SyncError::QueueClosed);
        }

        let stats = self.stats();
        info!(
            pending = stats.pending,
            running = stats.running,
            "Task queued"
        );

        Ok(())
    }

    /// Wait until every submitted job has finished
    pub async fn drain(&self) -> Result<()> {
        let mut receiver = self.in_flight.subscribe();
        receiver
            .wait_for(|n| *n == 0)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::QueueClosed)
    }

    /// Current counters
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.counters.pending.load(Ordering::SeqCst),
            running: self.counters.running.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            max_concurrent: self.max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        // Already-spawned jobs keep running; only unstarted ones are dropped.
        self.dispatcher.abort();
    }
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<Job>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    in_flight: Arc<watch::Sender<usize>>,
) {
    while let Some(job) = receiver.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        counters.pending.fetch_sub(1, Ordering::SeqCst);
        counters.running.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(run_job(
            job,
            RunningGuard {
                counters: Arc::clone(&counters),
                in_flight: Arc::clone(&in_flight),
                _permit: permit,
            },
        ));
    }
}

async fn run_job(job: Job, guard: RunningGuard) {
    let Job { label, future } = job;

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => {
            guard.counters.completed.fetch_add(1, Ordering::SeqCst);
            debug!(task = %label, "Task completed");
        }
        Ok(Err(e)) => {
            guard.counters.failed.fetch_add(1, Ordering::SeqCst);
            debug!(task = %label, error = %e, "Task failed");
        }
        Err(panic) => {
            guard.counters.failed.fetch_add(1, Ordering::SeqCst);
            error!(task = %label, panic = %panic_message(panic.as_ref()), "Task panicked");
        }
    }

    drop(guard);
}

/// Releases the concurrency slot and the in-flight count of one job
struct RunningGuard {
    counters: Arc<Counters>,
    in_flight: Arc<watch::Sender<usize>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.counters.running.fetch_sub(1, Ordering::SeqCst);
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::{Mutex, Notify};

    #[tokio::test]
    async fn test_rejects_zero_concurrency() {
        assert!(matches!(TaskQueue::new(0), Err(SyncError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_drain_on_empty_queue_returns_immediately() {
        let queue = TaskQueue::new(2).unwrap();
        tokio::time::timeout(Duration::from_secs(1), queue.drain())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_concurrency_limit() {
        let queue = TaskQueue::new(3).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..20 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            queue
                .submit(format!("job-{i}"), async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        queue.drain().await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        let stats = queue.stats();
        assert_eq!(stats.completed, 20);
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_admission_is_fifo() {
        let queue = TaskQueue::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            queue
                .submit(format!("job-{i}"), async move {
                    order.lock().await.push(i);
                    Ok(())
                })
                .unwrap();
        }

        queue.drain().await.unwrap();
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let queue = TaskQueue::new(2).unwrap();
        let survivor_ran = Arc::new(AtomicBool::new(false));

        queue
            .submit("fails", async { Err(SyncError::Download("boom".into())) })
            .unwrap();
        queue
            .submit("panics", async {
                panic!("worker exploded");
            })
            .unwrap();
        let flag = Arc::clone(&survivor_ran);
        queue
            .submit("survives", async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), queue.drain())
            .await
            .expect("drain must not hang on a panicked job")
            .unwrap();

        assert!(survivor_ran.load(Ordering::SeqCst));
        let stats = queue.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.running, 0);
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_and_stats_track_pending() {
        let queue = TaskQueue::new(1).unwrap();
        let gate = Arc::new(Notify::new());

        for i in 0..3 {
            let gate = Arc::clone(&gate);
            queue
                .submit(format!("blocked-{i}"), async move {
                    gate.notified().await;
                    Ok(())
                })
                .unwrap();
        }

        // Let the dispatcher start the first job
        for _ in 0..50 {
            if queue.stats().running == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let stats = queue.stats();
        assert_eq!(stats.running, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.max_concurrent, 1);

        for _ in 0..3 {
            gate.notify_one();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // notify_one stores a permit when nobody waits, so every job proceeds
        queue.drain().await.unwrap();
        assert_eq!(queue.stats().completed, 3);
    }

    #[tokio::test]
    async fn test_queue_is_reusable_across_drains() {
        let queue = TaskQueue::new(2).unwrap();

        queue.submit("first", async { Ok(()) }).unwrap();
        queue.drain().await.unwrap();
        queue.submit("second", async { Ok(()) }).unwrap();
        queue.drain().await.unwrap();

        assert_eq!(queue.stats().completed, 2);
    }
}
