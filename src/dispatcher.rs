//! Dispatcher — spawns workers, relays operator commands, owns shutdown.
//!
//! One detached worker task per injected item, tracked in a
//! [`TaskTracker`] so shutdown can deterministically await everything still
//! in flight instead of leaking unmanaged concurrency. A worker that
//! reports a [`StageViolation`] records it and cancels the shared token;
//! the binary turns the recorded violation into a non-zero exit.

use crate::config::{random_message, BIN_RESET_REMARKS};
use crate::pipeline::{Pipeline, TraversalOutcome};
use crate::stage::StageViolation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Point-in-time traversal counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub injected: u64,
    pub completed: u64,
    pub rejected: u64,
}

impl std::fmt::Display for LineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Line: {} injected, {} completed, {} rejected",
            self.injected, self.completed, self.rejected
        )
    }
}

#[derive(Debug, Default)]
struct StatCounters {
    injected: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
}

/// Control surface for the line: inject, reset, shut down.
pub struct Dispatcher {
    pipeline: Arc<Pipeline>,
    workers: TaskTracker,
    cancel: CancellationToken,
    stats: Arc<StatCounters>,
    /// First recorded invariant violation, if any. Set once by the failing
    /// worker; read after shutdown.
    fatal: Arc<Mutex<Option<StageViolation>>>,
}

impl Dispatcher {
    /// Build a dispatcher over a shared pipeline. `cancel` is the shared
    /// shutdown token; it is also cancelled if any worker hits a fatal
    /// violation.
    pub fn new(pipeline: Arc<Pipeline>, cancel: CancellationToken) -> Self {
        Self {
            pipeline,
            workers: TaskTracker::new(),
            cancel,
            stats: Arc::new(StatCounters::default()),
            fatal: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawn the monitor onto the worker tracker so shutdown awaits it
    /// alongside in-flight workers.
    pub fn spawn_monitor(&self, monitor: crate::monitor::LineMonitor) {
        self.workers.spawn(monitor.run());
    }

    /// Launch one detached worker carrying `label` through the line.
    ///
    /// Does not block on the traversal; outcome shows up in [`stats`]
    /// (and, on violation, in the shutdown result).
    pub fn inject_item(&self, label: impl Into<String>) {
        let label = label.into();
        let pipeline = self.pipeline.clone();
        let stats = self.stats.clone();
        let fatal = self.fatal.clone();
        let cancel = self.cancel.clone();

        stats.injected.fetch_add(1, Ordering::Relaxed);
        self.workers.spawn(async move {
            match pipeline.run_item(&label).await {
                Ok(TraversalOutcome::Completed) => {
                    stats.completed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(TraversalOutcome::Rejected) => {
                    stats.rejected.fetch_add(1, Ordering::Relaxed);
                }
                Err(violation) => {
                    error!(item = %label, error = %violation, "stage invariant violated, aborting line");
                    fatal
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get_or_insert(violation);
                    cancel.cancel();
                }
            }
        });
    }

    /// Empty the output bin, with the customary operator remark.
    pub fn trigger_reset(&self) {
        info!("Operator: \"{}\"", random_message(&BIN_RESET_REMARKS));
        self.pipeline.bin().reset();
    }

    /// Traversal counters so far.
    pub fn stats(&self) -> LineStats {
        LineStats {
            injected: self.stats.injected.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }

    /// Orderly shutdown: cancel the monitor, then wait for it and every
    /// in-flight worker to finish. Returns the recorded violation, if a
    /// worker hit one.
    pub async fn shutdown(&self) -> Option<StageViolation> {
        info!("shutting down: waiting for in-flight workers");
        self.cancel.cancel();
        self.workers.close();
        self.workers.wait().await;

        let stats = self.stats();
        info!(%stats, "all workers finished");

        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
