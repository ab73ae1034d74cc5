//! Capacity-bounded holding stage with blocking admission.
//!
//! Each stage guards its occupancy with its own lock and parks producers on
//! a "not full" condition when saturated. Waiters always re-check the
//! predicate after waking, so broadcast wakeups and spurious wakes are
//! harmless. A stage whose occupancy ever lands outside `[0, capacity]`
//! reports a [`StageViolation`] — that signals a synchronization bug and is
//! fatal to the whole line, never retried.

use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::info;

/// Fatal occupancy invariant breach.
///
/// Either variant means occupancy accounting has gone wrong somewhere;
/// the process terminates with a failure status rather than continuing
/// with meaningless state.
#[derive(Debug, Error)]
pub enum StageViolation {
    #[error("stage '{stage}' overfilled: occupancy {occupancy} exceeds capacity {capacity}")]
    Overfilled {
        stage: String,
        occupancy: usize,
        capacity: usize,
    },

    #[error("stage '{stage}' drained below zero occupancy")]
    Drained { stage: String },
}

/// One capacity-limited holding area on the line.
///
/// Shared by every worker task and the monitor via `Arc`; all mutation goes
/// through [`enter`](BoundedStage::enter) and [`leave`](BoundedStage::leave).
pub struct BoundedStage {
    label: String,
    capacity: usize,
    /// Guarded occupancy. Critical sections never await, so a sync mutex
    /// is sufficient and keeps `occupancy()` readable without an executor.
    occupancy: Mutex<usize>,
    /// Signalled after every `leave`; parked `enter` callers re-check
    /// capacity on wake.
    not_full: Notify,
}

impl BoundedStage {
    /// Create a stage with a fixed positive capacity.
    pub fn new(label: impl Into<String>, capacity: usize) -> Self {
        debug_assert!(capacity > 0, "a stage must hold at least one item");
        Self {
            label: label.into(),
            capacity,
            occupancy: Mutex::new(0),
            not_full: Notify::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy. Non-blocking snapshot; may be stale by the time
    /// the caller acts on it.
    pub fn occupancy(&self) -> usize {
        *self.lock()
    }

    /// Whether the stage is at capacity right now.
    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity
    }

    /// Admit `item` into the stage, waiting until a slot is free.
    ///
    /// Emits one "held up" observation per wait and one entry observation on
    /// success. Returns [`StageViolation::Overfilled`] if occupancy is found
    /// above capacity immediately after the increment — a logic error
    /// elsewhere, not a retryable condition.
    pub async fn enter(&self, item: &str) -> Result<(), StageViolation> {
        loop {
            let mut notified = pin!(self.not_full.notified());
            {
                let mut occ = self.lock();
                if *occ < self.capacity {
                    *occ += 1;
                    if *occ > self.capacity {
                        return Err(StageViolation::Overfilled {
                            stage: self.label.clone(),
                            occupancy: *occ,
                            capacity: self.capacity,
                        });
                    }
                    info!(
                        item,
                        stage = %self.label,
                        occupancy = *occ,
                        capacity = self.capacity,
                        "item entering stage"
                    );
                    return Ok(());
                }

                info!(item, stage = %self.label, "item held up at full stage");
                // Register interest while still holding the lock, so a
                // `leave` racing with the lock release cannot be missed.
                notified.as_mut().enable();
            }
            notified.await;
        }
    }

    /// Remove `item` from the stage and wake parked `enter` callers.
    ///
    /// Returns [`StageViolation::Drained`] if the stage was already empty —
    /// the item was never counted as present here.
    pub fn leave(&self, item: &str) -> Result<(), StageViolation> {
        {
            let mut occ = self.lock();
            if *occ == 0 {
                return Err(StageViolation::Drained {
                    stage: self.label.clone(),
                });
            }
            *occ -= 1;
            info!(
                item,
                stage = %self.label,
                occupancy = *occ,
                "item leaving stage"
            );
        }
        // Exactly one slot freed, but broadcast: every waiter re-checks the
        // predicate, so over-waking costs a recheck, never correctness.
        self.not_full.notify_waiters();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // Occupancy is a plain counter; a poisoned lock still holds a
        // usable value.
        self.occupancy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BoundedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedStage")
            .field("label", &self.label)
            .field("capacity", &self.capacity)
            .field("occupancy", &self.occupancy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn occupancy_stays_within_bounds() {
        let stage = BoundedStage::new("assembly", 3);
        assert_eq!(stage.occupancy(), 0);

        for expected in 1..=3 {
            stage.enter("widget").await.expect("slot available");
            assert_eq!(stage.occupancy(), expected);
            assert!(stage.occupancy() <= stage.capacity());
        }
        assert!(stage.is_full());

        for expected in (0..3).rev() {
            stage.leave("widget").expect("item present");
            assert_eq!(stage.occupancy(), expected);
        }
        assert!(!stage.is_full());
    }

    #[tokio::test]
    async fn enter_blocks_at_capacity_until_leave() {
        let stage = BoundedStage::new("packing", 1);
        stage.enter("first").await.expect("slot available");

        let mut blocked = task::spawn(stage.enter("second"));
        assert_pending!(blocked.poll());
        assert_eq!(stage.occupancy(), 1);

        // Still parked after another poll; no busy admission.
        assert_pending!(blocked.poll());

        stage.leave("first").expect("item present");
        assert!(blocked.is_woken());
        assert_ready!(blocked.poll()).expect("slot freed");
        assert_eq!(stage.occupancy(), 1);
    }

    #[tokio::test]
    async fn leave_on_empty_stage_is_a_violation() {
        let stage = BoundedStage::new("intake", 2);
        let err = stage.leave("ghost");
        assert!(matches!(err, Err(StageViolation::Drained { .. })));
        // Occupancy untouched by the failed leave.
        assert_eq!(stage.occupancy(), 0);
    }

    #[tokio::test]
    async fn concurrent_entries_never_exceed_capacity() {
        let stage = Arc::new(BoundedStage::new("assembly", 2));
        let mut handles = Vec::new();

        for i in 0..8 {
            let stage = stage.clone();
            handles.push(tokio::spawn(async move {
                let item = format!("item-{i}");
                stage.enter(&item).await.expect("no violation");
                assert!(stage.occupancy() <= stage.capacity());
                tokio::task::yield_now().await;
                stage.leave(&item).expect("no violation");
            }));
        }

        for handle in handles {
            handle.await.expect("worker completed");
        }
        assert_eq!(stage.occupancy(), 0);
    }

    #[test]
    fn violation_messages_name_the_stage() {
        let overfilled = StageViolation::Overfilled {
            stage: "packing".to_string(),
            occupancy: 2,
            capacity: 1,
        };
        assert!(overfilled.to_string().contains("packing"));
        assert!(overfilled.to_string().contains("overfilled"));

        let drained = StageViolation::Drained {
            stage: "intake".to_string(),
        };
        assert!(drained.to_string().contains("intake"));
    }
}
