//! Stage-by-stage traversal of the packaging line.
//!
//! The pipeline is purely a traversal order over shared stages plus the
//! output bin; it owns no mutable state of its own. The ordering contract is
//! the interesting part: a worker always enters the next stage *before*
//! leaving the current one, so an in-flight item is counted in at least one
//! stage at every instant — at the cost of momentarily occupying two. The
//! invariant that matters is per-stage capacity, not total line occupancy.

use crate::config::Timing;
use crate::output_bin::OutputBin;
use crate::stage::{BoundedStage, StageViolation};
use std::sync::Arc;
use tracing::info;

/// How one worker's traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOutcome {
    /// The item passed every stage and was deposited in the output bin.
    Completed,
    /// The first stage was full at the admission pre-check; the item was
    /// discarded without ever being counted in any stage.
    Rejected,
}

/// Ordered sequence of bounded stages ending at the output bin.
pub struct Pipeline {
    stages: Vec<Arc<BoundedStage>>,
    bin: Arc<OutputBin>,
    timing: Timing,
}

impl Pipeline {
    /// Build a pipeline over shared stages. Panics if `stages` is empty —
    /// a line with no stages is a construction bug, not a runtime state.
    pub fn new(stages: Vec<Arc<BoundedStage>>, bin: Arc<OutputBin>, timing: Timing) -> Self {
        assert!(!stages.is_empty(), "pipeline requires at least one stage");
        Self { stages, bin, timing }
    }

    /// Build the default three-stage layout from [`crate::config::STAGE_LAYOUT`].
    pub fn with_default_layout(timing: Timing) -> Self {
        let stages = crate::config::STAGE_LAYOUT
            .iter()
            .map(|(label, capacity)| Arc::new(BoundedStage::new(*label, *capacity)))
            .collect();
        Self::new(stages, Arc::new(OutputBin::new()), timing)
    }

    pub fn stages(&self) -> &[Arc<BoundedStage>] {
        &self.stages
    }

    pub fn bin(&self) -> &Arc<OutputBin> {
        &self.bin
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Combined occupancy across all stages.
    ///
    /// Read stage-by-stage without a global lock: a recent, not necessarily
    /// consistent snapshot. Advisory use only (the monitor).
    pub fn total_occupancy(&self) -> usize {
        self.stages.iter().map(|stage| stage.occupancy()).sum()
    }

    /// Carry one item through every stage and deposit it in the bin.
    ///
    /// Admission control: a full first stage rejects the item outright
    /// rather than blocking the worker — deliberately different from the
    /// per-stage backpressure applied at every later stage, where the
    /// worker blocks normally while still holding its previous slot.
    ///
    /// A `StageViolation` from any stage aborts the traversal and must be
    /// treated as fatal by the caller.
    pub async fn run_item(&self, item: &str) -> Result<TraversalOutcome, StageViolation> {
        let first = &self.stages[0];
        if first.is_full() {
            info!(
                item,
                stage = first.label(),
                "no room at the first stage; item discarded"
            );
            return Ok(TraversalOutcome::Rejected);
        }

        info!(item, "item accepted onto the line");

        for idx in 0..self.stages.len() {
            self.stages[idx].enter(item).await?;
            if idx > 0 {
                // Enter-before-leave: the item briefly counts in both
                // stages so it is never unaccounted for mid-transfer.
                self.stages[idx - 1].leave(item)?;
            }
            tokio::time::sleep(self.timing.stage_pause()).await;
        }

        if let Some(last) = self.stages.last() {
            last.leave(item)?;
        }
        self.bin.deposit(item);

        Ok(TraversalOutcome::Completed)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("bin_count", &self.bin.count())
            .finish()
    }
}
