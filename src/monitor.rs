//! Line monitor — periodic advisory observations of the whole line.
//!
//! A single long-running task that reads combined stage occupancy and the
//! output bin count, complaining when the line is starved or the bin has
//! piled up. It only reads: its snapshot across stages need not be
//! consistent, and nothing it emits is load-bearing. Shutdown is
//! cooperative via a cancellation token and is observed within one sleep
//! interval.

use crate::config::{
    random_message, BIN_ATTENTION_BOUND, BIN_ATTENTION_MESSAGES, STARVATION_THRESHOLD,
    STARVED_MESSAGES,
};
use crate::pipeline::Pipeline;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Long-running observer of line occupancy and bin accumulation.
pub struct LineMonitor {
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
}

impl LineMonitor {
    pub fn new(pipeline: Arc<Pipeline>, cancel: CancellationToken) -> Self {
        Self { pipeline, cancel }
    }

    /// Run the observation loop until the token is cancelled.
    ///
    /// Each iteration: check starvation, sleep, check the bin, sleep.
    /// Every sleep races against cancellation so shutdown never waits for
    /// a full cycle.
    pub async fn run(self) {
        info!(
            starvation_threshold = STARVATION_THRESHOLD,
            bin_attention_bound = BIN_ATTENTION_BOUND,
            "line monitor started"
        );

        while !self.cancel.is_cancelled() {
            let occupancy = self.pipeline.total_occupancy();
            if occupancy < STARVATION_THRESHOLD {
                warn!(occupancy, "Monitor: \"{}\"", random_message(&STARVED_MESSAGES));
            }

            if self.idle(self.pipeline.timing().monitor_pause()).await {
                break;
            }

            let count = self.pipeline.bin().count();
            // A fresh draw each cycle: the fuller the bin, the likelier the
            // complaint; at the bound it is guaranteed.
            let draw = rand::thread_rng().gen_range(0..BIN_ATTENTION_BOUND);
            if count > draw {
                warn!(
                    count,
                    "Monitor: \"{}\"",
                    random_message(&BIN_ATTENTION_MESSAGES)
                );
            }

            if self.idle(self.pipeline.timing().monitor_pause()).await {
                break;
            }
        }

        info!("line monitor stopped");
    }

    /// Sleep for `pause`, returning true if cancellation won the race.
    async fn idle(&self, pause: Duration) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => true,
            () = tokio::time::sleep(pause) => false,
        }
    }
}
