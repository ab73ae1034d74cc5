//! Output bin: the line's deposit counter.
//!
//! Accumulates one count per item that completes the full traversal and is
//! emptied on demand by the operator. Independently locked; never contended
//! across an await point.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Monotonically incrementing deposit counter with explicit reset.
#[derive(Debug, Default)]
pub struct OutputBin {
    count: Mutex<u64>,
}

impl OutputBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed item.
    pub fn deposit(&self, item: &str) {
        let mut count = self.lock();
        *count += 1;
        info!(item, count = *count, "item deposited in output bin");
    }

    /// Empty the bin. Logs how many deposits were cleared.
    pub fn reset(&self) {
        let mut count = self.lock();
        let cleared = *count;
        *count = 0;
        info!(cleared, "output bin emptied");
    }

    /// Current deposit count. Non-blocking snapshot.
    pub fn count(&self) -> u64 {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposits_accumulate() {
        let bin = OutputBin::new();
        assert_eq!(bin.count(), 0);

        for n in 1..=5 {
            bin.deposit("gasket rings");
            assert_eq!(bin.count(), n);
        }
    }

    #[test]
    fn reset_clears_regardless_of_prior_count() {
        let bin = OutputBin::new();
        bin.reset();
        assert_eq!(bin.count(), 0);

        for _ in 0..7 {
            bin.deposit("hex bolts");
        }
        bin.reset();
        assert_eq!(bin.count(), 0);

        bin.deposit("hex bolts");
        assert_eq!(bin.count(), 1);
    }
}
