//! Line-wide constants and timing profile.
//!
//! Centralises the stage layout, observation thresholds, message catalogs,
//! and simulated delay ranges. Grouped by subsystem for easy discovery.

use rand::Rng;
use std::time::Duration;

// ============================================================================
// Stage Layout
// ============================================================================

/// Default stage layout: label and capacity, in traversal order.
///
/// Intake admits two items, assembly buffers three, packing handles one
/// at a time — the packing stage is the line's bottleneck.
pub const STAGE_LAYOUT: [(&str, usize); 3] = [("intake", 2), ("assembly", 3), ("packing", 1)];

// ============================================================================
// Monitor Thresholds
// ============================================================================

/// Combined occupancy below which the monitor reports the line as starved.
pub const STARVATION_THRESHOLD: usize = 2;

/// Upper bound for the monitor's random bin-attention draw.
///
/// Each cycle the monitor draws uniformly in `0..BIN_ATTENTION_BOUND`;
/// a bin count above the draw triggers an attention report. A count at or
/// above the bound therefore guarantees a report.
pub const BIN_ATTENTION_BOUND: u64 = 4;

// ============================================================================
// Message Catalogs
// ============================================================================

/// Items the operator can inject onto the line.
pub const ITEM_CATALOG: [&str; 7] = [
    "hex bolts",
    "ball bearings",
    "gasket rings",
    "copper fittings",
    "valve stems",
    "spring clips",
    "anchor plates",
];

/// Monitor reports when the line is running below the starvation threshold.
pub const STARVED_MESSAGES: [&str; 4] = [
    "Feed conveyor is nearly empty!",
    "The line is running dry — where's the next batch?",
    "Stations are idling, nothing to work on!",
    "Throughput is about to flatline!",
];

/// Monitor reports when the output bin has accumulated too much.
pub const BIN_ATTENTION_MESSAGES: [&str; 4] = [
    "Output bin is piling up — someone empty it!",
    "Finished goods are about to overflow the bin!",
    "The bin smells like overtime. Clear it out!",
    "No more room in the output bin!",
];

/// Operator remarks when emptying the output bin.
pub const BIN_RESET_REMARKS: [&str; 4] = [
    "Hauling it off to the warehouse!",
    "Heavy work, but somebody's gotta do it!",
    "An operator's shift is never done!",
    "Where's the forklift when you need it?!",
];

/// Pick a random entry from a message catalog.
pub fn random_message(catalog: &[&'static str]) -> &'static str {
    catalog[rand::thread_rng().gen_range(0..catalog.len())]
}

// ============================================================================
// Timing Profile
// ============================================================================

/// Minimum simulated processing delay per stage (ms). Real-time profile.
const STAGE_DELAY_MIN_MS: u64 = 3_000;

/// Random span added to the minimum stage delay (ms). Delays land in
/// `[min, min + span)`.
const STAGE_DELAY_SPAN_MS: u64 = 3_000;

/// Minimum monitor sleep between observation steps (ms).
const MONITOR_DELAY_MIN_MS: u64 = 1_000;

/// Random span added to the minimum monitor sleep (ms).
const MONITOR_DELAY_SPAN_MS: u64 = 2_000;

/// Simulated delay ranges for workers and the monitor.
///
/// Pauses are drawn uniformly from `[min, min + span)` each time, so two
/// traversals of the same item never take exactly as long. `instant()`
/// collapses every pause to zero for tests.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub stage_delay_min_ms: u64,
    pub stage_delay_span_ms: u64,
    pub monitor_delay_min_ms: u64,
    pub monitor_delay_span_ms: u64,
}

impl Timing {
    /// Real-time profile: stage work takes seconds, like the physical line.
    pub fn realtime() -> Self {
        Self {
            stage_delay_min_ms: STAGE_DELAY_MIN_MS,
            stage_delay_span_ms: STAGE_DELAY_SPAN_MS,
            monitor_delay_min_ms: MONITOR_DELAY_MIN_MS,
            monitor_delay_span_ms: MONITOR_DELAY_SPAN_MS,
        }
    }

    /// Real-time profile compressed by a speed factor (1 = real-time).
    pub fn scaled(speed: u64) -> Self {
        let speed = speed.max(1);
        let base = Self::realtime();
        Self {
            stage_delay_min_ms: base.stage_delay_min_ms / speed,
            stage_delay_span_ms: base.stage_delay_span_ms / speed,
            monitor_delay_min_ms: base.monitor_delay_min_ms / speed,
            monitor_delay_span_ms: base.monitor_delay_span_ms / speed,
        }
    }

    /// Zero-delay profile for tests.
    pub fn instant() -> Self {
        Self {
            stage_delay_min_ms: 0,
            stage_delay_span_ms: 0,
            monitor_delay_min_ms: 0,
            monitor_delay_span_ms: 0,
        }
    }

    /// Draw one simulated stage processing pause.
    pub fn stage_pause(&self) -> Duration {
        Duration::from_millis(draw(self.stage_delay_min_ms, self.stage_delay_span_ms))
    }

    /// Draw one monitor sleep interval.
    pub fn monitor_pause(&self) -> Duration {
        Duration::from_millis(draw(self.monitor_delay_min_ms, self.monitor_delay_span_ms))
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::realtime()
    }
}

fn draw(min_ms: u64, span_ms: u64) -> u64 {
    if span_ms == 0 {
        min_ms
    } else {
        min_ms + rand::thread_rng().gen_range(0..span_ms)
    }
}
