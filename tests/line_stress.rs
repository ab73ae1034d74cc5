//! Line Stress Tests
//!
//! Drives the full line — dispatcher, workers, monitor, stages, bin —
//! under real concurrency with bounded random delays and asserts the
//! accounting invariants hold: no stage leak, bin count equals completed
//! traversals, clean shutdown with no occupancy violation.

use packline::config::Timing;
use packline::{Dispatcher, LineMonitor, Pipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Short but non-zero delays so traversals genuinely interleave.
fn stress_timing() -> Timing {
    Timing {
        stage_delay_min_ms: 1,
        stage_delay_span_ms: 3,
        monitor_delay_min_ms: 5,
        monitor_delay_span_ms: 5,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_concurrent_items_drain_cleanly() {
    let pipeline = Arc::new(Pipeline::with_default_layout(stress_timing()));
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(pipeline.clone(), cancel.clone());
    dispatcher.spawn_monitor(LineMonitor::new(pipeline.clone(), cancel.clone()));

    for i in 0..50 {
        dispatcher.inject_item(format!("stress-item-{i}"));
    }

    let violation = tokio::time::timeout(Duration::from_secs(30), dispatcher.shutdown())
        .await
        .expect("line drained within the timeout");
    assert!(violation.is_none(), "no occupancy invariant violation");

    let stats = dispatcher.stats();
    assert_eq!(stats.injected, 50);
    assert_eq!(
        stats.completed + stats.rejected,
        50,
        "every worker reported an outcome"
    );

    // Deposits match completed traversals exactly; rejected items never
    // touched a stage or the bin.
    assert_eq!(pipeline.bin().count(), stats.completed);

    // No stage leak: every enter was matched by a leave.
    for stage in pipeline.stages() {
        assert_eq!(
            stage.occupancy(),
            0,
            "stage '{}' left with residual occupancy",
            stage.label()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn staggered_injection_with_mid_run_reset() {
    let pipeline = Arc::new(Pipeline::with_default_layout(stress_timing()));
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(pipeline.clone(), cancel.clone());

    // Stagger injections so most items are admitted rather than rejected.
    for i in 0..20 {
        dispatcher.inject_item(format!("wave-1-{i}"));
        tokio::time::sleep(Duration::from_millis(4)).await;
    }

    // Empty the bin while workers are still flowing; later deposits keep
    // accumulating from zero.
    dispatcher.trigger_reset();
    let count_after_reset = pipeline.bin().count();

    for i in 0..10 {
        dispatcher.inject_item(format!("wave-2-{i}"));
        tokio::time::sleep(Duration::from_millis(4)).await;
    }

    let violation = tokio::time::timeout(Duration::from_secs(30), dispatcher.shutdown())
        .await
        .expect("line drained within the timeout");
    assert!(violation.is_none());

    let stats = dispatcher.stats();
    assert_eq!(stats.injected, 30);
    assert_eq!(stats.completed + stats.rejected, 30);

    // The bin only ever counts deposits made after the reset.
    assert!(pipeline.bin().count() >= count_after_reset);
    assert!(pipeline.bin().count() <= stats.completed);
    assert_eq!(pipeline.total_occupancy(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_with_idle_line_is_immediate() {
    let pipeline = Arc::new(Pipeline::with_default_layout(stress_timing()));
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(pipeline.clone(), cancel.clone());
    dispatcher.spawn_monitor(LineMonitor::new(pipeline, cancel));

    // Nothing in flight: shutdown only has the monitor to reap.
    let violation = tokio::time::timeout(Duration::from_millis(500), dispatcher.shutdown())
        .await
        .expect("idle shutdown is prompt");
    assert!(violation.is_none());

    let stats = dispatcher.stats();
    assert_eq!(stats.injected, 0);
}
