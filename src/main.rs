//! Packline operator console.
//!
//! Interactive loop driving the packaging line simulator: inject items,
//! empty the output bin, or shut the line down. One detached worker task
//! is spawned per injected item; a long-running monitor task reports line
//! state concurrently.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session at real-time speed
//! cargo run --release
//!
//! # 10x time compression, reproducible item selection
//! cargo run --release -- --speed 10 --seed 42
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::Result;
use clap::Parser;
use packline::config::{Timing, ITEM_CATALOG};
use packline::{Dispatcher, LineMonitor, Pipeline};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "packline")]
#[command(about = "Bounded-capacity packaging line simulator")]
#[command(version)]
struct CliArgs {
    /// Time compression factor (1 = real-time, 10 = 10x faster)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Random seed for reproducible item selection
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Operator Commands
// ============================================================================

/// Parsed operator selection from one stdin line.
enum Command {
    Inject,
    Reset,
    Quit,
    Invalid,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim().parse::<i64>() {
            Ok(1) => Command::Inject,
            Ok(2) => Command::Reset,
            Ok(0) => Command::Quit,
            _ => Command::Invalid,
        }
    }
}

fn print_menu() {
    println!();
    println!("What's an operator to do?");
    println!("\t(1) Inject an item onto the line");
    println!("\t(2) Empty the output bin");
    println!("\t(0) Shut the line down");
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    info!("Packline starting");
    info!(speed = args.speed, seed = ?args.seed, "configuration");

    let timing = Timing::scaled(args.speed);
    let pipeline = Arc::new(Pipeline::with_default_layout(timing));
    for stage in pipeline.stages() {
        info!(
            stage = stage.label(),
            capacity = stage.capacity(),
            "stage ready"
        );
    }

    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(pipeline.clone(), cancel.clone());
    dispatcher.spawn_monitor(LineMonitor::new(pipeline.clone(), cancel.clone()));

    // Ctrl+C behaves like the quit command.
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received Ctrl+C, initiating shutdown");
        ctrlc_token.cancel();
    });

    run_console(&dispatcher, &cancel, args.seed).await;

    // Orderly shutdown: stop the monitor, drain in-flight workers.
    let violation = dispatcher.shutdown().await;
    let stats = dispatcher.stats();
    info!(%stats, bin_count = pipeline.bin().count(), "final statistics");

    if let Some(violation) = violation {
        // Fail-fast contract: an occupancy invariant breach ends the
        // process with a failure status.
        return Err(anyhow::Error::new(violation).context("line aborted on invariant violation"));
    }

    info!("Operator: \"This line is someone ELSE's problem now!\"");
    Ok(())
}

/// Read operator selections from stdin until quit, EOF, or cancellation.
///
/// Malformed input is re-prompted here and never reaches the core.
async fn run_console(dispatcher: &Dispatcher, cancel: &CancellationToken, seed: Option<u64>) {
    let mut item_rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu();

        let line = tokio::select! {
            () = cancel.cancelled() => {
                info!("console stopping on shutdown signal");
                break;
            }
            result = lines.next_line() => match result {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("stdin closed, shutting down");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read operator input, shutting down");
                    break;
                }
            },
        };

        match Command::parse(&line) {
            Command::Inject => {
                let item = ITEM_CATALOG[item_rng.gen_range(0..ITEM_CATALOG.len())];
                info!(item, "operator injects an item");
                dispatcher.inject_item(item);
            }
            Command::Reset => dispatcher.trigger_reset(),
            Command::Quit => {
                info!("operator requested shutdown");
                break;
            }
            Command::Invalid => {
                println!("That's not a valid option, please enter 0, 1, or 2 this time.");
            }
        }
    }
}
