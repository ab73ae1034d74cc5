//! Packline: bounded-capacity packaging line simulator.
//!
//! Models a sequential multi-stage line with strict per-stage capacity
//! limits. Independent worker tasks carry items through the stages, a
//! monitor task periodically reports aggregate line state, and the
//! dispatcher relays operator commands and performs orderly shutdown.
//!
//! ## Architecture
//!
//! - **BoundedStage**: capacity-limited holding area with blocking admission
//! - **Pipeline**: ordered traversal over shared stages into the output bin
//! - **OutputBin**: resettable deposit counter
//! - **LineMonitor**: long-running advisory observer
//! - **Dispatcher**: worker spawning, reset, and shutdown coordination

pub mod config;
pub mod dispatcher;
pub mod monitor;
pub mod output_bin;
pub mod pipeline;
pub mod stage;

pub use config::Timing;
pub use dispatcher::{Dispatcher, LineStats};
pub use monitor::LineMonitor;
pub use output_bin::OutputBin;
pub use pipeline::{Pipeline, TraversalOutcome};
pub use stage::{BoundedStage, StageViolation};
