//! Headless match runner for AI testing and CI verification.
//!
//! This crate drives `garrison_core` matches without any presentation
//! layer. It enables:
//!
//! - **Agent control**: an external program plays the player side over
//!   JSON lines on stdin/stdout
//! - **Balance testing**: AI-vs-AI batches in parallel with a JSON report
//! - **CI verification**: the same seed must always end in the same state
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, order, upgrade, ...)
//! - **stdout**: Responses, events and state (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the full command/response set.
//!
//! # Example
//!
//! ```bash
//! # Play interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p garrison_headless
//!
//! # Run a scenario file
//! cargo run -p garrison_headless -- run \
//!     --scenario crates/garrison_headless/scenarios/crossroads.ron
//!
//! # Verify determinism
//! cargo run -p garrison_headless -- verify --seed 42 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use game_runner::{run_game, verify_determinism, GameConfig, VerifyReport};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError, ScenarioMap};
