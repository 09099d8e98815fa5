//! Headless combat runner for CI verification and balance checks.
//!
//! Runs scripted arcade scenarios without graphics:
//!
//! - **Scenarios**: RON files describing the map, the player, AI squads and
//!   timed player inputs
//! - **Definitions**: optional directories of RON tables layered over the
//!   builtin weapons, bombs and AI profiles
//! - **Output**: the drained event log as JSON lines on stdout, then a
//!   summary line with the final state hash
//!
//! Logs go to stderr so stdout stays machine-readable.
//!
//! # Example
//!
//! ```bash
//! cargo run -p arcade_headless -- run --scenario crates/arcade_headless/scenarios/crate_wall.ron
//! cargo run -p arcade_headless -- defs --definitions data/
//! ```

pub mod definitions_loader;
pub mod runner;
pub mod scenario;

pub use definitions_loader::{load_definitions_dir, LoadedDefinitions};
pub use runner::{HeadlessRunner, RunConfig, RunSummary};
pub use scenario::{Scenario, ScenarioError};
