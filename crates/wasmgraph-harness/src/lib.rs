//! # wasmgraph Harness
//!
//! Runs bytecode scenarios end to end: builds the environment, decodes the
//! body into a graph, compiles it with the configured backend and checks the
//! results of calls against expected values.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub use config::{BackendKind, HarnessConfig, OptLevelSetting};
pub use error::HarnessError;
pub use report::{BackendReport, FailureInfo, HarnessReport};
pub use runner::{Case, Mismatch, Prepared, Runner, ScenarioOutcome, ScenarioResult};
pub use scenario::{MemoryInit, Scenario};

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `warn`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::WARN.into()))
        .with_test_writer()
        .try_init();
}
