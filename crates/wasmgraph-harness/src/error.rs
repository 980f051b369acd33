//! Harness errors

use std::path::PathBuf;

use thiserror::Error;
use wasmgraph_bytecode::EnvironmentError;
use wasmgraph_graph::DecodeError;
use wasmgraph_jit::BackendError;

/// Errors raised while preparing or reporting scenarios
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration file could not be read
    #[error("failed to read config '{path}': {source}")]
    ConfigRead {
        /// Config file path
        path: PathBuf,
        /// I/O error
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::HarnessConfig`]
    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        /// Config file path
        path: PathBuf,
        /// TOML error
        source: toml::de::Error,
    },

    /// Locals or memory could not be set up
    #[error("environment setup failed: {0}")]
    Environment(#[from] EnvironmentError),

    /// The bytecode failed to decode
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The backend failed to compile the graph
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Report serialisation failed
    #[error("report serialisation failed: {0}")]
    Report(#[from] serde_json::Error),
}
