//! TOML configuration for the harness

use std::path::Path;

use serde::Deserialize;
use wasmgraph_jit::{Backend, GraphInterpreter, JitCompiler, JitOptions, OptLevel};

use crate::error::HarnessError;

/// Default config file looked up by [`HarnessConfig::load_or_default`]
pub const DEFAULT_CONFIG_PATH: &str = "wasmgraph.toml";

/// Which backend executes scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Native code through Cranelift
    #[default]
    Cranelift,
    /// Graph interpreter
    Interpreter,
}

/// Cranelift optimisation level as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevelSetting {
    /// `none`
    None,
    /// `speed`
    #[default]
    Speed,
    /// `speed_and_size`
    SpeedAndSize,
}

impl From<OptLevelSetting> for OptLevel {
    fn from(value: OptLevelSetting) -> Self {
        match value {
            OptLevelSetting::None => Self::None,
            OptLevelSetting::Speed => Self::Speed,
            OptLevelSetting::SpeedAndSize => Self::SpeedAndSize,
        }
    }
}

/// Harness configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Backend used by [`crate::Runner::new`]
    pub backend: BackendKind,

    /// Cranelift optimisation level
    pub opt_level: OptLevelSetting,

    /// Log each scenario's disassembly and graph at debug level
    pub trace_graph: bool,

    /// Run the Cranelift verifier on generated IR
    pub verify_ir: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Cranelift,
            opt_level: OptLevelSetting::Speed,
            trace_graph: false,
            verify_ir: true,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists, falling
    /// back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if !default_path.exists() {
                    return Self::default();
                }
                default_path
            }
        };
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(target: "wasmgraph::harness", error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Cranelift options derived from this configuration
    pub fn jit_options(&self) -> JitOptions {
        JitOptions {
            opt_level: self.opt_level.into(),
            verify_ir: self.verify_ir,
        }
    }

    /// Instantiate the configured backend
    pub fn make_backend(&self) -> Box<dyn Backend> {
        match self.backend {
            BackendKind::Cranelift => Box::new(JitCompiler::with_options(self.jit_options())),
            BackendKind::Interpreter => Box::new(GraphInterpreter::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::parse("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.make_backend().name(), "cranelift");
    }

    #[test]
    fn test_parse_all_fields() {
        let config = HarnessConfig::parse(
            r#"
            backend = "interpreter"
            opt_level = "speed_and_size"
            trace_graph = true
            verify_ir = false
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Interpreter);
        assert_eq!(config.jit_options().opt_level, OptLevel::SpeedAndSize);
        assert!(config.trace_graph);
        assert!(!config.jit_options().verify_ir);
        assert_eq!(config.make_backend().name(), "interpreter");
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(HarnessConfig::parse(r#"backend = "llvm""#).is_err());
    }

    #[test]
    fn test_load_errors_fall_back() {
        let missing = Path::new("/nonexistent/wasmgraph.toml");
        assert!(matches!(
            HarnessConfig::load(missing),
            Err(HarnessError::ConfigRead { .. })
        ));
        assert_eq!(
            HarnessConfig::load_or_default(Some(missing)),
            HarnessConfig::default()
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("wasmgraph-config-{}.toml", std::process::id()));
        std::fs::write(&path, "opt_level = \"none\"\n").unwrap();
        let config = HarnessConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.opt_level, OptLevelSetting::None);
        assert_eq!(config.backend, BackendKind::Cranelift);
    }
}
