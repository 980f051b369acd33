//! Backend errors

use cranelift_module::ModuleError;

/// Errors produced while compiling a graph.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Cranelift module-level error.
    #[error("cranelift module error: {0}")]
    Module(Box<ModuleError>),

    /// Failed to create the target ISA or the JIT builder.
    #[error("jit builder initialization failed: {0}")]
    Builder(String),

    /// Generated IR failed the Cranelift verifier.
    #[error("ir verification failed: {0}")]
    Verifier(String),

    /// Graph shape the backend cannot lower.
    #[error("unsupported graph: {0}")]
    Unsupported(String),
}

impl From<ModuleError> for BackendError {
    fn from(value: ModuleError) -> Self {
        Self::Module(Box::new(value))
    }
}
