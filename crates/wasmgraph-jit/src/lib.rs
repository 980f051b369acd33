//! # wasmgraph JIT
//!
//! Backends that turn a wasmgraph graph into a callable: a Cranelift JIT
//! producing native code, and a graph interpreter with identical semantics.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod backend;
pub mod compiler;
pub mod error;
pub mod interp;
pub mod translator;

pub use backend::{Backend, NativeCallable, invoke};
pub use compiler::{JitCompiler, JitFunction, JitOptions, OptLevel};
pub use error::BackendError;
pub use interp::{GraphInterpreter, InterpretedFunction};
