//! # wasmgraph Bytecode
//!
//! This crate defines the bytecode format consumed by the wasmgraph graph builder,
//! together with the per-function metadata the builder decodes against.
//!
//! ## Design Principles
//!
//! - **Expression trees**: Every opcode is a tag byte followed by its immediates and
//!   its nested operand expressions, so a single forward pass decodes a body
//! - **Fixed arity**: Control constructs carry an explicit count (or a fixed arity) of
//!   nested expressions; the decoder never backtracks
//! - **Little-endian immediates**: 1 byte for int8 constants, 4 for int32/float32,
//!   8 for float64

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod disasm;
pub mod encode;
pub mod environment;
pub mod error;
pub mod opcode;
pub mod operand;
pub mod signature;
pub mod value;

pub use environment::{Environment, LinearMemory, MemoryRegion};
pub use error::{DisasmError, EnvironmentError};
pub use opcode::Opcode;
pub use operand::{BreakDepth, LocalIndex};
pub use signature::FunctionSignature;
pub use value::{MemType, Value, ValueType};

/// Maximum number of locals (parameters included) addressable by a one-byte index
pub const MAX_LOCALS: usize = 256;

/// Maximum nesting depth of expressions accepted by the decoders
pub const MAX_NESTING: usize = 256;
