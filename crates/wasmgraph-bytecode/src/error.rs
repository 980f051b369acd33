//! Bytecode and environment errors

use thiserror::Error;

/// Errors raised while setting up a function environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    /// The new local index would not fit in a one-byte operand
    #[error("Too many locals: index {0} does not fit in a byte")]
    TooManyLocals(usize),

    /// A linear memory was already bound to this environment
    #[error("Linear memory already bound")]
    MemoryAlreadyBound,

    /// Memory region with `end < start`
    #[error("Invalid memory region: start {start:#x}, end {end:#x}")]
    InvalidRegion {
        /// Region start address
        start: usize,
        /// Region end address (exclusive)
        end: usize,
    },
}

/// Errors raised while disassembling bytecode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisasmError {
    /// Invalid opcode
    #[error("Invalid opcode {byte:#04x} at offset {offset}")]
    InvalidOpcode {
        /// Offending byte
        byte: u8,
        /// Byte offset of the opcode
        offset: usize,
    },

    /// Unexpected end of bytecode
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// Expressions nested deeper than [`crate::MAX_NESTING`]
    #[error("Expression nesting too deep at offset {0}")]
    NestingTooDeep(usize),
}
