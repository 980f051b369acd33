//! Decode errors

use std::fmt;

use thiserror::Error;

/// Classification of a decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorCode {
    /// Byte is not an opcode
    UnknownOpcode,
    /// Body ends inside an opcode or its immediates
    UnexpectedEnd,
    /// Local index beyond parameters plus declared locals
    InvalidLocal,
    /// Heap opcode without a bound memory
    MissingMemory,
    /// Heap opcode with an unknown memory type byte
    InvalidMemType,
    /// Operand type differs from what the opcode requires
    TypeMismatch,
    /// Void expression where a value is required
    ExpectedValue,
    /// Break depth beyond the enclosing blocks and loops
    InvalidBreakDepth,
    /// Return with a count other than one
    ArityMismatch,
    /// Control reaches the end of the body without returning
    FallThrough,
    /// Expressions nested deeper than the decoder accepts
    NestingTooDeep,
}

impl DecodeErrorCode {
    /// Get the name of this code
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownOpcode => "unknown opcode",
            Self::UnexpectedEnd => "unexpected end",
            Self::InvalidLocal => "invalid local",
            Self::MissingMemory => "missing memory",
            Self::InvalidMemType => "invalid memory type",
            Self::TypeMismatch => "type mismatch",
            Self::ExpectedValue => "expected value",
            Self::InvalidBreakDepth => "invalid break depth",
            Self::ArityMismatch => "arity mismatch",
            Self::FallThrough => "fall through",
            Self::NestingTooDeep => "nesting too deep",
        }
    }
}

impl fmt::Display for DecodeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bytecode body failed to decode or verify
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("verification failed: {code} at +{opcode_offset} (cursor +{offset}): {message}")]
pub struct DecodeError {
    /// What went wrong
    pub code: DecodeErrorCode,
    /// Byte offset of the opcode being decoded
    pub opcode_offset: usize,
    /// Byte offset of the decoder cursor
    pub offset: usize,
    /// Human-readable detail
    pub message: String,
}

impl DecodeError {
    /// Create a decode error
    pub fn new(
        code: DecodeErrorCode,
        opcode_offset: usize,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            opcode_offset,
            offset,
            message: message.into(),
        }
    }
}

/// Result type for graph building
pub type Result<T> = std::result::Result<T, DecodeError>;
