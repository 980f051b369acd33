//! Bytecode operands

use serde::{Deserialize, Serialize};

/// Index into the function's locals (parameters first, then declared locals)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LocalIndex(pub u8);

impl LocalIndex {
    /// Create a new local index
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for LocalIndex {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

/// Number of enclosing breakable constructs (`Block`/`Loop`) to leave, minus one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BreakDepth(pub u8);

impl BreakDepth {
    /// Create a new break depth
    #[inline]
    pub const fn new(depth: u8) -> Self {
        Self(depth)
    }

    /// Get depth value
    #[inline]
    pub const fn depth(self) -> u8 {
        self.0
    }
}
