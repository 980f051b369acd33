//! Scalar value types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of a parameter, local, expression result or heap element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// 32-bit two's complement integer
    Int32,
    /// IEEE 754 single precision float
    Float32,
    /// IEEE 754 double precision float
    Float64,
}

impl ValueType {
    /// Get the name of this type
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Size in bytes of a value of this type
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// The zero value of this type (initial value of declared locals)
    pub const fn zero(self) -> Value {
        match self {
            Self::Int32 => Value::I32(0),
            Self::Float32 => Value::F32(0.0),
            Self::Float64 => Value::F64(0.0),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a heap access.
///
/// Governs the width and interpretation of the bytes at the accessed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MemType {
    /// 4-byte integer
    Int32 = 0,
    /// 4-byte float
    Float32 = 1,
    /// 8-byte float
    Float64 = 2,
}

impl MemType {
    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Int32),
            1 => Some(Self::Float32),
            2 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Value type produced by a load of this element type
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Int32 => ValueType::Int32,
            Self::Float32 => ValueType::Float32,
            Self::Float64 => ValueType::Float64,
        }
    }

    /// Access width in bytes
    #[inline]
    pub const fn size(self) -> usize {
        self.value_type().size()
    }
}

impl fmt::Display for MemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mem.{}", self.value_type())
    }
}

/// A typed scalar passed to or returned from a compiled function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// int32 value
    I32(i32),
    /// float32 value
    F32(f32),
    /// float64 value
    F64(f64),
}

impl Value {
    /// Type of this value
    pub const fn ty(self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::Int32,
            Self::F32(_) => ValueType::Float32,
            Self::F64(_) => ValueType::Float64,
        }
    }

    /// Pack into an 8-byte argument slot: the value's native-endian bytes sit at
    /// the start of the slot, the rest is zero.
    pub fn to_slot(self) -> u64 {
        let mut bytes = [0u8; 8];
        match self {
            Self::I32(v) => bytes[..4].copy_from_slice(&v.to_ne_bytes()),
            Self::F32(v) => bytes[..4].copy_from_slice(&v.to_ne_bytes()),
            Self::F64(v) => bytes = v.to_ne_bytes(),
        }
        u64::from_ne_bytes(bytes)
    }

    /// Unpack a slot written by compiled code or by [`Value::to_slot`]
    pub fn from_slot(ty: ValueType, slot: u64) -> Self {
        let bytes = slot.to_ne_bytes();
        let mut low = [0u8; 4];
        low.copy_from_slice(&bytes[..4]);
        match ty {
            ValueType::Int32 => Self::I32(i32::from_ne_bytes(low)),
            ValueType::Float32 => Self::F32(f32::from_ne_bytes(low)),
            ValueType::Float64 => Self::F64(f64::from_ne_bytes(bytes)),
        }
    }

    /// Bitwise equality (distinguishes `-0.0` from `0.0` and compares NaN payloads)
    pub fn bit_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}:i32"),
            Self::F32(v) => write!(f, "{v}:f32"),
            Self::F64(v) => write!(f, "{v}:f64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_type_byte() {
        assert_eq!(MemType::from_byte(1), Some(MemType::Float32));
        assert_eq!(MemType::from_byte(3), None);
        assert_eq!(MemType::Float64.size(), 8);
        assert_eq!(MemType::Int32.value_type(), ValueType::Int32);
    }

    #[test]
    fn test_slot_packing() {
        for value in [
            Value::I32(-7),
            Value::I32(i32::MIN),
            Value::F32(-0.5),
            Value::F64(1.0e300),
        ] {
            let unpacked = Value::from_slot(value.ty(), value.to_slot());
            assert!(unpacked.bit_eq(value), "{value} -> {unpacked}");
        }
    }

    #[test]
    fn test_bit_eq_distinguishes_signed_zero() {
        assert!(!Value::F64(0.0).bit_eq(Value::F64(-0.0)));
        assert!(!Value::I32(1).bit_eq(Value::F32(1.0)));
    }
}
