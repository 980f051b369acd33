//! Bytecode opcodes

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Bytecode opcodes
///
/// Expression-tree instruction set. Each opcode is followed by its immediates and
/// then by its nested operand expressions, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Control ====================
    /// No operation (void)
    Nop = 0x00,
    /// Sequence: count, then `count` expressions; a break target
    Block = 0x01,
    /// Repeat: count, then `count` expressions executed until a break; a break target
    Loop = 0x02,
    /// One-armed conditional: cond, then
    If = 0x03,
    /// Two-armed conditional: cond, then, else
    IfElse = 0x04,
    /// Leave the enclosing block/loop at the given depth
    Break = 0x05,
    /// Return: count, then `count` expressions
    Return = 0x06,
    /// Conditional expression: cond ? a : b
    Ternary = 0x07,
    /// Evaluate left, discard it, yield right
    Comma = 0x08,

    // ==================== Constants ====================
    /// int8 immediate, sign-extended to int32
    Int8Const = 0x09,
    /// int32 immediate (4 bytes LE)
    Int32Const = 0x0a,
    /// float32 immediate (4 bytes LE)
    Float32Const = 0x0b,
    /// float64 immediate (8 bytes LE)
    Float64Const = 0x0c,

    // ==================== Locals ====================
    /// Read a local: index
    GetLocal = 0x0e,
    /// Write a local and yield the value: index, value
    SetLocal = 0x0f,

    // ==================== Heap ====================
    /// Load from linear memory: mem type, byte offset
    GetHeap = 0x10,
    /// Store to linear memory and yield the value: mem type, byte offset, value
    SetHeap = 0x11,

    // ==================== Int32 ====================
    /// Wrapping addition
    Int32Add = 0x20,
    /// Wrapping subtraction
    Int32Sub = 0x21,
    /// Wrapping multiplication
    Int32Mul = 0x22,
    /// Bitwise AND
    Int32And = 0x23,
    /// Bitwise inclusive OR
    Int32Ior = 0x24,
    /// Bitwise XOR
    Int32Xor = 0x25,
    /// Equality, yields 0 or 1
    Int32Eq = 0x26,
    /// Signed less-than, yields 0 or 1
    Int32Slt = 0x27,
    /// Logical not: 1 if the operand is zero, 0 otherwise
    LogicalNot = 0x28,

    // ==================== Float32 ====================
    /// float32 addition
    Float32Add = 0x40,
    /// float32 subtraction
    Float32Sub = 0x41,
    /// float32 multiplication
    Float32Mul = 0x42,

    // ==================== Float64 ====================
    /// float64 addition
    Float64Add = 0x50,
    /// float64 subtraction
    Float64Sub = 0x51,
    /// float64 multiplication
    Float64Mul = 0x52,

    // ==================== Conversions ====================
    /// Truncate float32 to int32 (saturating, NaN becomes 0)
    Int32FromFloat32 = 0x60,
    /// Truncate float64 to int32 (saturating, NaN becomes 0)
    Int32FromFloat64 = 0x61,
    /// Convert signed int32 to float64
    Float64FromInt32 = 0x62,
}

impl Opcode {
    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Block),
            0x02 => Some(Self::Loop),
            0x03 => Some(Self::If),
            0x04 => Some(Self::IfElse),
            0x05 => Some(Self::Break),
            0x06 => Some(Self::Return),
            0x07 => Some(Self::Ternary),
            0x08 => Some(Self::Comma),

            0x09 => Some(Self::Int8Const),
            0x0a => Some(Self::Int32Const),
            0x0b => Some(Self::Float32Const),
            0x0c => Some(Self::Float64Const),

            0x0e => Some(Self::GetLocal),
            0x0f => Some(Self::SetLocal),

            0x10 => Some(Self::GetHeap),
            0x11 => Some(Self::SetHeap),

            0x20 => Some(Self::Int32Add),
            0x21 => Some(Self::Int32Sub),
            0x22 => Some(Self::Int32Mul),
            0x23 => Some(Self::Int32And),
            0x24 => Some(Self::Int32Ior),
            0x25 => Some(Self::Int32Xor),
            0x26 => Some(Self::Int32Eq),
            0x27 => Some(Self::Int32Slt),
            0x28 => Some(Self::LogicalNot),

            0x40 => Some(Self::Float32Add),
            0x41 => Some(Self::Float32Sub),
            0x42 => Some(Self::Float32Mul),

            0x50 => Some(Self::Float64Add),
            0x51 => Some(Self::Float64Sub),
            0x52 => Some(Self::Float64Mul),

            0x60 => Some(Self::Int32FromFloat32),
            0x61 => Some(Self::Int32FromFloat64),
            0x62 => Some(Self::Float64FromInt32),

            _ => None,
        }
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get the name of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nop => "Nop",
            Self::Block => "Block",
            Self::Loop => "Loop",
            Self::If => "If",
            Self::IfElse => "IfElse",
            Self::Break => "Break",
            Self::Return => "Return",
            Self::Ternary => "Ternary",
            Self::Comma => "Comma",
            Self::Int8Const => "Int8Const",
            Self::Int32Const => "Int32Const",
            Self::Float32Const => "Float32Const",
            Self::Float64Const => "Float64Const",
            Self::GetLocal => "GetLocal",
            Self::SetLocal => "SetLocal",
            Self::GetHeap => "GetHeap",
            Self::SetHeap => "SetHeap",
            Self::Int32Add => "Int32Add",
            Self::Int32Sub => "Int32Sub",
            Self::Int32Mul => "Int32Mul",
            Self::Int32And => "Int32And",
            Self::Int32Ior => "Int32Ior",
            Self::Int32Xor => "Int32Xor",
            Self::Int32Eq => "Int32Eq",
            Self::Int32Slt => "Int32Slt",
            Self::LogicalNot => "LogicalNot",
            Self::Float32Add => "Float32Add",
            Self::Float32Sub => "Float32Sub",
            Self::Float32Mul => "Float32Mul",
            Self::Float64Add => "Float64Add",
            Self::Float64Sub => "Float64Sub",
            Self::Float64Mul => "Float64Mul",
            Self::Int32FromFloat32 => "Int32FromFloat32",
            Self::Int32FromFloat64 => "Int32FromFloat64",
            Self::Float64FromInt32 => "Float64FromInt32",
        }
    }

    /// Operand and result type of a binary operator, `None` for other opcodes
    pub const fn binary_signature(self) -> Option<(ValueType, ValueType)> {
        match self {
            Self::Int32Add
            | Self::Int32Sub
            | Self::Int32Mul
            | Self::Int32And
            | Self::Int32Ior
            | Self::Int32Xor
            | Self::Int32Eq
            | Self::Int32Slt => Some((ValueType::Int32, ValueType::Int32)),
            Self::Float32Add | Self::Float32Sub | Self::Float32Mul => {
                Some((ValueType::Float32, ValueType::Float32))
            }
            Self::Float64Add | Self::Float64Sub | Self::Float64Mul => {
                Some((ValueType::Float64, ValueType::Float64))
            }
            _ => None,
        }
    }

    /// Operand and result type of a unary operator, `None` for other opcodes
    pub const fn unary_signature(self) -> Option<(ValueType, ValueType)> {
        match self {
            Self::LogicalNot => Some((ValueType::Int32, ValueType::Int32)),
            Self::Int32FromFloat32 => Some((ValueType::Float32, ValueType::Int32)),
            Self::Int32FromFloat64 => Some((ValueType::Float64, ValueType::Int32)),
            Self::Float64FromInt32 => Some((ValueType::Int32, ValueType::Float64)),
            _ => None,
        }
    }
}
