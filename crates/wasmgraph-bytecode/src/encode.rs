//! Helpers for authoring bytecode literals.
//!
//! Each helper returns the encoded bytes of one expression; nested expressions
//! are passed in already encoded.
//!
//! ```
//! use wasmgraph_bytecode::encode::*;
//!
//! // { if (p0) p0 = 61; return p0; }
//! let body = block([
//!     if_(get_local(0), set_local(0, i8_const(61))),
//!     return_(get_local(0)),
//! ]);
//! assert_eq!(body[0], wasmgraph_bytecode::Opcode::Block.to_byte());
//! ```

use crate::opcode::Opcode;
use crate::value::MemType;

fn op(opcode: Opcode) -> Vec<u8> {
    vec![opcode.to_byte()]
}

fn with_operands(mut head: Vec<u8>, operands: impl IntoIterator<Item = Vec<u8>>) -> Vec<u8> {
    for operand in operands {
        head.extend(operand);
    }
    head
}

fn counted(opcode: Opcode, exprs: impl IntoIterator<Item = Vec<u8>>) -> Vec<u8> {
    let exprs: Vec<Vec<u8>> = exprs.into_iter().collect();
    assert!(
        exprs.len() <= u8::MAX as usize,
        "{} takes at most 255 expressions, got {}",
        opcode.name(),
        exprs.len()
    );
    with_operands(vec![opcode.to_byte(), exprs.len() as u8], exprs)
}

/// `nop`
pub fn nop() -> Vec<u8> {
    op(Opcode::Nop)
}

/// int8 constant, sign-extended to int32
pub fn i8_const(value: i8) -> Vec<u8> {
    vec![Opcode::Int8Const.to_byte(), value as u8]
}

/// The int32 constant `0`
pub fn zero() -> Vec<u8> {
    i8_const(0)
}

/// int32 constant
pub fn i32_const(value: i32) -> Vec<u8> {
    with_operands(op(Opcode::Int32Const), [value.to_le_bytes().to_vec()])
}

/// float32 constant
pub fn f32_const(value: f32) -> Vec<u8> {
    with_operands(op(Opcode::Float32Const), [value.to_le_bytes().to_vec()])
}

/// float64 constant
pub fn f64_const(value: f64) -> Vec<u8> {
    with_operands(op(Opcode::Float64Const), [value.to_le_bytes().to_vec()])
}

/// Read local `index`
pub fn get_local(index: u8) -> Vec<u8> {
    vec![Opcode::GetLocal.to_byte(), index]
}

/// Write `value` to local `index`
pub fn set_local(index: u8, value: Vec<u8>) -> Vec<u8> {
    with_operands(vec![Opcode::SetLocal.to_byte(), index], [value])
}

/// Load a `mem` element at byte offset `index`
pub fn get_heap(mem: MemType, index: Vec<u8>) -> Vec<u8> {
    with_operands(vec![Opcode::GetHeap.to_byte(), mem.to_byte()], [index])
}

/// Store `value` as a `mem` element at byte offset `index`
pub fn set_heap(mem: MemType, index: Vec<u8>, value: Vec<u8>) -> Vec<u8> {
    with_operands(vec![Opcode::SetHeap.to_byte(), mem.to_byte()], [index, value])
}

/// Any binary operator
pub fn binop(opcode: Opcode, lhs: Vec<u8>, rhs: Vec<u8>) -> Vec<u8> {
    assert!(
        opcode.binary_signature().is_some(),
        "{} is not a binary operator",
        opcode.name()
    );
    with_operands(op(opcode), [lhs, rhs])
}

/// Any unary operator
pub fn unop(opcode: Opcode, input: Vec<u8>) -> Vec<u8> {
    assert!(
        opcode.unary_signature().is_some(),
        "{} is not a unary operator",
        opcode.name()
    );
    with_operands(op(opcode), [input])
}

/// `lhs + rhs` on int32
pub fn i32_add(lhs: Vec<u8>, rhs: Vec<u8>) -> Vec<u8> {
    binop(Opcode::Int32Add, lhs, rhs)
}

/// `lhs - rhs` on int32
pub fn i32_sub(lhs: Vec<u8>, rhs: Vec<u8>) -> Vec<u8> {
    binop(Opcode::Int32Sub, lhs, rhs)
}

/// `lhs + rhs` on float32
pub fn f32_add(lhs: Vec<u8>, rhs: Vec<u8>) -> Vec<u8> {
    binop(Opcode::Float32Add, lhs, rhs)
}

/// `lhs + rhs` on float64
pub fn f64_add(lhs: Vec<u8>, rhs: Vec<u8>) -> Vec<u8> {
    binop(Opcode::Float64Add, lhs, rhs)
}

/// Logical not
pub fn not(input: Vec<u8>) -> Vec<u8> {
    unop(Opcode::LogicalNot, input)
}

/// Truncate a float32 to int32
pub fn i32_from_f32(input: Vec<u8>) -> Vec<u8> {
    unop(Opcode::Int32FromFloat32, input)
}

/// Truncate a float64 to int32
pub fn i32_from_f64(input: Vec<u8>) -> Vec<u8> {
    unop(Opcode::Int32FromFloat64, input)
}

/// Sequence of expressions; a break target
pub fn block(exprs: impl IntoIterator<Item = Vec<u8>>) -> Vec<u8> {
    counted(Opcode::Block, exprs)
}

/// Repeat the expressions until a break; a break target
pub fn loop_(exprs: impl IntoIterator<Item = Vec<u8>>) -> Vec<u8> {
    counted(Opcode::Loop, exprs)
}

/// `while (cond) body`, i.e. `loop { if (!cond) break 0; body }`
pub fn while_(cond: Vec<u8>, body: Vec<u8>) -> Vec<u8> {
    loop_([if_(not(cond), break_(0)), body])
}

/// `if (cond) then`
pub fn if_(cond: Vec<u8>, then: Vec<u8>) -> Vec<u8> {
    with_operands(op(Opcode::If), [cond, then])
}

/// `if (cond) then else otherwise`
pub fn if_else(cond: Vec<u8>, then: Vec<u8>, otherwise: Vec<u8>) -> Vec<u8> {
    with_operands(op(Opcode::IfElse), [cond, then, otherwise])
}

/// `cond ? if_true : if_false`
pub fn ternary(cond: Vec<u8>, if_true: Vec<u8>, if_false: Vec<u8>) -> Vec<u8> {
    with_operands(op(Opcode::Ternary), [cond, if_true, if_false])
}

/// `(left, right)`
pub fn comma(left: Vec<u8>, right: Vec<u8>) -> Vec<u8> {
    with_operands(op(Opcode::Comma), [left, right])
}

/// Leave the `depth`-th enclosing block or loop
pub fn break_(depth: u8) -> Vec<u8> {
    vec![Opcode::Break.to_byte(), depth]
}

/// Return a single value
pub fn return_(value: Vec<u8>) -> Vec<u8> {
    counted(Opcode::Return, [value])
}
