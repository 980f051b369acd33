//! Bytecode disassembler.
//!
//! Renders a function body as an indented expression tree, one opcode per line,
//! each line prefixed with the opcode's byte offset.

use std::fmt::Write as _;

use crate::MAX_NESTING;
use crate::error::DisasmError;
use crate::opcode::Opcode;
use crate::value::MemType;

struct Disassembler<'a> {
    bytes: &'a [u8],
    pos: usize,
    out: String,
}

impl<'a> Disassembler<'a> {
    fn byte(&mut self) -> Result<u8, DisasmError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(DisasmError::UnexpectedEnd(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DisasmError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or(DisasmError::UnexpectedEnd(self.bytes.len()))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn line(&mut self, offset: usize, depth: usize, text: &str) {
        let _ = writeln!(self.out, "{offset:>4}: {:indent$}{text}", "", indent = depth * 2);
    }

    fn expr(&mut self, depth: usize) -> Result<(), DisasmError> {
        let offset = self.pos;
        if depth >= MAX_NESTING {
            return Err(DisasmError::NestingTooDeep(offset));
        }
        let byte = self.byte()?;
        let opcode = Opcode::from_byte(byte).ok_or(DisasmError::InvalidOpcode { byte, offset })?;
        let name = opcode.name();

        match opcode {
            Opcode::Nop => self.line(offset, depth, name),
            Opcode::Block | Opcode::Loop | Opcode::Return => {
                let count = self.byte()?;
                self.line(offset, depth, &format!("{name} {count}"));
                for _ in 0..count {
                    self.expr(depth + 1)?;
                }
            }
            Opcode::Break => {
                let d = self.byte()?;
                self.line(offset, depth, &format!("{name} {d}"));
            }
            Opcode::Int8Const => {
                let v = self.byte()? as i8;
                self.line(offset, depth, &format!("{name} {v}"));
            }
            Opcode::Int32Const => {
                let v = i32::from_le_bytes(self.array()?);
                self.line(offset, depth, &format!("{name} {v}"));
            }
            Opcode::Float32Const => {
                let v = f32::from_le_bytes(self.array()?);
                self.line(offset, depth, &format!("{name} {v:?}"));
            }
            Opcode::Float64Const => {
                let v = f64::from_le_bytes(self.array()?);
                self.line(offset, depth, &format!("{name} {v:?}"));
            }
            Opcode::GetLocal => {
                let idx = self.byte()?;
                self.line(offset, depth, &format!("{name} {idx}"));
            }
            Opcode::SetLocal => {
                let idx = self.byte()?;
                self.line(offset, depth, &format!("{name} {idx}"));
                self.expr(depth + 1)?;
            }
            Opcode::GetHeap | Opcode::SetHeap => {
                let mem = self.byte()?;
                match MemType::from_byte(mem) {
                    Some(mem) => self.line(offset, depth, &format!("{name} {mem}")),
                    None => self.line(offset, depth, &format!("{name} <mem {mem:#04x}>")),
                }
                let operands = if opcode == Opcode::GetHeap { 1 } else { 2 };
                for _ in 0..operands {
                    self.expr(depth + 1)?;
                }
            }
            Opcode::If | Opcode::Comma => {
                self.line(offset, depth, name);
                self.expr(depth + 1)?;
                self.expr(depth + 1)?;
            }
            Opcode::IfElse | Opcode::Ternary => {
                self.line(offset, depth, name);
                for _ in 0..3 {
                    self.expr(depth + 1)?;
                }
            }
            _ if opcode.binary_signature().is_some() => {
                self.line(offset, depth, name);
                self.expr(depth + 1)?;
                self.expr(depth + 1)?;
            }
            _ => {
                self.line(offset, depth, name);
                self.expr(depth + 1)?;
            }
        }
        Ok(())
    }
}

/// Disassemble a function body (a sequence of expressions)
pub fn disassemble(bytes: &[u8]) -> Result<String, DisasmError> {
    let mut d = Disassembler {
        bytes,
        pos: 0,
        out: String::new(),
    };
    while d.pos < bytes.len() {
        d.expr(0)?;
    }
    Ok(d.out)
}

/// Render bytes as space-separated hex
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::*;

    #[test]
    fn test_disassemble_tree() {
        let code = block([
            if_(get_local(0), set_local(0, i8_const(61))),
            return_(get_local(0)),
        ]);
        let text = disassemble(&code).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "   0: Block 2");
        assert_eq!(lines[1], "   2:   If");
        assert_eq!(lines[2], "   3:     GetLocal 0");
        assert_eq!(lines[3], "   5:     SetLocal 0");
        assert_eq!(lines[4], "   7:       Int8Const 61");
        assert_eq!(lines[5], "   9:   Return 1");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_disassemble_heap() {
        let code = return_(get_heap(MemType::Int32, i32_const(8)));
        let text = disassemble(&code).unwrap();
        assert!(text.contains("GetHeap mem.int32"));
        assert!(text.contains("Int32Const 8"));
    }

    #[test]
    fn test_disassemble_errors() {
        assert_eq!(
            disassemble(&[0x0d]),
            Err(DisasmError::InvalidOpcode {
                byte: 0x0d,
                offset: 0
            })
        );
        assert_eq!(disassemble(&[0x0a, 1, 2]), Err(DisasmError::UnexpectedEnd(3)));
    }

    #[test]
    fn test_disassemble_nesting_limit() {
        let nested = |levels: usize| {
            (0..levels).fold(get_local(0), |inner, _| not(inner))
        };
        assert!(disassemble(&nested(MAX_NESTING - 1)).is_ok());
        // Each `not` is one byte, so the first rejected opcode sits at the limit
        assert_eq!(
            disassemble(&nested(20_000)),
            Err(DisasmError::NestingTooDeep(MAX_NESTING))
        );
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x06, 1, 0x09, 0xff]), "06 01 09 ff");
    }
}
