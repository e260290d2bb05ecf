//! Bytecode listings for debugging.
//!
//! Renders one line per decoded instruction. Unknown bytes and truncated
//! operands render as raw markers instead of failing, so partial or
//! corrupted buffers still produce a readable listing.

use std::fmt::Write;

use crate::opcode::OpCode;

/// Render a full listing of `code`, one `offset  MNEMONIC operands` line per
/// instruction.
pub fn disassemble(code: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while let Some((text, next)) = disassemble_one(code, pc) {
        let _ = writeln!(out, "{pc:04}  {text}");
        pc = next;
    }
    out
}

/// Decode the instruction at `pc`, returning its rendering and the offset of
/// the following instruction. `None` once `pc` is past the end.
pub fn disassemble_one(code: &[u8], pc: usize) -> Option<(String, usize)> {
    let byte = *code.get(pc)?;
    let Some(op) = OpCode::from_u8(byte) else {
        return Some((format!("??? 0x{byte:02X}"), pc + 1));
    };
    let operands = pc + 1;

    let decoded = match op {
        OpCode::PushNumber => match read_f32(code, operands) {
            Some(value) => (format!("{op} {value}"), operands + 4),
            None => truncated(op, code),
        },
        OpCode::PushString => match read_u32(code, operands) {
            Some(length) => {
                let start = operands + 4;
                let body = start
                    .checked_add(length as usize)
                    .and_then(|end| code.get(start..end));
                match body {
                    Some(bytes) => (
                        format!("{op} {:?}", String::from_utf8_lossy(bytes)),
                        start + length as usize,
                    ),
                    None => truncated(op, code),
                }
            }
            None => truncated(op, code),
        },
        OpCode::Pop => match (read_u8(code, operands), read_u8(code, operands + 1)) {
            (Some(offset), Some(count)) => (format!("{op} {offset},{count}"), operands + 2),
            _ => truncated(op, code),
        },
        OpCode::Peek => match read_u8(code, operands) {
            Some(offset) => (format!("{op} {offset}"), operands + 1),
            None => truncated(op, code),
        },
        jump if jump.is_jump() => match read_u32(code, operands) {
            Some(target) => (format!("{op} {target}"), operands + 4),
            None => truncated(op, code),
        },
        _ => (op.to_string(), operands),
    };
    Some(decoded)
}

fn truncated(op: OpCode, code: &[u8]) -> (String, usize) {
    (format!("{op} <truncated>"), code.len())
}

fn read_u8(code: &[u8], at: usize) -> Option<u8> {
    code.get(at).copied()
}

fn read_u32(code: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = code.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

fn read_f32(code: &[u8], at: usize) -> Option<f32> {
    let bytes: [u8; 4] = code.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(f32::from_le_bytes(bytes))
}
