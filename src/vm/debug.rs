//! Chunk disassembler.
//!
//! Read-only, human-facing rendering of a chunk's instructions. The output
//! is for debugging a front end or the VM itself; it is not a stable format.

use std::fmt::Write;

use super::{Chunk, OpCode};

/// Operand bytes following each opcode. The disassembler owns this table;
/// the interpreter decodes operands inline as part of dispatch.
fn operand_width(op: OpCode) -> usize {
    match op {
        OpCode::Constant => 1,
        OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide
        | OpCode::Negate
        | OpCode::Return => 0,
    }
}

/// Render a full listing of `chunk` under the header `name`.
///
/// Deterministic: the same chunk always renders to the same text.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Render the instruction at `offset`, returning the offset of the next one.
///
/// The source line column shows `|` when the line matches the previous
/// instruction byte's line, cutting noise for multi-instruction lines.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{:04} ", offset);

    let line = chunk.line(offset).unwrap_or(0);
    if offset > 0 && chunk.line(offset - 1) == Some(line) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", line);
    }

    let byte = chunk.code[offset];
    let Some(op) = OpCode::from_byte(byte) else {
        let _ = writeln!(out, "UNKNOWN {:#04x}", byte);
        return offset + 1;
    };

    match operand_width(op) {
        0 => {
            let _ = writeln!(out, "{}", op.mnemonic());
        }
        _ => match chunk.code.get(offset + 1) {
            Some(&idx) => {
                let _ = write!(out, "{:<16} {:4}", op.mnemonic(), idx);
                match chunk.constants.get(idx as usize) {
                    Some(value) => {
                        let _ = writeln!(out, " '{}'", value);
                    }
                    None => {
                        let _ = writeln!(out, " <out of range>");
                    }
                }
            }
            None => {
                let _ = writeln!(out, "{:<16} <truncated>", op.mnemonic());
            }
        },
    }

    offset + 1 + operand_width(op)
}
