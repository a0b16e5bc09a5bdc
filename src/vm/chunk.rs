//! Bytecode chunks: instruction stream, line table, constant pool.

use super::Value;

/// One-byte instruction opcodes.
///
/// Stack effects (for binary operators the right operand pops first, since
/// it was pushed last):
/// - `Constant idx`: `[] -> [constants[idx]]` (one operand byte)
/// - `Add`:      `[lhs, rhs] -> [lhs + rhs]`
/// - `Subtract`: `[lhs, rhs] -> [lhs - rhs]`
/// - `Multiply`: `[lhs, rhs] -> [lhs * rhs]`
/// - `Divide`:   `[lhs, rhs] -> [lhs / rhs]`
/// - `Negate`:   `[v] -> [-v]`
/// - `Return`:   `[v] -> []`, prints v and halts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Constant = 0,
    Add = 1,
    Subtract = 2,
    Multiply = 3,
    Divide = 4,
    Negate = 5,
    Return = 6,
}

impl OpCode {
    /// Decode a raw instruction byte. `None` for bytes outside the opcode
    /// table; the VM reports those as runtime errors rather than misexecuting.
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        match byte {
            0 => Some(OpCode::Constant),
            1 => Some(OpCode::Add),
            2 => Some(OpCode::Subtract),
            3 => Some(OpCode::Multiply),
            4 => Some(OpCode::Divide),
            5 => Some(OpCode::Negate),
            6 => Some(OpCode::Return),
            _ => None,
        }
    }

    /// Mnemonic used in disassembly listings.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Negate => "NEGATE",
            OpCode::Return => "RETURN",
        }
    }
}

/// A compiled chunk of bytecode.
///
/// `code` holds opcode and operand bytes; `lines[i]` is the source line that
/// produced `code[i]` (diagnostics only). `constants` is the append-only
/// literal pool; indices handed out by [`Chunk::add_constant`] stay stable
/// for the chunk's lifetime. Front ends append during compilation; the chunk
/// is read-only while a VM executes it.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction byte with its source line, keeping `code` and
    /// `lines` in lockstep.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append an opcode byte.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append a value to the constant pool, returning its stable index for
    /// embedding into an instruction operand.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Source line for the instruction byte at `offset`, if in range.
    pub fn line(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }
}
