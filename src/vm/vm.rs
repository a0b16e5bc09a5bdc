use std::fmt;
use std::io::{self, Write};

use crate::config::RuntimeConfig;
use crate::vm::{Chunk, Heap, OpCode, Value, debug};

/// Error type for [`VM::interpret`].
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretError {
    /// Front-end failure. Reserved for compilers driving this VM; nothing in
    /// the execution core itself produces it.
    Compile(String),
    /// Execution failure: the run halts and the stack contents are not to be
    /// trusted. Carries the offset of the offending instruction and the
    /// source line that produced it.
    Runtime {
        message: String,
        offset: usize,
        line: u32,
    },
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Compile(message) => write!(f, "compile error: {}", message),
            InterpretError::Runtime {
                message,
                offset,
                line,
            } => write!(
                f,
                "runtime error: {} [offset {:04}, line {}]",
                message, offset, line
            ),
        }
    }
}

impl std::error::Error for InterpretError {}

/// The brio virtual machine.
///
/// Owns the operand stack, the heap-object registry, and the output stream
/// that `Return` prints to. Single-threaded: nothing here blocks or yields,
/// and a bound chunk must not be mutated while [`VM::interpret`] runs.
pub struct VM {
    stack: Vec<Value>,
    heap: Heap,
    stack_limit: usize,
    trace_execution: bool,
    output: Box<dyn Write>,
}

impl VM {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a VM with a custom output stream.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self::with_config_and_output(RuntimeConfig::default(), output)
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_config_and_output(config, Box::new(io::stdout()))
    }

    pub fn with_config_and_output(config: RuntimeConfig, output: Box<dyn Write>) -> Self {
        Self {
            stack: Vec::with_capacity(config.stack_limit.min(256)),
            heap: Heap::new(),
            stack_limit: config.stack_limit,
            trace_execution: config.trace_execution,
            output,
        }
    }

    /// Get immutable reference to the heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Allocate a string in this VM's heap, returning the referencing value.
    /// Front ends use this to build string constants for a chunk.
    pub fn alloc_string(&mut self, chars: impl Into<String>) -> Value {
        Value::Obj(self.heap.alloc_string(chars.into()))
    }

    /// Execute a chunk to a terminal state.
    ///
    /// Resets the operand stack and instruction pointer, then runs the
    /// fetch-decode-execute loop until `Return` (prints the final value and
    /// succeeds) or a runtime error.
    pub fn interpret(&mut self, chunk: &Chunk) -> Result<(), InterpretError> {
        self.stack.clear();
        self.run(chunk)
    }

    /// Tear down the heap-object registry in a single pass.
    ///
    /// Call once when the host is done with this VM. Dropping the VM releases
    /// the same storage structurally; `shutdown` exists so hosts (and tests)
    /// can observe the pass through the heap's counters.
    pub fn shutdown(&mut self) {
        self.heap.free_all();
    }

    fn run(&mut self, chunk: &Chunk) -> Result<(), InterpretError> {
        let mut ip = 0;
        loop {
            if self.trace_execution {
                self.trace(chunk, ip);
            }

            let offset = ip;
            let line = chunk.line(offset).unwrap_or(0);
            let at = |message: String| InterpretError::Runtime {
                message,
                offset,
                line,
            };

            let byte = *chunk
                .code
                .get(ip)
                .ok_or_else(|| at("ran off the end of the chunk".to_string()))?;
            ip += 1;

            let op = OpCode::from_byte(byte)
                .ok_or_else(|| at(format!("unknown opcode {:#04x}", byte)))?;

            match op {
                OpCode::Constant => {
                    let index = *chunk
                        .code
                        .get(ip)
                        .ok_or_else(|| at("truncated constant operand".to_string()))?
                        as usize;
                    ip += 1;
                    let value = *chunk.constants.get(index).ok_or_else(|| {
                        at(format!(
                            "constant index {} out of range (pool has {})",
                            index,
                            chunk.constants.len()
                        ))
                    })?;
                    self.push(value).map_err(&at)?;
                }
                OpCode::Add => self.binary_op(|lhs, rhs| lhs + rhs).map_err(&at)?,
                OpCode::Subtract => self.binary_op(|lhs, rhs| lhs - rhs).map_err(&at)?,
                OpCode::Multiply => self.binary_op(|lhs, rhs| lhs * rhs).map_err(&at)?,
                OpCode::Divide => self.binary_op(|lhs, rhs| lhs / rhs).map_err(&at)?,
                OpCode::Negate => {
                    let v = self.pop_number().map_err(&at)?;
                    self.push(Value::Number(-v)).map_err(&at)?;
                }
                OpCode::Return => {
                    let value = self.pop().map_err(&at)?;
                    self.print_value(value)
                        .map_err(|e| at(format!("write failed: {}", e)))?;
                    return Ok(());
                }
            }
        }
    }

    /// Apply a binary numeric operator. The right operand pops first (it was
    /// pushed last); the first-pushed value is the left operand, so
    /// `10, 3, Subtract` computes `10 - 3`.
    fn binary_op(&mut self, op: fn(f64, f64) -> f64) -> Result<(), String> {
        let rhs = self.pop_number()?;
        let lhs = self.pop_number()?;
        self.push(Value::Number(op(lhs, rhs)))
    }

    fn push(&mut self, value: Value) -> Result<(), String> {
        if self.stack.len() >= self.stack_limit {
            return Err(format!("stack overflow (limit {})", self.stack_limit));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn pop_number(&mut self) -> Result<f64, String> {
        let value = self.pop()?;
        value
            .as_number()
            .ok_or_else(|| format!("operand must be a number, got {}", value.type_name()))
    }

    /// Print a final value to the output stream, resolving heap references
    /// through the registry.
    fn print_value(&mut self, value: Value) -> io::Result<()> {
        match value {
            Value::Obj(r) => match self.heap.get(r) {
                Some(obj) => writeln!(self.output, "{}", obj),
                None => writeln!(self.output, "{}", value),
            },
            Value::Number(_) => writeln!(self.output, "{}", value),
        }
    }

    /// Per-instruction execution trace: current stack, then the instruction
    /// about to run, in disassembly format.
    fn trace(&self, chunk: &Chunk, ip: usize) {
        let mut rendered = String::new();
        for value in &self.stack {
            rendered.push_str(&format!("[ {} ]", value));
        }
        eprintln!("[VM] stack: {}", rendered);
        if ip < chunk.code.len() {
            let mut text = String::new();
            debug::disassemble_instruction(chunk, ip, &mut text);
            eprint!("[VM] {}", text);
        }
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Cloneable in-memory output sink for capturing what `Return` prints.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("utf-8 output")
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_vm() -> (VM, SharedBuf) {
        let buf = SharedBuf::default();
        let vm = VM::with_output(Box::new(buf.clone()));
        (vm, buf)
    }

    fn constant(chunk: &mut Chunk, value: f64, line: u32) {
        let idx = chunk.add_constant(Value::Number(value));
        chunk.write_op(OpCode::Constant, line);
        chunk.write(idx as u8, line);
    }

    #[test]
    fn test_negate() {
        let mut chunk = Chunk::new();
        constant(&mut chunk, 2.5, 1);
        chunk.write_op(OpCode::Negate, 1);
        chunk.write_op(OpCode::Return, 1);

        let (mut vm, out) = capture_vm();
        vm.interpret(&chunk).unwrap();
        assert_eq!(out.contents(), "-2.5\n");
    }

    #[test]
    fn test_subtract_pop_order() {
        // First-pushed is the left operand: 10 - 3, not 3 - 10.
        let mut chunk = Chunk::new();
        constant(&mut chunk, 10.0, 1);
        constant(&mut chunk, 3.0, 1);
        chunk.write_op(OpCode::Subtract, 1);
        chunk.write_op(OpCode::Return, 1);

        let (mut vm, out) = capture_vm();
        vm.interpret(&chunk).unwrap();
        assert_eq!(out.contents(), "7\n");
    }

    #[test]
    fn test_underflow_reports_offset_and_line() {
        let mut chunk = Chunk::new();
        constant(&mut chunk, 1.0, 3);
        chunk.write_op(OpCode::Add, 4);
        chunk.write_op(OpCode::Return, 5);

        let (mut vm, _) = capture_vm();
        let err = vm.interpret(&chunk).unwrap_err();
        match err {
            InterpretError::Runtime {
                message,
                offset,
                line,
            } => {
                assert_eq!(message, "stack underflow");
                assert_eq!(offset, 2);
                assert_eq!(line, 4);
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_overflow() {
        let config = RuntimeConfig {
            stack_limit: 4,
            ..Default::default()
        };
        let mut chunk = Chunk::new();
        for _ in 0..5 {
            constant(&mut chunk, 1.0, 1);
        }
        chunk.write_op(OpCode::Return, 1);

        let mut vm = VM::with_config_and_output(config, Box::new(io::sink()));
        let err = vm.interpret(&chunk).unwrap_err();
        assert!(matches!(err, InterpretError::Runtime { ref message, .. }
            if message.starts_with("stack overflow")));
    }

    #[test]
    fn test_invalid_constant_index_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(5, 1);
        chunk.write_op(OpCode::Return, 1);

        let (mut vm, _) = capture_vm();
        let err = vm.interpret(&chunk).unwrap_err();
        assert!(matches!(err, InterpretError::Runtime { ref message, .. }
            if message.contains("constant index 5 out of range")));
    }

    #[test]
    fn test_unknown_opcode_is_runtime_error() {
        let mut chunk = Chunk::new();
        chunk.write(0xee, 9);

        let (mut vm, _) = capture_vm();
        let err = vm.interpret(&chunk).unwrap_err();
        assert!(matches!(err, InterpretError::Runtime { line: 9, ref message, .. }
            if message.contains("unknown opcode")));
    }

    #[test]
    fn test_missing_return_runs_off_the_end() {
        let mut chunk = Chunk::new();
        constant(&mut chunk, 1.0, 1);

        let (mut vm, _) = capture_vm();
        let err = vm.interpret(&chunk).unwrap_err();
        assert!(matches!(err, InterpretError::Runtime { ref message, .. }
            if message.contains("ran off the end")));
    }

    #[test]
    fn test_arithmetic_on_object_is_type_error() {
        let (mut vm, _) = capture_vm();
        let s = vm.alloc_string("abc");

        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(s);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(idx as u8, 1);
        chunk.write_op(OpCode::Negate, 1);
        chunk.write_op(OpCode::Return, 1);

        let err = vm.interpret(&chunk).unwrap_err();
        assert!(matches!(err, InterpretError::Runtime { ref message, .. }
            if message.contains("must be a number")));
    }

    #[test]
    fn test_return_prints_string_object() {
        let (mut vm, out) = capture_vm();
        let s = vm.alloc_string("hello");

        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(s);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(idx as u8, 1);
        chunk.write_op(OpCode::Return, 1);

        vm.interpret(&chunk).unwrap();
        assert_eq!(out.contents(), "hello\n");
    }

    #[test]
    fn test_shutdown_tears_down_heap_once() {
        let (mut vm, _) = capture_vm();
        vm.alloc_string("a");
        vm.alloc_string("b");
        assert_eq!(vm.heap().allocated(), 2);

        vm.shutdown();
        assert_eq!(vm.heap().freed(), 2);
        assert_eq!(vm.heap().live_count(), 0);
    }

    #[test]
    fn test_error_display() {
        let err = InterpretError::Runtime {
            message: "stack underflow".to_string(),
            offset: 2,
            line: 4,
        };
        assert_eq!(
            err.to_string(),
            "runtime error: stack underflow [offset 0002, line 4]"
        );
        assert_eq!(
            InterpretError::Compile("bad token".to_string()).to_string(),
            "compile error: bad token"
        );
    }
}
