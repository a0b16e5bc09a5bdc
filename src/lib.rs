//! brio - the execution core of a stack-based bytecode virtual machine.
//!
//! This library provides the chunk encoding (instruction bytes, line table,
//! constant pool), the tagged value model, the VM-owned heap-object registry,
//! a disassembler, and the fetch-decode-execute loop. A front end emits
//! bytecode through [`Chunk::write`] / [`Chunk::add_constant`] and hands the
//! chunk to [`VM::interpret`].

pub mod config;
pub mod vm;

// Re-export commonly used types
pub use config::{RuntimeConfig, TimingsFormat};
pub use vm::{Chunk, InterpretError, OpCode, VM, Value};
