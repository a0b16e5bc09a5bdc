mod chunk;
mod heap;
mod value;
mod vm;
pub mod debug;

pub use chunk::{Chunk, OpCode};
pub use heap::{Heap, HeapRef, Obj, StrObj};
pub use value::Value;
pub use vm::{InterpretError, VM};
