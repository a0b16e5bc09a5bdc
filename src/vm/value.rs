use std::fmt;

use super::heap::HeapRef;

/// A tagged runtime value.
///
/// Values are small and copied on every stack push and pop:
/// - Number: 64-bit IEEE 754 double
/// - Obj: non-owning reference to a heap object (strings for now)
///
/// The tag fully determines the payload; every consumer dispatches with an
/// exhaustive `match`, so adding a variant is a compile-time event.
#[derive(Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Obj(HeapRef),
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_obj(&self) -> bool {
        matches!(self, Value::Obj(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<HeapRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Get the type name of this value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Obj(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Obj(r) => write!(f, "Obj({})", r.index),
        }
    }
}

/// Numbers print with Rust's shortest round-trip `f64` formatting, so
/// integral results print without a fractional part (`7`, not `7.0`).
/// Object payloads live in the heap; a bare `Value` only prints the
/// handle (the VM resolves the object when it prints a final result).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Obj(r) => write!(f, "<obj#{}>", r.index),
        }
    }
}
