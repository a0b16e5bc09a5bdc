//! Heap objects and the VM-owned object registry.
//!
//! Reference-type values live here, not on the operand stack. The registry
//! owns every object from allocation until [`Heap::free_all`] runs at
//! shutdown; `Value::Obj` holds a non-owning [`HeapRef`] into it. Nothing is
//! freed mid-run (there is no collector yet), so handles stay valid for the
//! whole interpretation.

use std::fmt;

/// Non-owning handle to an object in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRef {
    /// Index into the heap's object arena
    pub index: usize,
}

/// An immutable character sequence.
///
/// Length is explicit and authoritative; there is no terminator convention.
#[derive(Debug, Clone, PartialEq)]
pub struct StrObj {
    chars: String,
}

impl StrObj {
    pub fn new(chars: String) -> Self {
        Self { chars }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// A heap-allocated object.
///
/// Closed sum type: teardown and printing dispatch on it exhaustively, so a
/// new object kind cannot be added without handling its owned buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum Obj {
    Str(StrObj),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::Str(_) => "string",
        }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obj::Str(s) => write!(f, "{}", s.as_str()),
        }
    }
}

/// The object registry owned by a single VM.
///
/// An index-stable arena: allocation appends, handles are plain indices, and
/// the only release point is the single [`Heap::free_all`] pass at shutdown
/// (or dropping the heap itself). Allocation and free counters are kept so
/// tests and `--heap-stats` can verify every object is torn down once.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Option<Obj>>,
    allocated: usize,
    freed: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a string object, returning its handle.
    pub fn alloc_string(&mut self, chars: String) -> HeapRef {
        self.alloc(Obj::Str(StrObj::new(chars)))
    }

    /// Register an object, returning its handle. Indices are stable for the
    /// heap's lifetime.
    pub fn alloc(&mut self, obj: Obj) -> HeapRef {
        let index = self.objects.len();
        self.objects.push(Some(obj));
        self.allocated += 1;
        HeapRef { index }
    }

    /// Look up an object by handle. `None` for a stale or foreign handle.
    pub fn get(&self, r: HeapRef) -> Option<&Obj> {
        self.objects.get(r.index)?.as_ref()
    }

    /// Number of objects currently live in the registry.
    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Total objects allocated over the heap's lifetime.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Total objects released by [`Heap::free_all`].
    pub fn freed(&self) -> usize {
        self.freed
    }

    /// Release every live object in one pass.
    ///
    /// Each object is visited exactly once; per-variant owned buffers drop
    /// with the variant. Idempotent: a second pass finds nothing live.
    pub fn free_all(&mut self) {
        for slot in &mut self.objects {
            if let Some(obj) = slot.take() {
                match obj {
                    Obj::Str(_) => {}
                }
                self.freed += 1;
            }
        }
        self.objects.clear();
    }
}
