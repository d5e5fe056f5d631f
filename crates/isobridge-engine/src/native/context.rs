//! Execution contexts

use super::value::{ObjectId, Value};

/// Handle to a context inside one isolate.
///
/// Handles are never reused within an isolate, so a disposed context's
/// handle simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context(pub(crate) u32);

impl Context {
    /// Raw handle value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Per-context state
#[derive(Debug)]
pub(crate) struct ContextData {
    pub global: ObjectId,
    pub embedder_data: Vec<Value>,
}

impl ContextData {
    pub fn new(global: ObjectId, slots: usize) -> Self {
        Self {
            global,
            embedder_data: vec![Value::Undefined; slots],
        }
    }

    pub fn for_each_root(&self, mut f: impl FnMut(ObjectId)) {
        f(self.global);
        self.embedder_data
            .iter()
            .filter_map(Value::as_object)
            .for_each(f);
    }
}
