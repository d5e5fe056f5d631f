//! Function and object templates
//!
//! Templates are isolate-scoped blueprints. A function template produces one
//! function object per context; an object template produces fresh instances
//! carrying internal fields, accessor properties and an optional indexed
//! interceptor.

use super::context::Context;
use super::isolate::Isolate;
use super::value::{ObjectId, PropertyKey, Value};
use isobridge_sdk::PropertyAttribute;
use rustc_hash::FxHashMap;

/// Index of a template in the isolate template table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub(crate) u32);

/// Template kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Function template
    Function,
    /// Object template
    Object,
}

impl TemplateKind {
    /// Name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Function => "function template",
            TemplateKind::Object => "object template",
        }
    }
}

// ============================================================================
// Callbacks
// ============================================================================

/// Native function callback
pub type FunctionCallback = fn(&mut FunctionCallbackInfo<'_>);

/// Native indexed-property getter
pub type IndexedGetterCallback = fn(u32, &mut PropertyCallbackInfo<'_>) -> Intercepted;

/// Whether an interceptor handled the access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercepted {
    /// Fall through to the object's own elements
    No,
    /// The interceptor produced the result
    Yes,
}

/// Arguments of a native function call
pub struct FunctionCallbackInfo<'a> {
    pub(crate) isolate: &'a Isolate,
    pub(crate) this: Value,
    pub(crate) holder: Value,
    pub(crate) args: Vec<Value>,
    pub(crate) data: Value,
    pub(crate) return_value: Value,
}

impl<'a> FunctionCallbackInfo<'a> {
    /// Isolate the call runs on
    pub fn isolate(&self) -> &'a Isolate {
        self.isolate
    }

    /// Receiver
    pub fn this(&self) -> Value {
        self.this.clone()
    }

    /// Object the function was invoked on
    pub fn holder(&self) -> Value {
        self.holder.clone()
    }

    /// Number of positional arguments
    pub fn length(&self) -> usize {
        self.args.len()
    }

    /// Positional argument, `undefined` past the end
    pub fn get(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Undefined)
    }

    /// All positional arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Callback data bound at template creation
    pub fn data(&self) -> Value {
        self.data.clone()
    }

    /// Set the call's result
    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = value;
    }

    /// Current result
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }
}

/// Arguments of an intercepted property access
pub struct PropertyCallbackInfo<'a> {
    pub(crate) isolate: &'a Isolate,
    pub(crate) this: Value,
    pub(crate) holder: Value,
    pub(crate) data: Value,
    pub(crate) return_value: Value,
}

impl<'a> PropertyCallbackInfo<'a> {
    /// Isolate the access runs on
    pub fn isolate(&self) -> &'a Isolate {
        self.isolate
    }

    /// Receiver
    pub fn this(&self) -> Value {
        self.this.clone()
    }

    /// Object carrying the interceptor
    pub fn holder(&self) -> Value {
        self.holder.clone()
    }

    /// Handler data bound at configuration time
    pub fn data(&self) -> Value {
        self.data.clone()
    }

    /// Set the property value
    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = value;
    }

    /// Current result
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Interceptor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyHandlerFlags(u8);

impl PropertyHandlerFlags {
    /// No flags
    pub const NONE: PropertyHandlerFlags = PropertyHandlerFlags(0);
    /// The handler does not mutate engine state
    pub const HAS_NO_SIDE_EFFECT: PropertyHandlerFlags = PropertyHandlerFlags(1);

    /// Check a flag
    pub fn contains(self, other: PropertyHandlerFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Indexed interceptor. Getter only: writes land in the object's elements.
#[derive(Clone)]
pub struct IndexedPropertyHandlerConfiguration {
    /// Getter callback
    pub getter: IndexedGetterCallback,
    /// Data handed to the getter
    pub data: Value,
    /// Handler flags
    pub flags: PropertyHandlerFlags,
}

impl std::fmt::Debug for IndexedPropertyHandlerConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedPropertyHandlerConfiguration")
            .field("data", &self.data)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Accessor property installed on every instance
#[derive(Debug, Clone)]
pub(crate) struct AccessorSpec {
    pub key: PropertyKey,
    pub getter: Option<TemplateId>,
    pub setter: Option<TemplateId>,
    pub attributes: PropertyAttribute,
}

/// Template table entry
pub(crate) enum TemplateData {
    Function {
        callback: Option<FunctionCallback>,
        data: Value,
        /// One function per context
        instances: FxHashMap<Context, ObjectId>,
    },
    Object {
        internal_field_count: usize,
        accessors: Vec<AccessorSpec>,
        indexed: Option<IndexedPropertyHandlerConfiguration>,
    },
}

impl TemplateData {
    pub fn kind(&self) -> TemplateKind {
        match self {
            TemplateData::Function { .. } => TemplateKind::Function,
            TemplateData::Object { .. } => TemplateKind::Object,
        }
    }

    /// Objects this template keeps alive
    pub fn for_each_root(&self, mut f: impl FnMut(ObjectId)) {
        match self {
            TemplateData::Function { data, instances, .. } => {
                data.as_object().into_iter().for_each(&mut f);
                instances.values().copied().for_each(f);
            }
            TemplateData::Object { indexed, .. } => {
                if let Some(id) = indexed.as_ref().and_then(|config| config.data.as_object()) {
                    f(id);
                }
            }
        }
    }
}
