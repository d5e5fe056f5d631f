//! Embedded script engine
//!
//! A compact engine exposing the embedding surface the bridge is written
//! against: isolates with a re-entrant lock, contexts with embedder data,
//! handle scopes, persistent handles, function/object templates with native
//! callbacks and an indexed interceptor, a pending-exception model with
//! `TryCatch`, and an explicit mark-sweep collector.
//!
//! There is no parser or interpreter: every function is native.

pub mod context;
pub mod heap;
pub mod isolate;
pub mod options;
pub mod scope;
pub mod template;
pub mod value;

pub use context::Context;
pub use heap::{ErrorKind, HeapStats};
pub use isolate::{Isolate, Locker};
pub use options::{IsolateId, IsolateOptions, ResourceLimits};
pub use scope::{ContextScope, Global, HandleScope, TryCatch};
pub use template::{
    FunctionCallback, FunctionCallbackInfo, IndexedGetterCallback,
    IndexedPropertyHandlerConfiguration, Intercepted, PropertyCallbackInfo, PropertyHandlerFlags,
    TemplateId, TemplateKind,
};
pub use value::{ObjectId, PropertyKey, SymbolId, Value};
