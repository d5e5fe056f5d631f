//! isobridge engine
//!
//! This crate lets a host drive an embedded script isolate through
//! plain-data references:
//! - **Native**: the embedded engine (isolates, contexts, templates, scopes, GC)
//! - **Bridge**: context registry, handle wrappers, template builder and
//!   callback dispatcher (`bridge` module)
//! - **Inspector**: console message forwarding (`inspector` module)
//! - **FFI**: the C ABI (`ffi` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use isobridge_engine::HostIsolate;
//! use isobridge_sdk::{BridgeContext, CallbackRef, HandlerRegistry, HostReturn};
//!
//! let handlers = HandlerRegistry::new();
//! let greet = handlers.register(|cx, _inv| match cx.new_string("hello") {
//!     Ok(v) => HostReturn::Value(v),
//!     Err(_) => HostReturn::Undefined,
//! });
//!
//! let host = HostIsolate::with_host(handlers);
//! let ctx = host.create_context()?;
//! let template = host.new_function_template(greet);
//! let function = host.function_template_get_function(&template, ctx)?;
//! let result = host.scope(ctx).call(function, ValueRef::NULL, &[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

// ============================================================================
// Core Modules
// ============================================================================

/// Embedded engine: isolates, contexts, templates, scopes and GC
pub mod native;

/// Host bridge: registry, handle wrappers, templates and dispatch
pub mod bridge;

/// Inspector and console message forwarding
pub mod inspector;

/// C bindings
pub mod ffi;

/// Engine error types
pub mod error;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{BridgeScope, ContextRegistry, HostIsolate, Template, TrackedContext, ValueWrapper};
pub use error::{EngineError, EngineResult};
pub use inspector::{
    ClientRegistry, ConsoleApiMessage, ConsoleApiMessageHandler, Inspector, InspectorClient,
    MessageErrorLevel, Registry,
};
pub use native::{HeapStats, Isolate, IsolateId, IsolateOptions, ResourceLimits};

pub use isobridge_sdk::{
    BridgeContext, BridgeError, BridgeResult, CallbackRef, CtxRef, ExceptionError, HandlerRegistry,
    HostCallback, HostReturn, Invocation, PropertyAttribute, SymbolIndex, ValueRef,
};
