//! isobridge SDK - plain-data boundary types for driving an embedded isolate
//!
//! This crate holds everything a host needs to talk to the bridge without
//! depending on the engine: the integer identities that cross the boundary
//! ([`CtxRef`], [`CallbackRef`], [`ValueRef`]), the structured exception
//! description ([`ExceptionError`]), and the traits a host implements to
//! receive callbacks ([`HostCallback`]) and uses to act inside them
//! ([`BridgeContext`]).
//!
//! # Example
//!
//! ```ignore
//! use isobridge_sdk::{HandlerRegistry, HostReturn};
//!
//! let handlers = HandlerRegistry::new();
//! let greet = handlers.register(|cx, _inv| match cx.new_string("hello") {
//!     Ok(v) => HostReturn::Value(v),
//!     Err(_) => HostReturn::Undefined,
//! });
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod handler;
pub mod types;
pub mod value;

pub use context::BridgeContext;
pub use error::{BridgeError, BridgeResult};
pub use handler::{HandlerFn, HandlerRegistry, HostCallback, HostReturn, Invocation, NoopHostCallback};
pub use types::{ExceptionError, PropertyAttribute, SymbolIndex};
pub use value::{CallbackRef, CtxRef, TrackingId, ValueRef};

/// Embedder-data slot that carries a context's [`CtxRef`]
pub const CTX_REF_SLOT: usize = 1;

/// Index passed to the C host callback for function calls
pub const NO_INDEX: u32 = u32::MAX;
