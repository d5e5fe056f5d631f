//! HostCallback trait, the host side of callback dispatch
//!
//! The engine never sees host closures. A template only carries a
//! [`CallbackRef`]; when the engine fires it, the dispatcher recovers
//! `(ctx_ref, callback_ref, arguments)` and hands them to the isolate's
//! [`HostCallback`], which owns every real piece of handler state.

use crate::context::BridgeContext;
use crate::value::{CallbackRef, CtxRef, ValueRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// ============================================================================
// Invocation
// ============================================================================

/// One engine-to-host callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Context the callback fired in (re-derived on every call)
    pub ctx_ref: CtxRef,
    /// Handler the template was bound to
    pub callback_ref: CallbackRef,
    /// `this` followed by the positional arguments
    pub args: Vec<ValueRef>,
    /// Property index, only for indexed-property interception
    pub index: Option<u32>,
}

impl Invocation {
    /// The receiver
    pub fn this(&self) -> ValueRef {
        self.args.first().copied().unwrap_or(ValueRef::NULL)
    }

    /// Positional arguments, without `this`
    pub fn arguments(&self) -> &[ValueRef] {
        self.args.get(1..).unwrap_or(&[])
    }
}

// ============================================================================
// HostReturn
// ============================================================================

/// Outcome of a host handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostReturn {
    /// Return this value to the script
    Value(ValueRef),
    /// Throw this value as the script-visible exception
    Throw(ValueRef),
    /// Return `undefined`
    Undefined,
}

impl HostReturn {
    /// Build from the two-slot C shape. The error slot wins when both are set.
    pub fn from_slots(value: Option<ValueRef>, error: Option<ValueRef>) -> Self {
        match (value, error) {
            (_, Some(err)) => HostReturn::Throw(err),
            (Some(val), None) => HostReturn::Value(val),
            (None, None) => HostReturn::Undefined,
        }
    }
}

/// Host side of callback dispatch.
///
/// Implementations are called on the isolate's owner thread with the isolate
/// lock held; they may call back into the engine through `cx`.
pub trait HostCallback: Send + Sync {
    /// Handle one invocation
    fn call(&self, cx: &dyn BridgeContext, invocation: &Invocation) -> HostReturn;
}

/// A handler that returns `undefined` for everything
pub struct NoopHostCallback;

impl HostCallback for NoopHostCallback {
    fn call(&self, _cx: &dyn BridgeContext, _invocation: &Invocation) -> HostReturn {
        HostReturn::Undefined
    }
}

// ============================================================================
// Handler Registry (callback_ref-based dispatch)
// ============================================================================

/// A registered host handler
pub type HandlerFn = Arc<dyn Fn(&dyn BridgeContext, &Invocation) -> HostReturn + Send + Sync>;

/// Registry of host handlers indexed by [`CallbackRef`].
///
/// Hands out monotonically increasing refs starting at 1. Invoking an
/// unregistered ref throws an `Error` into the script.
pub struct HandlerRegistry {
    handlers: RwLock<FxHashMap<CallbackRef, HandlerFn>>,
    next_ref: AtomicI32,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(FxHashMap::default()),
            next_ref: AtomicI32::new(1),
        }
    }

    /// Register a handler under a fresh ref
    pub fn register(
        &self,
        handler: impl Fn(&dyn BridgeContext, &Invocation) -> HostReturn + Send + Sync + 'static,
    ) -> CallbackRef {
        let callback_ref = CallbackRef(self.next_ref.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().insert(callback_ref, Arc::new(handler));
        callback_ref
    }

    /// Register a handler under a caller-chosen ref, replacing any previous one
    pub fn register_as(
        &self,
        callback_ref: CallbackRef,
        handler: impl Fn(&dyn BridgeContext, &Invocation) -> HostReturn + Send + Sync + 'static,
    ) {
        self.handlers.write().insert(callback_ref, Arc::new(handler));
    }

    /// Remove a handler
    pub fn unregister(&self, callback_ref: CallbackRef) -> bool {
        self.handlers.write().remove(&callback_ref).is_some()
    }

    /// Get a handler
    pub fn get(&self, callback_ref: CallbackRef) -> Option<HandlerFn> {
        self.handlers.read().get(&callback_ref).cloned()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCallback for HandlerRegistry {
    fn call(&self, cx: &dyn BridgeContext, invocation: &Invocation) -> HostReturn {
        // Clone out so the read lock is not held while the handler re-enters
        let handler = self.get(invocation.callback_ref);
        match handler {
            Some(handler) => handler(cx, invocation),
            None => {
                let message = format!(
                    "No host handler registered for callback {}",
                    invocation.callback_ref
                );
                match cx.new_error(&message) {
                    Ok(err) => HostReturn::Throw(err),
                    Err(_) => HostReturn::Undefined,
                }
            }
        }
    }
}

impl<T: HostCallback + ?Sized> HostCallback for Arc<T> {
    fn call(&self, cx: &dyn BridgeContext, invocation: &Invocation) -> HostReturn {
        (**self).call(cx, invocation)
    }
}
