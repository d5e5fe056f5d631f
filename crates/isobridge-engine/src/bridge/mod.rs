//! Host bridge
//!
//! Lets a host drive an isolate through plain-data references:
//!
//! - [`ContextRegistry`] maps `ctx_ref` to contexts and tracking ids to
//!   [`ValueWrapper`]s
//! - the template builder ([`HostIsolate::new_function_template`] and
//!   friends) binds templates to `callback_ref`s
//! - the dispatcher routes engine callbacks back to the host's
//!   [`HostCallback`]
//! - [`BridgeScope`] performs value operations inside one context
//!
//! ```ignore
//! use isobridge_engine::bridge::HostIsolate;
//! use isobridge_sdk::{BridgeContext, CallbackRef, HandlerRegistry, HostReturn};
//!
//! let handlers = HandlerRegistry::new();
//! handlers.register_as(CallbackRef(7), |cx, inv| {
//!     HostReturn::Value(cx.new_string("ok").unwrap())
//! });
//! let host = HostIsolate::with_host(handlers);
//! let ctx = host.create_context()?;
//! let template = host.new_object_template();
//! host.set_indexed_handler(&template, CallbackRef(7))?;
//! let object = host.instantiate(&template, ctx)?;
//! let value = host.scope(ctx).get_index(object, 5)?;
//! ```

pub mod dispatch;
pub mod handle;
pub mod registry;
pub mod result;
pub mod scope;
pub mod symbol;
pub mod template;

pub use handle::{Template, ValueWrapper};
pub use registry::{ContextRegistry, TrackedContext};
pub use scope::BridgeScope;

use crate::native::{HandleScope, HeapStats, Isolate, IsolateId, IsolateOptions};
use isobridge_sdk::{BridgeError, BridgeResult, CtxRef, HostCallback, ValueRef, CTX_REF_SLOT};
use std::sync::Arc;

/// Bridge state reachable from native callbacks through an isolate slot.
/// Holds no strong reference to the isolate.
pub(crate) struct Shared {
    pub(crate) registry: ContextRegistry,
    pub(crate) host: Box<dyn HostCallback>,
}

/// An isolate driven by a host
pub struct HostIsolate {
    isolate: Isolate,
    shared: Arc<Shared>,
}

impl HostIsolate {
    /// Create an isolate whose callbacks go to `host`
    pub fn new(mut options: IsolateOptions, host: impl HostCallback + 'static) -> Self {
        options.embedder_slots = options.embedder_slots.max(CTX_REF_SLOT + 1);
        let isolate = Isolate::new(options);
        let shared = Arc::new(Shared {
            registry: ContextRegistry::new(),
            host: Box::new(host),
        });
        isolate.set_slot(shared.clone());

        {
            let scope = HandleScope::new(&isolate);
            let internal = scope.new_context();
            // Slot count was clamped above, so stamping cannot fail
            if let Err(err) = shared.registry.register_as(&scope, CtxRef::INTERNAL, internal) {
                tracing::error!(error = %err, "failed to register internal context");
            }
        }

        Self { isolate, shared }
    }

    /// Create an isolate with default options
    pub fn with_host(host: impl HostCallback + 'static) -> Self {
        Self::new(IsolateOptions::default(), host)
    }

    /// The engine isolate
    pub fn isolate(&self) -> &Isolate {
        &self.isolate
    }

    /// Isolate id
    pub fn id(&self) -> IsolateId {
        self.isolate.id()
    }

    /// Create and register a context
    pub fn create_context(&self) -> BridgeResult<CtxRef> {
        let scope = HandleScope::new(&self.isolate);
        let native = scope.new_context();
        match self.shared.registry.register(&scope, native) {
            Ok(ctx_ref) => Ok(ctx_ref),
            Err(err) => {
                scope.dispose_context(native);
                Err(err)
            }
        }
    }

    /// Tear down a context: release every tracked value, then discard the
    /// engine context. The internal context cannot be disposed this way.
    pub fn dispose_context(&self, ctx_ref: CtxRef) -> BridgeResult<()> {
        if ctx_ref.is_internal() {
            tracing::warn!("refusing to dispose the internal context");
            return Err(BridgeError::UnknownContext(ctx_ref));
        }
        self.teardown(ctx_ref)
    }

    fn teardown(&self, ctx_ref: CtxRef) -> BridgeResult<()> {
        let scope = HandleScope::new(&self.isolate);
        let native = self.shared.registry.teardown(&scope, ctx_ref)?;
        scope.dispose_context(native);
        Ok(())
    }

    /// Engine access bound to `ctx_ref`
    pub fn scope(&self, ctx_ref: CtxRef) -> BridgeScope<'_> {
        BridgeScope::new(&self.isolate, &self.shared, ctx_ref)
    }

    /// Release a tracked value; no-op if already released
    pub fn release(&self, value: ValueRef) {
        let scope = HandleScope::new(&self.isolate);
        self.shared.registry.release(&scope, value);
    }

    /// Number of values tracked in a context
    pub fn tracked_count(&self, ctx_ref: CtxRef) -> Option<usize> {
        self.shared.registry.tracked_count(ctx_ref)
    }

    /// Number of live user contexts
    pub fn context_count(&self) -> usize {
        self.shared
            .registry
            .ctx_refs()
            .into_iter()
            .filter(|ctx_ref| !ctx_ref.is_internal())
            .count()
    }

    /// Run a full collection. Returns the number of objects freed.
    pub fn collect_garbage(&self) -> usize {
        self.isolate.lock().collect_garbage()
    }

    /// Heap statistics
    pub fn heap_stats(&self) -> HeapStats {
        self.isolate.lock().heap_stats()
    }

    /// Tear down every context and release the isolate
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for HostIsolate {
    fn drop(&mut self) {
        // User contexts first; the internal context holds isolate-scoped values
        let mut refs = self.shared.registry.ctx_refs();
        refs.sort_by_key(|ctx_ref| ctx_ref.is_internal());
        for ctx_ref in refs {
            if let Err(err) = self.teardown(ctx_ref) {
                tracing::warn!(%ctx_ref, error = %err, "teardown during dispose failed");
            }
        }
        self.isolate.remove_slot::<Shared>();
        tracing::debug!(isolate = self.isolate.id().as_u64(), "isolate disposed");
    }
}
