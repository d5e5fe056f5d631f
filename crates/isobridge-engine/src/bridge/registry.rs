//! Context registry
//!
//! Maps `ctx_ref -> context state` for one isolate, and within each context
//! `tracking id -> ValueWrapper`. Every method takes a [`Locker`] as proof
//! that the caller holds the isolate lock. The registry's own mutexes are
//! never held across an engine call, and wrappers are dropped only after
//! they have been removed from their table and the table lock is released.

use super::handle::ValueWrapper;
use crate::native::{Context, Locker, Value};
use isobridge_sdk::{BridgeError, BridgeResult, CtxRef, TrackingId, ValueRef, CTX_REF_SLOT};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// ============================================================================
// Value Table
// ============================================================================

/// Per-context table of tracked values
#[derive(Debug, Default)]
struct ValueTable {
    entries: FxHashMap<TrackingId, ValueWrapper>,
    next_id: u64,
    closed: bool,
}

/// Registry entry for one context
#[derive(Debug)]
pub struct TrackedContext {
    ctx_ref: CtxRef,
    native: Context,
    values: Mutex<ValueTable>,
}

impl TrackedContext {
    fn new(ctx_ref: CtxRef, native: Context) -> Self {
        Self {
            ctx_ref,
            native,
            values: Mutex::new(ValueTable::default()),
        }
    }

    /// Boundary reference
    pub fn ctx_ref(&self) -> CtxRef {
        self.ctx_ref
    }

    /// Engine context
    pub fn native(&self) -> Context {
        self.native
    }

    /// Number of live tracked values
    pub fn tracked_count(&self) -> usize {
        self.values.lock().entries.len()
    }

    /// Whether the context was torn down
    pub fn is_closed(&self) -> bool {
        self.values.lock().closed
    }
}

// ============================================================================
// Context Registry
// ============================================================================

/// Per-isolate registry of bridged contexts.
///
/// User references start at 1 and are never reused; 0 is reserved for the
/// isolate's internal context.
#[derive(Debug)]
pub struct ContextRegistry {
    contexts: Mutex<FxHashMap<CtxRef, Arc<TrackedContext>>>,
    next_ref: AtomicI32,
}

impl ContextRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(FxHashMap::default()),
            next_ref: AtomicI32::new(1),
        }
    }

    /// Register a context under a fresh reference and stamp the reference
    /// into its embedder data
    pub fn register(&self, locker: &Locker<'_>, native: Context) -> BridgeResult<CtxRef> {
        let ctx_ref = CtxRef(self.next_ref.fetch_add(1, Ordering::Relaxed));
        self.register_as(locker, ctx_ref, native)?;
        Ok(ctx_ref)
    }

    /// Register a context under a caller-chosen reference
    pub(crate) fn register_as(
        &self,
        locker: &Locker<'_>,
        ctx_ref: CtxRef,
        native: Context,
    ) -> BridgeResult<()> {
        if !locker.set_embedder_data(native, CTX_REF_SLOT, Value::from(ctx_ref.as_i32())) {
            return Err(BridgeError::Resolution(format!(
                "context has no embedder slot {}",
                CTX_REF_SLOT
            )));
        }
        self.contexts
            .lock()
            .insert(ctx_ref, Arc::new(TrackedContext::new(ctx_ref, native)));
        tracing::debug!(%ctx_ref, context = native.as_u32(), "context registered");
        Ok(())
    }

    /// Look up a context
    pub fn resolve(&self, _locker: &Locker<'_>, ctx_ref: CtxRef) -> BridgeResult<Arc<TrackedContext>> {
        self.contexts
            .lock()
            .get(&ctx_ref)
            .cloned()
            .ok_or(BridgeError::UnknownContext(ctx_ref))
    }

    /// Capture `value` and register it in `context`
    pub fn track(
        &self,
        locker: &Locker<'_>,
        context: &TrackedContext,
        value: Value,
    ) -> BridgeResult<ValueRef> {
        let wrapper = ValueWrapper::new(locker, context.ctx_ref, value);
        self.track_wrapper(context, wrapper)
    }

    /// Register an existing wrapper in `context`
    pub fn track_wrapper(
        &self,
        context: &TrackedContext,
        mut wrapper: ValueWrapper,
    ) -> BridgeResult<ValueRef> {
        let mut table = context.values.lock();
        if table.closed {
            drop(table);
            tracing::warn!(ctx_ref = %context.ctx_ref, "track into a torn-down context");
            return Err(BridgeError::UnknownContext(context.ctx_ref));
        }
        table.next_id += 1;
        let id = TrackingId(table.next_id);
        wrapper.set_id(id);
        table.entries.insert(id, wrapper);
        Ok(ValueRef::new(context.ctx_ref, id))
    }

    /// Materialize a tracked value in the caller's handle scope
    pub fn resolve_value(&self, locker: &Locker<'_>, value_ref: ValueRef) -> BridgeResult<Value> {
        let context = self.resolve(locker, value_ref.ctx_ref)?;
        let table = context.values.lock();
        table
            .entries
            .get(&value_ref.id)
            .and_then(|wrapper| wrapper.local(locker))
            .ok_or(BridgeError::ValueReleased(value_ref))
    }

    /// Release a tracked value. Idempotent; `false` when nothing was tracked.
    pub fn release(&self, locker: &Locker<'_>, value_ref: ValueRef) -> bool {
        let Ok(context) = self.resolve(locker, value_ref.ctx_ref) else {
            return false;
        };
        let removed = context.values.lock().entries.remove(&value_ref.id);
        match removed {
            Some(mut wrapper) => {
                wrapper.release();
                tracing::trace!(value = %value_ref, "value released");
                true
            }
            None => false,
        }
    }

    /// Release every value of a context and drop its mapping. Returns the
    /// engine context so the caller can dispose of it.
    pub fn teardown(&self, locker: &Locker<'_>, ctx_ref: CtxRef) -> BridgeResult<Context> {
        let context = self
            .contexts
            .lock()
            .remove(&ctx_ref)
            .ok_or(BridgeError::UnknownContext(ctx_ref))?;

        let released: Vec<ValueWrapper> = {
            let mut table = context.values.lock();
            table.closed = true;
            table.entries.drain().map(|(_, wrapper)| wrapper).collect()
        };
        let count = released.len();
        drop(released);

        locker.set_embedder_data(context.native, CTX_REF_SLOT, Value::Undefined);
        tracing::debug!(%ctx_ref, released = count, "context torn down");
        Ok(context.native)
    }

    /// Number of tracked values in a context
    pub fn tracked_count(&self, ctx_ref: CtxRef) -> Option<usize> {
        let context = self.contexts.lock().get(&ctx_ref).cloned()?;
        Some(context.tracked_count())
    }

    /// Number of registered contexts, the internal one included
    pub fn context_count(&self) -> usize {
        self.contexts.lock().len()
    }

    /// All registered references, ascending
    pub fn ctx_refs(&self) -> Vec<CtxRef> {
        let mut refs: Vec<CtxRef> = self.contexts.lock().keys().copied().collect();
        refs.sort();
        refs
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}
