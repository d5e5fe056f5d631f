//! Handle wrappers
//!
//! A [`ValueWrapper`] owns exactly one persistent handle. It is not `Clone`:
//! the only owner is the tracking-table slot it was registered into (or the
//! call stack that is about to register it).

use crate::native::{Global, IsolateId, Locker, TemplateId, TemplateKind, Value};
use isobridge_sdk::{BridgeError, BridgeResult, CtxRef, TrackingId, ValueRef};

/// Persistent handle to one engine value, tagged with its provenance
#[derive(Debug)]
pub struct ValueWrapper {
    id: TrackingId,
    ctx_ref: CtxRef,
    isolate: IsolateId,
    global: Global,
}

impl ValueWrapper {
    /// Capture `value` persistently. The id stays 0 until registration.
    pub fn new(locker: &Locker<'_>, ctx_ref: CtxRef, value: Value) -> Self {
        Self {
            id: TrackingId::NONE,
            ctx_ref,
            isolate: locker.isolate().id(),
            global: Global::new(locker, value),
        }
    }

    /// Tracking id (0 before registration)
    pub fn id(&self) -> TrackingId {
        self.id
    }

    /// Owning context
    pub fn ctx_ref(&self) -> CtxRef {
        self.ctx_ref
    }

    /// Owning isolate
    pub fn isolate(&self) -> IsolateId {
        self.isolate
    }

    /// Boundary reference
    pub fn value_ref(&self) -> ValueRef {
        ValueRef::new(self.ctx_ref, self.id)
    }

    pub(crate) fn set_id(&mut self, id: TrackingId) {
        self.id = id;
    }

    /// Materialize the value inside the caller's handle scope
    pub fn local(&self, locker: &Locker<'_>) -> Option<Value> {
        let value = self.global.get(locker)?;
        locker.root_local(&value);
        Some(value)
    }

    /// Point the wrapper at a newly captured value
    pub fn reset(&mut self, locker: &Locker<'_>, value: Value) {
        self.global.set(locker, value);
    }

    /// Drop the persistent handle
    pub fn release(&mut self) {
        self.global.reset();
    }

    /// Whether the handle was released
    pub fn is_released(&self) -> bool {
        self.global.is_empty()
    }
}

/// A function or object template owned by one isolate
#[derive(Debug)]
pub struct Template {
    isolate: IsolateId,
    id: TemplateId,
    kind: TemplateKind,
}

impl Template {
    pub(crate) fn new(isolate: IsolateId, id: TemplateId, kind: TemplateKind) -> Self {
        Self { isolate, id, kind }
    }

    /// Template kind
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Owning isolate
    pub fn isolate(&self) -> IsolateId {
        self.isolate
    }

    /// Engine template id, after checking isolate and kind
    pub(crate) fn check(&self, isolate: IsolateId, kind: TemplateKind) -> BridgeResult<TemplateId> {
        if self.isolate != isolate {
            tracing::warn!(
                template_isolate = self.isolate.as_u64(),
                isolate = isolate.as_u64(),
                "template used on a foreign isolate"
            );
            return Err(BridgeError::ForeignTemplate);
        }
        if self.kind != kind {
            return Err(BridgeError::TemplateKind {
                expected: kind.name(),
                got: self.kind.name(),
            });
        }
        Ok(self.id)
    }
}
