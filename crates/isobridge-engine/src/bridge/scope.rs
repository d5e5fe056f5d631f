//! Context-bound engine access
//!
//! [`BridgeScope`] is the one implementation of [`BridgeContext`]: hosts get
//! it from [`HostIsolate::scope`](super::HostIsolate::scope), and the
//! dispatcher hands it to handlers for the duration of a callback. Every
//! operation resolves its context afresh, so a scope whose context was torn
//! down fails with `UnknownContext` instead of touching stale handles.

use super::handle::Template;
use super::registry::TrackedContext;
use super::result;
use super::Shared;
use crate::native::{
    ContextScope, ErrorKind, HandleScope, Isolate, Locker, PropertyKey, TemplateKind, Value,
};
use isobridge_sdk::{BridgeContext, BridgeError, BridgeResult, CtxRef, PropertyAttribute, ValueRef};

/// Engine access bound to one context
pub struct BridgeScope<'a> {
    isolate: &'a Isolate,
    shared: &'a Shared,
    ctx_ref: CtxRef,
}

impl<'a> BridgeScope<'a> {
    pub(crate) fn new(isolate: &'a Isolate, shared: &'a Shared, ctx_ref: CtxRef) -> Self {
        Self {
            isolate,
            shared,
            ctx_ref,
        }
    }

    /// Lock, open a handle scope, resolve and enter the context
    fn enter<T>(
        &self,
        op: impl FnOnce(&Locker<'_>, &TrackedContext) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let scope = HandleScope::new(self.isolate);
        let context = self.shared.registry.resolve(&scope, self.ctx_ref)?;
        let _entered = ContextScope::new(self.isolate, context.native());
        op(&*scope, &*context)
    }

    fn engine<T>(&self, op: impl FnOnce(&Locker<'_>) -> Option<T>) -> BridgeResult<T> {
        result::try_catch(self.isolate, self.ctx_ref, op)
    }

    fn value(&self, locker: &Locker<'_>, value_ref: ValueRef) -> BridgeResult<Value> {
        self.shared.registry.resolve_value(locker, value_ref)
    }

    fn object(&self, locker: &Locker<'_>, value_ref: ValueRef) -> BridgeResult<Value> {
        let value = self.value(locker, value_ref)?;
        match value {
            Value::Object(_) => Ok(value),
            _ => Err(BridgeError::NotAnObject(value_ref)),
        }
    }

    fn track(&self, locker: &Locker<'_>, context: &TrackedContext, value: Value) -> BridgeResult<ValueRef> {
        self.shared.registry.track(locker, context, value)
    }

    fn track_new(&self, value: impl FnOnce(&Locker<'_>) -> Value) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let value = value(locker);
            self.track(locker, context, value)
        })
    }

    /// Instantiate an object template in this context
    pub fn new_instance(&self, template: &Template) -> BridgeResult<ValueRef> {
        let template = template.check(self.isolate.id(), TemplateKind::Object)?;
        self.enter(|locker, context| {
            let instance = self.engine(|l| l.new_instance(template, context.native()))?;
            self.track(locker, context, instance)
        })
    }

    /// This context's function for a function template
    pub fn get_function(&self, template: &Template) -> BridgeResult<ValueRef> {
        let template = template.check(self.isolate.id(), TemplateKind::Function)?;
        self.enter(|locker, context| {
            let function = self.engine(|l| l.get_function(template, context.native()))?;
            self.track(locker, context, function)
        })
    }

    /// The context's global object
    pub fn global(&self) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let global = locker
                .context_global(context.native())
                .ok_or(BridgeError::UnknownContext(self.ctx_ref))?;
            self.track(locker, context, global)
        })
    }
}

impl BridgeContext for BridgeScope<'_> {
    fn ctx_ref(&self) -> CtxRef {
        self.ctx_ref
    }

    fn undefined(&self) -> BridgeResult<ValueRef> {
        self.track_new(|_| Value::Undefined)
    }

    fn null(&self) -> BridgeResult<ValueRef> {
        self.track_new(|_| Value::Null)
    }

    fn new_boolean(&self, b: bool) -> BridgeResult<ValueRef> {
        self.track_new(|_| Value::from(b))
    }

    fn new_number(&self, n: f64) -> BridgeResult<ValueRef> {
        self.track_new(|_| Value::from(n))
    }

    fn new_string(&self, s: &str) -> BridgeResult<ValueRef> {
        self.track_new(|_| Value::from(s))
    }

    fn new_object(&self) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let object = self.engine(|l| l.new_object())?;
            self.track(locker, context, object)
        })
    }

    fn new_error(&self, message: &str) -> BridgeResult<ValueRef> {
        self.track_new(|locker| locker.new_error(ErrorKind::Error, message))
    }

    fn value_to_string(&self, value: ValueRef) -> BridgeResult<String> {
        self.enter(|locker, _| {
            let value = self.value(locker, value)?;
            Ok(locker.to_display_string(&value))
        })
    }

    fn number_value(&self, value: ValueRef) -> BridgeResult<Option<f64>> {
        self.enter(|locker, _| Ok(self.value(locker, value)?.as_number()))
    }

    fn strict_equals(&self, a: ValueRef, b: ValueRef) -> BridgeResult<bool> {
        self.enter(|locker, _| {
            let a = self.value(locker, a)?;
            let b = self.value(locker, b)?;
            Ok(a.strict_equals(&b))
        })
    }

    fn get(&self, object: ValueRef, key: &str) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let target = self.value(locker, object)?;
            let value = self.engine(|l| l.get(&target, &PropertyKey::from(key)))?;
            self.track(locker, context, value)
        })
    }

    fn set(&self, object: ValueRef, key: &str, value: ValueRef) -> BridgeResult<bool> {
        self.enter(|locker, _| {
            let target = self.value(locker, object)?;
            let value = self.value(locker, value)?;
            self.engine(|l| l.set(&target, &PropertyKey::from(key), value))
        })
    }

    fn get_index(&self, object: ValueRef, index: u32) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let target = self.value(locker, object)?;
            let value = self.engine(|l| l.get_index(&target, index))?;
            self.track(locker, context, value)
        })
    }

    fn set_index(&self, object: ValueRef, index: u32, value: ValueRef) -> BridgeResult<bool> {
        self.enter(|locker, _| {
            let target = self.value(locker, object)?;
            let value = self.value(locker, value)?;
            self.engine(|l| l.set_index(&target, index, value))
        })
    }

    fn property_attributes(
        &self,
        object: ValueRef,
        key: &str,
    ) -> BridgeResult<Option<PropertyAttribute>> {
        self.enter(|locker, _| {
            let target = self.object(locker, object)?;
            Ok(locker.property_attributes(&target, &PropertyKey::from(key)))
        })
    }

    fn own_keys(&self, object: ValueRef) -> BridgeResult<Vec<String>> {
        self.enter(|locker, _| {
            let target = self.object(locker, object)?;
            Ok(locker.own_keys(&target).iter().map(|k| k.to_string()).collect())
        })
    }

    fn internal_field_count(&self, object: ValueRef) -> BridgeResult<usize> {
        self.enter(|locker, _| {
            let target = self.object(locker, object)?;
            Ok(locker.internal_field_count(&target).unwrap_or(0))
        })
    }

    fn internal_field(&self, object: ValueRef, index: usize) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let target = self.object(locker, object)?;
            let count = locker.internal_field_count(&target).unwrap_or(0);
            let value = locker
                .internal_field(&target, index)
                .ok_or(BridgeError::InternalFieldOutOfRange { index, count })?;
            self.track(locker, context, value)
        })
    }

    fn set_internal_field(&self, object: ValueRef, index: usize, value: ValueRef) -> BridgeResult<()> {
        self.enter(|locker, _| {
            let target = self.object(locker, object)?;
            let value = self.value(locker, value)?;
            if locker.set_internal_field(&target, index, value) {
                Ok(())
            } else {
                let count = locker.internal_field_count(&target).unwrap_or(0);
                Err(BridgeError::InternalFieldOutOfRange { index, count })
            }
        })
    }

    fn call(&self, function: ValueRef, recv: ValueRef, args: &[ValueRef]) -> BridgeResult<ValueRef> {
        self.enter(|locker, context| {
            let callee = self.value(locker, function)?;
            if !locker.is_function(&callee) {
                return Err(BridgeError::NotAFunction(function));
            }
            let recv = match recv.non_null() {
                Some(recv) => self.value(locker, recv)?,
                None => Value::Undefined,
            };
            let args = args
                .iter()
                .map(|&arg| self.value(locker, arg))
                .collect::<BridgeResult<Vec<_>>>()?;
            let result = self.engine(|l| l.call(&callee, recv, &args))?;
            self.track(locker, context, result)
        })
    }

    fn release(&self, value: ValueRef) {
        let scope = HandleScope::new(self.isolate);
        self.shared.registry.release(&scope, value);
    }
}
