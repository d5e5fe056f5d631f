//! Handle scopes, context scopes, exception capture and persistent handles
//!
//! Every scope takes its own (re-entrant) isolate lock and releases it on
//! drop, so scopes nest freely on the owning thread and unwind cleanly.

use super::context::Context;
use super::isolate::{Isolate, IsolateInner, Locker};
use super::value::Value;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Roots values created while it is open; releases them on drop
pub struct HandleScope<'a> {
    locker: Locker<'a>,
    mark: usize,
}

impl<'a> HandleScope<'a> {
    /// Open a scope
    pub fn new(isolate: &'a Isolate) -> Self {
        let locker = isolate.lock();
        let mark = locker.local_root_count();
        Self { locker, mark }
    }
}

impl<'a> Deref for HandleScope<'a> {
    type Target = Locker<'a>;

    fn deref(&self) -> &Self::Target {
        &self.locker
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.locker.truncate_local_roots(self.mark);
    }
}

/// Enters a context for its lifetime
pub struct ContextScope<'a> {
    locker: Locker<'a>,
    context: Context,
}

impl<'a> ContextScope<'a> {
    /// Enter `context`
    pub fn new(isolate: &'a Isolate, context: Context) -> Self {
        let locker = isolate.lock();
        locker.enter_context(context);
        Self { locker, context }
    }

    /// The entered context
    pub fn context(&self) -> Context {
        self.context
    }
}

impl<'a> Deref for ContextScope<'a> {
    type Target = Locker<'a>;

    fn deref(&self) -> &Self::Target {
        &self.locker
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.locker.exit_context();
    }
}

/// Captures exceptions thrown while it is open.
///
/// An exception pending from an outer scope is set aside on creation and
/// restored on drop; anything thrown inside is discarded with the scope.
pub struct TryCatch<'a> {
    locker: Locker<'a>,
    outer: Option<Value>,
}

impl<'a> TryCatch<'a> {
    /// Open a capture scope
    pub fn new(isolate: &'a Isolate) -> Self {
        let locker = isolate.lock();
        let outer = locker.replace_pending_exception(None);
        Self { locker, outer }
    }

    /// Whether an exception was thrown
    pub fn has_caught(&self) -> bool {
        self.locker.has_pending_exception()
    }

    /// The thrown value
    pub fn exception(&self) -> Option<Value> {
        self.locker.pending_exception()
    }

    /// Clear the captured exception
    pub fn reset(&self) {
        self.locker.replace_pending_exception(None);
    }
}

impl<'a> Deref for TryCatch<'a> {
    type Target = Locker<'a>;

    fn deref(&self) -> &Self::Target {
        &self.locker
    }
}

impl Drop for TryCatch<'_> {
    fn drop(&mut self) {
        self.locker.replace_pending_exception(self.outer.take());
    }
}

/// Persistent handle. Keeps its value alive across scopes until reset or
/// dropped. Dropping re-takes the isolate lock.
#[derive(Debug)]
pub struct Global {
    isolate: Weak<IsolateInner>,
    slot: Option<usize>,
}

impl Global {
    /// Root `value` persistently
    pub fn new(locker: &Locker<'_>, value: Value) -> Self {
        Self {
            isolate: locker.isolate().downgrade(),
            slot: Some(locker.create_persistent(value)),
        }
    }

    /// An empty handle
    pub fn empty() -> Self {
        Self {
            isolate: Weak::new(),
            slot: None,
        }
    }

    fn owned_by(&self, locker: &Locker<'_>) -> bool {
        std::ptr::eq(self.isolate.as_ptr(), Arc::as_ptr(&locker.isolate().inner))
    }

    /// Current value, `None` if empty or from another isolate
    pub fn get(&self, locker: &Locker<'_>) -> Option<Value> {
        let slot = self.slot?;
        if !self.owned_by(locker) {
            return None;
        }
        locker.persistent(slot)
    }

    /// Point the handle at a new value
    pub fn set(&mut self, locker: &Locker<'_>, value: Value) {
        match self.slot {
            Some(slot) if self.owned_by(locker) => locker.set_persistent(slot, value),
            _ => {
                self.reset();
                *self = Global::new(locker, value);
            }
        }
    }

    /// Release the value
    pub fn reset(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Some(inner) = self.isolate.upgrade() {
                let isolate = Isolate::from_inner(inner);
                isolate.lock().reset_persistent(slot);
            }
        }
    }

    /// Whether the handle is empty
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl Default for Global {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Global {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::heap::ErrorKind;

    #[test]
    fn test_handle_scope_releases_locals() {
        let isolate = Isolate::default();
        {
            let scope = HandleScope::new(&isolate);
            scope.new_object().unwrap();
            scope.new_object().unwrap();
            assert_eq!(scope.collect_garbage(), 0);
        }
        assert_eq!(isolate.lock().collect_garbage(), 2);
    }

    #[test]
    fn test_context_scope_enters_and_exits() {
        let isolate = Isolate::default();
        let locker = isolate.lock();
        let context = locker.new_context();
        assert_eq!(locker.current_context(), None);
        {
            let entered = ContextScope::new(&isolate, context);
            assert_eq!(entered.context(), context);
            assert_eq!(locker.current_context(), Some(context));
        }
        assert_eq!(locker.current_context(), None);
    }

    #[test]
    fn test_try_catch_captures_and_clears() {
        let isolate = Isolate::default();
        {
            let try_catch = TryCatch::new(&isolate);
            assert!(!try_catch.has_caught());
            try_catch.throw_error(ErrorKind::TypeError, "bad");
            assert!(try_catch.has_caught());
            let exception = try_catch.exception().unwrap();
            assert_eq!(try_catch.to_display_string(&exception), "TypeError: bad");
        }
        assert!(!isolate.lock().has_pending_exception());
    }

    #[test]
    fn test_nested_try_catch_restores_outer() {
        let isolate = Isolate::default();
        let outer = TryCatch::new(&isolate);
        outer.throw_exception(Value::from("outer"));
        {
            let inner = TryCatch::new(&isolate);
            assert!(!inner.has_caught());
            inner.throw_exception(Value::from("inner"));
        }
        assert_eq!(outer.exception(), Some(Value::from("outer")));
    }

    #[test]
    fn test_global_keeps_value_alive() {
        let isolate = Isolate::default();
        let mut global = {
            let scope = HandleScope::new(&isolate);
            let object = scope.new_object().unwrap();
            Global::new(&scope, object)
        };
        let locker = isolate.lock();
        assert_eq!(locker.collect_garbage(), 0);
        assert!(global.get(&locker).is_some());

        global.reset();
        assert!(global.is_empty());
        assert_eq!(locker.collect_garbage(), 1);
        assert_eq!(locker.persistent_count(), 0);
    }

    #[test]
    fn test_global_drop_releases_slot() {
        let isolate = Isolate::default();
        let locker = isolate.lock();
        let global = Global::new(&locker, Value::from(1));
        assert_eq!(locker.persistent_count(), 1);
        drop(global);
        assert_eq!(locker.persistent_count(), 0);
    }

    #[test]
    fn test_global_from_other_isolate_does_not_resolve() {
        let a = Isolate::default();
        let b = Isolate::default();
        let global = Global::new(&a.lock(), Value::from(1));
        assert_eq!(global.get(&b.lock()), None);
        assert_eq!(global.get(&a.lock()), Some(Value::from(1)));
    }
}
