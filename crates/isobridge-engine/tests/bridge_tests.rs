//! Host Bridge Integration Tests
//!
//! End-to-end tests driving a [`HostIsolate`] the way a host does:
//! - Template instantiation and value tracking
//! - Indexed and function callbacks routed by `callback_ref`
//! - Per-call context identity
//! - Accessor properties
//! - Builtin symbols
//! - Context teardown and garbage collection
//! - Host failures (thrown errors, panics, heap limits)
//!
//! # Running Tests
//! ```bash
//! cargo test --test bridge_tests
//! ```

use isobridge_engine::{
    BridgeContext, BridgeError, CallbackRef, CtxRef, HandlerRegistry, HostIsolate, HostReturn,
    IsolateOptions, PropertyAttribute, ResourceLimits, SymbolIndex, ValueRef,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// (ctx_ref, callback_ref, index) per host call
type CallLog = Arc<Mutex<Vec<(i32, i32, Option<u32>)>>>;

fn exception_message(err: &BridgeError) -> String {
    err.as_exception()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| panic!("expected an engine exception, got {err:?}"))
}

// ===== Indexed Interception =====

#[test]
fn test_index_handler_receives_context_callback_and_index() {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let handlers = HandlerRegistry::new();
    let log = calls.clone();
    handlers.register_as(CallbackRef(7), move |cx, inv| {
        log.lock()
            .push((inv.ctx_ref.as_i32(), inv.callback_ref.as_i32(), inv.index));
        match cx.new_string("ok") {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    assert_eq!(ctx, CtxRef(1));

    let template = host.new_object_template();
    host.set_internal_field_count(&template, 2).unwrap();
    host.set_indexed_handler(&template, CallbackRef(7)).unwrap();
    let object = host.instantiate(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let value = cx.get_index(object, 5).unwrap();
    assert_eq!(cx.value_to_string(value).unwrap(), "ok");
    assert_eq!(*calls.lock(), vec![(1, 7, Some(5))]);
}

#[test]
fn test_index_handler_sees_instance_as_this() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(1), |_cx, inv| HostReturn::Value(inv.this()));

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let template = host.new_object_template();
    host.set_indexed_handler(&template, CallbackRef(1)).unwrap();
    let object = host.instantiate(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let this = cx.get_index(object, 0).unwrap();
    assert_ne!(this, object);
    assert!(cx.strict_equals(this, object).unwrap());
}

#[test]
fn test_instances_report_their_own_context() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(7), |cx, inv| {
        match cx.new_number(inv.ctx_ref.as_i32() as f64) {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });

    let host = HostIsolate::with_host(handlers);
    let first = host.create_context().unwrap();
    let second = host.create_context().unwrap();
    let template = host.new_object_template();
    host.set_indexed_handler(&template, CallbackRef(7)).unwrap();

    let a = host.instantiate(&template, first).unwrap();
    let b = host.instantiate(&template, second).unwrap();

    let from_a = host.scope(first).get_index(a, 0).unwrap();
    let from_b = host.scope(second).get_index(b, 0).unwrap();
    assert_eq!(host.scope(first).number_value(from_a).unwrap(), Some(first.as_i32() as f64));
    assert_eq!(host.scope(second).number_value(from_b).unwrap(), Some(second.as_i32() as f64));
    assert_eq!(from_a.ctx_ref, first);
    assert_eq!(from_b.ctx_ref, second);
}

#[test]
fn test_cross_context_read_reports_reading_context() {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let handlers = HandlerRegistry::new();
    let log = calls.clone();
    handlers.register_as(CallbackRef(7), move |cx, inv| {
        log.lock()
            .push((inv.ctx_ref.as_i32(), inv.callback_ref.as_i32(), inv.index));
        match cx.new_number(inv.ctx_ref.as_i32() as f64) {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });

    let host = HostIsolate::with_host(handlers);
    let home = host.create_context().unwrap();
    let other = host.create_context().unwrap();
    let template = host.new_object_template();
    host.set_indexed_handler(&template, CallbackRef(7)).unwrap();
    let object = host.instantiate(&template, home).unwrap();
    assert_eq!(object.ctx_ref, home);

    let cx = host.scope(other);
    let value = cx.get_index(object, 3).unwrap();
    assert_eq!(value.ctx_ref, other);
    assert_eq!(cx.number_value(value).unwrap(), Some(other.as_i32() as f64));
    assert_eq!(*calls.lock(), vec![(other.as_i32(), 7, Some(3))]);
}

// ===== Function Templates =====

#[test]
fn test_function_call_passes_receiver_first() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handlers = HandlerRegistry::new();
    let log = seen.clone();
    handlers.register_as(CallbackRef(3), move |_cx, inv| {
        log.lock().push((inv.ctx_ref, inv.callback_ref, inv.args.clone(), inv.index));
        HostReturn::Undefined
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(3));
    let function = host.function_template_get_function(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let result = cx.call(function, ValueRef::NULL, &[]).unwrap();
    assert_eq!(cx.value_to_string(result).unwrap(), "undefined");

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let (ctx_ref, callback_ref, args, index) = &seen[0];
    assert_eq!(*ctx_ref, ctx);
    assert_eq!(*callback_ref, CallbackRef(3));
    assert_eq!(*index, None);
    assert_eq!(args.len(), 1);

    // A null receiver means the global object
    let global = cx.global().unwrap();
    assert!(cx.strict_equals(args[0], global).unwrap());
}

#[test]
fn test_function_arguments_follow_receiver() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(1), |cx, inv| {
        let sum = inv
            .arguments()
            .iter()
            .filter_map(|&arg| cx.number_value(arg).ok().flatten())
            .sum::<f64>();
        match cx.new_number(sum) {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(1));
    let function = host.function_template_get_function(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let recv = cx.new_object().unwrap();
    let a = cx.new_number(2.0).unwrap();
    let b = cx.new_number(40.0).unwrap();
    let result = cx.call(function, recv, &[a, b]).unwrap();
    assert_eq!(cx.number_value(result).unwrap(), Some(42.0));
}

#[test]
fn test_host_error_becomes_exception() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(3), |cx, _inv| match cx.new_error("host failure") {
        Ok(err) => HostReturn::Throw(err),
        Err(_) => HostReturn::Undefined,
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(3));
    let function = host.function_template_get_function(&template, ctx).unwrap();

    let err = host.scope(ctx).call(function, ValueRef::NULL, &[]).unwrap_err();
    let exception = err.as_exception().unwrap();
    assert_eq!(exception.message, "Error: host failure");
    assert_eq!(exception.location.as_deref(), Some("context 1"));
    assert!(exception
        .stack
        .as_deref()
        .unwrap()
        .starts_with("Error: host failure"));
}

#[test]
fn test_unregistered_callback_throws() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(9));
    let function = host.function_template_get_function(&template, ctx).unwrap();

    let err = host.scope(ctx).call(function, ValueRef::NULL, &[]).unwrap_err();
    assert_eq!(
        exception_message(&err),
        "Error: No host handler registered for callback 9"
    );
}

#[test]
fn test_get_function_is_stable_per_context() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let first = host.create_context().unwrap();
    let second = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(1));

    let a = host.function_template_get_function(&template, first).unwrap();
    let b = host.function_template_get_function(&template, first).unwrap();
    let c = host.function_template_get_function(&template, second).unwrap();
    assert_ne!(a.id, b.id);
    assert!(host.scope(first).strict_equals(a, b).unwrap());
    assert!(!host.scope(first).strict_equals(a, c).unwrap());
}

#[test]
fn test_reentrant_call_from_handler() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(1), |cx, inv| {
        let inner = inv.arguments()[0];
        match cx.call(inner, ValueRef::NULL, &[]) {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });
    handlers.register_as(CallbackRef(2), |cx, _inv| match cx.new_string("inner") {
        Ok(v) => HostReturn::Value(v),
        Err(_) => HostReturn::Undefined,
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let outer = host.new_function_template(CallbackRef(1));
    let inner = host.new_function_template(CallbackRef(2));
    let outer = host.function_template_get_function(&outer, ctx).unwrap();
    let inner = host.function_template_get_function(&inner, ctx).unwrap();

    let cx = host.scope(ctx);
    let result = cx.call(outer, ValueRef::NULL, &[inner]).unwrap();
    assert_eq!(cx.value_to_string(result).unwrap(), "inner");
}

#[test]
fn test_panicking_handler_becomes_exception() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(1), |_cx, _inv| panic!("kaboom"));

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let template = host.new_function_template(CallbackRef(1));
    let function = host.function_template_get_function(&template, ctx).unwrap();

    let err = host.scope(ctx).call(function, ValueRef::NULL, &[]).unwrap_err();
    assert_eq!(exception_message(&err), "Error: host callback panicked: kaboom");

    // The isolate is still usable afterwards
    let value = host.scope(ctx).new_string("alive").unwrap();
    assert_eq!(host.scope(ctx).value_to_string(value).unwrap(), "alive");
}

// ===== Object Templates =====

#[test]
fn test_instantiate_twice_yields_distinct_values() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let template = host.new_object_template();

    let a = host.instantiate(&template, ctx).unwrap();
    let b = host.instantiate(&template, ctx).unwrap();
    assert_eq!(a.ctx_ref, ctx);
    assert_eq!(b.ctx_ref, ctx);
    assert_ne!(a.id, b.id);
    assert!(!host.scope(ctx).strict_equals(a, b).unwrap());
    assert_eq!(host.tracked_count(ctx), Some(2));
}

#[test]
fn test_getter_only_accessor_ignores_writes() {
    let getter_calls = Arc::new(AtomicUsize::new(0));
    let handlers = HandlerRegistry::new();
    let calls = getter_calls.clone();
    handlers.register_as(CallbackRef(10), move |cx, _inv| {
        calls.fetch_add(1, Ordering::SeqCst);
        match cx.new_number(42.0) {
            Ok(v) => HostReturn::Value(v),
            Err(_) => HostReturn::Undefined,
        }
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let getter = host.new_function_template(CallbackRef(10));
    let template = host.new_object_template();
    host.set_accessor_property(&template, "answer", Some(&getter), None, PropertyAttribute::NONE)
        .unwrap();
    let object = host.instantiate(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let replacement = cx.new_number(7.0).unwrap();
    assert_eq!(cx.set(object, "answer", replacement), Ok(false));
    assert_eq!(getter_calls.load(Ordering::SeqCst), 0);

    let value = cx.get(object, "answer").unwrap();
    assert_eq!(cx.number_value(value).unwrap(), Some(42.0));
    assert_eq!(getter_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_accessor_setter_receives_value() {
    let stored = Arc::new(Mutex::new(None));
    let handlers = HandlerRegistry::new();
    let sink = stored.clone();
    handlers.register_as(CallbackRef(2), move |cx, inv| {
        let value = inv.arguments()[0];
        *sink.lock() = cx.value_to_string(value).ok();
        HostReturn::Undefined
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let setter = host.new_function_template(CallbackRef(2));
    let template = host.new_object_template();
    host.set_accessor_property(&template, "name", None, Some(&setter), PropertyAttribute::DONT_ENUM)
        .unwrap();
    let object = host.instantiate(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    let value = cx.new_string("alice").unwrap();
    assert_eq!(cx.set(object, "name", value), Ok(true));
    assert_eq!(stored.lock().as_deref(), Some("alice"));

    // No getter: reads see undefined
    let read = cx.get(object, "name").unwrap();
    assert_eq!(cx.value_to_string(read).unwrap(), "undefined");
}

#[test]
fn test_heap_limit_failure_is_tagged_with_context() {
    // Internal and user context globals fill the heap
    let options = IsolateOptions::with_limits(ResourceLimits::with_heap_limit(2));
    let host = HostIsolate::new(options, HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let template = host.new_object_template();

    let err = host.instantiate(&template, ctx).unwrap_err();
    let exception = err.as_exception().unwrap();
    assert_eq!(exception.message, "RangeError: Heap object limit exceeded");
    assert_eq!(exception.location.as_deref(), Some("context 1"));
    assert_eq!(host.tracked_count(ctx), Some(0));
}

#[test]
fn test_accessor_attributes_are_visible_on_instances() {
    let handlers = HandlerRegistry::new();
    handlers.register_as(CallbackRef(1), |cx, _inv| match cx.new_number(1.0) {
        Ok(v) => HostReturn::Value(v),
        Err(_) => HostReturn::Undefined,
    });

    let host = HostIsolate::with_host(handlers);
    let ctx = host.create_context().unwrap();
    let getter = host.new_function_template(CallbackRef(1));
    let template = host.new_object_template();
    let hidden = PropertyAttribute::READ_ONLY | PropertyAttribute::DONT_ENUM;
    host.set_accessor_property(&template, "token", Some(&getter), None, hidden)
        .unwrap();
    host.set_accessor_property(&template, "size", Some(&getter), None, PropertyAttribute::NONE)
        .unwrap();
    let object = host.instantiate(&template, ctx).unwrap();

    let cx = host.scope(ctx);
    assert_eq!(cx.property_attributes(object, "token"), Ok(Some(hidden)));
    assert_eq!(cx.property_attributes(object, "size"), Ok(Some(PropertyAttribute::NONE)));
    assert_eq!(cx.property_attributes(object, "absent"), Ok(None));
    assert_eq!(cx.own_keys(object), Ok(vec!["size".to_string()]));

    let number = cx.new_number(5.0).unwrap();
    assert_eq!(cx.own_keys(number), Err(BridgeError::NotAnObject(number)));
}

// ===== Builtin Symbols =====

#[test]
fn test_builtin_symbols_are_identity_equal() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let cx = host.scope(CtxRef::INTERNAL);
    for index in SymbolIndex::ALL {
        let a = host.builtin_symbol(index).unwrap();
        let b = host.builtin_symbol(index).unwrap();
        assert_ne!(a.id, b.id);
        assert!(cx.strict_equals(a, b).unwrap(), "{index} not identity-equal");
        assert_eq!(host.symbol_description(a).unwrap(), index.description());
    }

    let iterator = host.builtin_symbol(SymbolIndex::Iterator).unwrap();
    let unscopables = host.builtin_symbol(SymbolIndex::Unscopables).unwrap();
    assert!(!cx.strict_equals(iterator, unscopables).unwrap());
    assert_eq!(host.symbol_description(unscopables).unwrap(), "Symbol.unscopables");
}

#[test]
fn test_symbols_survive_user_context_teardown() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let symbol = host.builtin_symbol_by_index(1).unwrap();
    host.dispose_context(ctx).unwrap();
    host.collect_garbage();
    assert_eq!(host.symbol_description(symbol).unwrap(), "Symbol.asyncIterator");
}

// ===== Teardown and GC =====

#[test]
fn test_teardown_invalidates_every_reference() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let template = host.new_object_template();
    let object = host.instantiate(&template, ctx).unwrap();
    let string = host.scope(ctx).new_string("x").unwrap();
    assert_eq!(host.tracked_count(ctx), Some(2));

    host.dispose_context(ctx).unwrap();

    assert_eq!(host.tracked_count(ctx), None);
    assert_eq!(host.context_count(), 0);
    for value in [object, string] {
        assert_eq!(
            host.scope(ctx).value_to_string(value),
            Err(BridgeError::UnknownContext(ctx))
        );
        // Releasing after teardown is harmless
        host.release(value);
    }
    assert_eq!(
        host.instantiate(&template, ctx),
        Err(BridgeError::UnknownContext(ctx))
    );

    // New contexts never reuse the old reference
    let next = host.create_context().unwrap();
    assert_ne!(next, ctx);
}

#[test]
fn test_released_values_are_collected() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let ctx = host.create_context().unwrap();
    let cx = host.scope(ctx);
    let dropped = cx.new_object().unwrap();
    let kept = cx.new_object().unwrap();
    let before = host.heap_stats().live_objects;

    host.release(dropped);
    host.release(dropped);
    assert_eq!(cx.value_to_string(dropped), Err(BridgeError::ValueReleased(dropped)));

    assert_eq!(host.collect_garbage(), 1);
    assert_eq!(host.heap_stats().live_objects, before - 1);
    assert_eq!(cx.value_to_string(kept).unwrap(), "[object Object]");
}

#[test]
fn test_disposed_context_objects_are_collected() {
    let host = HostIsolate::with_host(HandlerRegistry::new());
    let baseline = host.heap_stats().live_objects;
    let ctx = host.create_context().unwrap();
    let template = host.new_object_template();
    for _ in 0..10 {
        host.instantiate(&template, ctx).unwrap();
    }
    host.dispose_context(ctx).unwrap();
    host.collect_garbage();
    assert_eq!(host.heap_stats().live_objects, baseline);
}
