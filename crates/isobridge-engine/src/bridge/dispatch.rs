//! Callback dispatcher
//!
//! The native trampolines installed on every template. They carry no host
//! state: identity is recovered per call from the executing context's
//! embedder data (`ctx_ref`) and the template's callback data
//! (`callback_ref`). Resolution failures abort the invocation with an
//! engine exception; nothing is dispatched against a guessed context.

use super::registry::TrackedContext;
use super::scope::BridgeScope;
use super::Shared;
use crate::native::{
    ErrorKind, FunctionCallbackInfo, HandleScope, Intercepted, Isolate, Locker,
    PropertyCallbackInfo, Value,
};
use isobridge_sdk::{
    BridgeError, BridgeResult, CallbackRef, CtxRef, HostReturn, Invocation, ValueRef, CTX_REF_SLOT,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Function-template callback
pub(crate) fn function_callback(info: &mut FunctionCallbackInfo<'_>) {
    let callback_ref = info.data().as_i32().map(CallbackRef);
    let mut args = Vec::with_capacity(info.length() + 1);
    args.push(info.this());
    args.extend_from_slice(info.args());

    if let Some(value) = dispatch(info.isolate(), callback_ref, args, None) {
        info.set_return_value(value);
    }
}

/// Indexed-property getter. Always intercepts.
pub(crate) fn indexed_getter(index: u32, info: &mut PropertyCallbackInfo<'_>) -> Intercepted {
    let callback_ref = info.data().as_i32().map(CallbackRef);
    let args = vec![info.this()];

    if let Some(value) = dispatch(info.isolate(), callback_ref, args, Some(index)) {
        info.set_return_value(value);
    }
    Intercepted::Yes
}

/// Run one invocation. `None` means an exception is now pending.
fn dispatch(
    isolate: &Isolate,
    callback_ref: Option<CallbackRef>,
    args: Vec<Value>,
    index: Option<u32>,
) -> Option<Value> {
    let scope = HandleScope::new(isolate);

    let (shared, context, callback_ref) = match resolve_identity(&scope, callback_ref) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!(error = %err, "callback identity resolution failed");
            scope.throw_error(ErrorKind::Error, &err.to_string());
            return None;
        }
    };
    let ctx_ref = context.ctx_ref();

    let args = match track_all(&scope, &shared, &context, args) {
        Ok(args) => args,
        Err(err) => {
            tracing::error!(%ctx_ref, %callback_ref, error = %err, "failed to track callback arguments");
            scope.throw_error(ErrorKind::Error, &err.to_string());
            return None;
        }
    };

    let invocation = Invocation {
        ctx_ref,
        callback_ref,
        args,
        index,
    };
    tracing::trace!(%ctx_ref, %callback_ref, ?index, argc = invocation.args.len(), "dispatching host callback");

    let cx = BridgeScope::new(isolate, &shared, ctx_ref);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.host.call(&cx, &invocation)));

    match outcome {
        Ok(HostReturn::Value(value_ref)) => match shared.registry.resolve_value(&scope, value_ref) {
            Ok(value) => Some(value),
            Err(err) => {
                throw_unresolved(&scope, callback_ref, value_ref, err);
                None
            }
        },
        Ok(HostReturn::Throw(value_ref)) => {
            match shared.registry.resolve_value(&scope, value_ref) {
                Ok(exception) => scope.throw_exception(exception),
                Err(err) => throw_unresolved(&scope, callback_ref, value_ref, err),
            }
            None
        }
        Ok(HostReturn::Undefined) => Some(Value::Undefined),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%ctx_ref, %callback_ref, %message, "host callback panicked");
            scope.throw_error(
                ErrorKind::Error,
                &format!("host callback panicked: {}", message),
            );
            None
        }
    }
}

fn resolve_identity(
    locker: &Locker<'_>,
    callback_ref: Option<CallbackRef>,
) -> BridgeResult<(Arc<Shared>, Arc<TrackedContext>, CallbackRef)> {
    let shared = locker
        .isolate()
        .get_slot::<Shared>()
        .ok_or_else(|| BridgeError::Resolution("isolate is not bridged".to_string()))?;
    let context = locker
        .current_context()
        .ok_or_else(|| BridgeError::Resolution("no context is entered".to_string()))?;
    let ctx_ref = locker
        .embedder_data(context, CTX_REF_SLOT)
        .and_then(|value| value.as_i32())
        .map(CtxRef)
        .ok_or_else(|| {
            BridgeError::Resolution(format!(
                "context carries no reference in embedder slot {}",
                CTX_REF_SLOT
            ))
        })?;
    let tracked = shared.registry.resolve(locker, ctx_ref)?;
    if tracked.native() != context {
        return Err(BridgeError::Resolution(format!(
            "context reference {} names a different context",
            ctx_ref
        )));
    }
    let callback_ref = callback_ref
        .ok_or_else(|| BridgeError::Resolution("callback data carries no callback reference".to_string()))?;
    Ok((shared, tracked, callback_ref))
}

fn track_all(
    locker: &Locker<'_>,
    shared: &Shared,
    context: &TrackedContext,
    values: Vec<Value>,
) -> BridgeResult<Vec<ValueRef>> {
    values
        .into_iter()
        .map(|value| shared.registry.track(locker, context, value))
        .collect()
}

fn throw_unresolved(locker: &Locker<'_>, callback_ref: CallbackRef, value_ref: ValueRef, err: BridgeError) {
    tracing::error!(%callback_ref, value = %value_ref, error = %err, "host returned an untracked value");
    locker.throw_error(
        ErrorKind::Error,
        &format!("host callback {} returned an untracked value {}", callback_ref, value_ref),
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_unbridged_isolate_throws() {
        let isolate = Isolate::default();
        let locker = isolate.lock();
        let context = locker.new_context();
        let template = locker.new_function_template(Some(function_callback), Value::from(1));
        let function = locker.get_function(template, context).unwrap();

        assert_eq!(locker.call(&function, Value::Undefined, &[]), None);
        let exception = locker.pending_exception().unwrap();
        assert_eq!(
            locker.to_display_string(&exception),
            "Error: Callback identity resolution failed: isolate is not bridged"
        );
    }
}
