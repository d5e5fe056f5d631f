//! Exception capture
//!
//! Every fallible engine operation runs under a `TryCatch`; a captured
//! exception becomes an [`ExceptionError`] tagged with the active context.

use crate::native::{Isolate, Locker, TryCatch, Value};
use isobridge_sdk::{BridgeResult, CtxRef, ExceptionError};

/// Describe a thrown value.
///
/// The message is the value's string conversion (`"Name: message"` for
/// error objects). The stack comes from the error's own `stack` property.
pub(crate) fn exception_error(locker: &Locker<'_>, exception: &Value, ctx_ref: CtxRef) -> ExceptionError {
    let message = locker.to_display_string(exception);
    let error = ExceptionError::new(message).with_location(format!("context {}", ctx_ref));
    match locker.own_data_property(exception, "stack") {
        Some(Value::String(stack)) if locker.is_error(exception) => error.with_stack(stack.to_string()),
        _ => error,
    }
}

/// Run `op` with exception capture
pub(crate) fn try_catch<T>(
    isolate: &Isolate,
    ctx_ref: CtxRef,
    op: impl FnOnce(&Locker<'_>) -> Option<T>,
) -> BridgeResult<T> {
    let try_catch = TryCatch::new(isolate);
    let result = op(&*try_catch);
    match (result, try_catch.exception()) {
        (Some(value), None) => Ok(value),
        (_, Some(exception)) => {
            let error = exception_error(&try_catch, &exception, ctx_ref);
            tracing::debug!(%ctx_ref, message = %error.message, "engine exception captured");
            Err(error.into())
        }
        (None, None) => Err(ExceptionError::new("Operation failed without an exception")
            .with_location(format!("context {}", ctx_ref))
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::ErrorKind;
    use isobridge_sdk::BridgeError;

    #[test]
    fn test_success_passes_through() {
        let isolate = Isolate::default();
        let result = try_catch(&isolate, CtxRef(1), |locker| Some(locker.new_context()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_error_object_exception() {
        let isolate = Isolate::default();
        let result: BridgeResult<()> = try_catch(&isolate, CtxRef(2), |locker| {
            locker.throw_error(ErrorKind::TypeError, "nope");
            None
        });
        let err = result.unwrap_err();
        let exception = err.as_exception().unwrap();
        assert_eq!(exception.message, "TypeError: nope");
        assert_eq!(exception.location.as_deref(), Some("context 2"));
        assert!(exception.stack.as_deref().unwrap().starts_with("TypeError: nope"));
        assert!(!isolate.lock().has_pending_exception());
    }

    #[test]
    fn test_primitive_exception() {
        let isolate = Isolate::default();
        let result: BridgeResult<()> = try_catch(&isolate, CtxRef(1), |locker| {
            locker.throw_exception(Value::from(42));
            None
        });
        assert_eq!(
            result,
            Err(BridgeError::Exception(
                ExceptionError::new("42").with_location("context 1")
            ))
        );
    }
}
