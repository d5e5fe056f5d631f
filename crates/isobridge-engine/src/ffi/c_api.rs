//! C FFI bindings for the isobridge isolate bridge
//!
//! This module provides a C-compatible API for hosts written in other
//! languages. The API follows these principles:
//! - ABI-stable (uses only C-compatible types)
//! - Values cross as plain `ValueRef { ctx_ref, id }` pairs, never pointers
//! - Error handling via `RtnValue.error` or out-parameters
//! - Opaque pointers for isolates, templates and inspectors
//! - Manual memory management

use crate::bridge::{HostIsolate, Template};
use crate::inspector::{
    ClientRegistry, ConsoleApiMessage, ConsoleApiMessageHandler, Inspector, InspectorClient,
    MessageErrorLevel,
};
use crate::native::IsolateOptions;
use isobridge_sdk::{
    BridgeContext, BridgeError, CallbackRef, CtxRef, HostCallback, HostReturn, Invocation,
    NoopHostCallback, PropertyAttribute, ValueRef, NO_INDEX,
};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::Arc;

// ============================================================================
// Opaque Types
// ============================================================================

/// Opaque handle to a bridged isolate
#[repr(C)]
pub struct IsobridgeIsolate {
    _private: [u8; 0],
}

/// Opaque handle to a function or object template
#[repr(C)]
pub struct IsobridgeTemplate {
    _private: [u8; 0],
}

/// Opaque handle to an inspector
#[repr(C)]
pub struct IsobridgeInspector {
    _private: [u8; 0],
}

/// Opaque handle to an inspector client
#[repr(C)]
pub struct IsobridgeInspectorClient {
    _private: [u8; 0],
}

/// Error information
#[repr(C)]
pub struct IsobridgeError {
    message: *mut c_char,
    location: *mut c_char,
    stack: *mut c_char,
}

/// Value-or-error result. Exactly one of the two is set.
#[repr(C)]
pub struct RtnValue {
    /// Tracked value; null reference on error
    pub value: ValueRef,
    /// Error; NULL on success. Free with `isobridge_error_free()`.
    pub error: *mut IsobridgeError,
}

/// Result of a host callback. A non-null `error` is thrown into the script.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CallbackReturn {
    /// Value to return
    pub value: ValueRef,
    /// Value to throw
    pub error: ValueRef,
}

/// Host callback: `(ctx_ref, callback_ref, this_and_args, arg_count, index)`.
/// `this_and_args[0]` is the receiver and `arg_count` counts the arguments
/// after it, so the array holds `arg_count + 1` values (`arg_count` is 0
/// for indexed reads). `index` is `ISOBRIDGE_NO_INDEX` for calls.
pub type IsobridgeHostCallback =
    extern "C" fn(c_int, c_int, *const ValueRef, usize, u32) -> CallbackReturn;

/// Console message callback: `(callback_ref, level, message)`
pub type IsobridgeConsoleCallback = extern "C" fn(c_int, c_int, *const c_char);

/// Index passed to the host callback for function calls
pub const ISOBRIDGE_NO_INDEX: u32 = NO_INDEX;

// Internal representations (not exposed to C)
struct IsolateHandle {
    host: HostIsolate,
}

struct TemplateHandle {
    template: Template,
}

struct ClientHandle {
    clients: Arc<ClientRegistry>,
    client: Arc<InspectorClient>,
}

struct InspectorHandle {
    inspector: Inspector,
}

/// Forwards invocations to a C function pointer
struct CHostCallback {
    callback: IsobridgeHostCallback,
}

impl HostCallback for CHostCallback {
    fn call(&self, _cx: &dyn BridgeContext, invocation: &Invocation) -> HostReturn {
        let ret = (self.callback)(
            invocation.ctx_ref.as_i32(),
            invocation.callback_ref.as_i32(),
            invocation.args.as_ptr(),
            invocation.arguments().len(),
            invocation.index.unwrap_or(NO_INDEX),
        );
        HostReturn::from_slots(ret.value.non_null(), ret.error.non_null())
    }
}

/// Forwards console messages to a C function pointer
struct CConsoleHandler {
    callback_ref: CallbackRef,
    callback: IsobridgeConsoleCallback,
}

impl ConsoleApiMessageHandler for CConsoleHandler {
    fn console_api_message(&self, message: &ConsoleApiMessage) {
        let text = CString::new(message.message.replace('\0', "")).unwrap_or_default();
        (self.callback)(
            self.callback_ref.as_i32(),
            message.error_level as c_int,
            text.as_ptr(),
        );
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert Rust string to C string (caller must free)
unsafe fn rust_to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Borrow a C string as UTF-8
unsafe fn c_to_str<'a>(s: *const c_char) -> Result<&'a str, BridgeError> {
    if s.is_null() {
        return Err(BridgeError::InvalidArgument("null string".to_string()));
    }
    CStr::from_ptr(s)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument("string is not UTF-8".to_string()))
}

/// Create error from BridgeError
unsafe fn create_error(error: &BridgeError) -> *mut IsobridgeError {
    let (message, location, stack) = match error.as_exception() {
        Some(exception) => (
            rust_to_c_string(&exception.message),
            exception
                .location
                .as_deref()
                .map_or(ptr::null_mut(), |l| rust_to_c_string(l)),
            exception
                .stack
                .as_deref()
                .map_or(ptr::null_mut(), |s| rust_to_c_string(s)),
        ),
        None => (rust_to_c_string(&error.to_string()), ptr::null_mut(), ptr::null_mut()),
    };
    Box::into_raw(Box::new(IsobridgeError {
        message,
        location,
        stack,
    }))
}

/// Set error out-parameter
unsafe fn set_error(error_out: *mut *mut IsobridgeError, error: &BridgeError) {
    if !error_out.is_null() {
        *error_out = create_error(error);
    }
}

unsafe fn set_error_str(error_out: *mut *mut IsobridgeError, msg: &str) {
    set_error(error_out, &BridgeError::InvalidArgument(msg.to_string()));
}

unsafe fn rtn(result: Result<ValueRef, BridgeError>) -> RtnValue {
    match result {
        Ok(value) => RtnValue {
            value,
            error: ptr::null_mut(),
        },
        Err(err) => RtnValue {
            value: ValueRef::NULL,
            error: create_error(&err),
        },
    }
}

unsafe fn rtn_invalid() -> RtnValue {
    rtn(Err(BridgeError::InvalidArgument("null pointer".to_string())))
}

unsafe fn host<'a>(iso: *const IsobridgeIsolate) -> Option<&'a HostIsolate> {
    if iso.is_null() {
        None
    } else {
        Some(&(*(iso as *const IsolateHandle)).host)
    }
}

unsafe fn template<'a>(tmpl: *const IsobridgeTemplate) -> Option<&'a Template> {
    if tmpl.is_null() {
        None
    } else {
        Some(&(*(tmpl as *const TemplateHandle)).template)
    }
}

// ============================================================================
// Isolate Lifecycle Functions
// ============================================================================

/// Create a bridged isolate with default options
///
/// # Arguments
/// * `callback` - Host callback for every template invocation (may be NULL)
///
/// # Safety
/// The returned isolate must be freed with `isobridge_isolate_dispose()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_isolate_new(
    callback: Option<IsobridgeHostCallback>,
) -> *mut IsobridgeIsolate {
    let host = match callback {
        Some(callback) => HostIsolate::with_host(CHostCallback { callback }),
        None => HostIsolate::with_host(NoopHostCallback),
    };
    Box::into_raw(Box::new(IsolateHandle { host })) as *mut IsobridgeIsolate
}

/// Create a bridged isolate from JSON options
///
/// # Arguments
/// * `callback` - Host callback (may be NULL)
/// * `options_json` - `IsolateOptions` as JSON, e.g. `{"limits":{"max_heap_objects":1000}}`
/// * `error` - Out-parameter for parse errors
///
/// # Safety
/// The returned isolate must be freed with `isobridge_isolate_dispose()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_isolate_new_with_options(
    callback: Option<IsobridgeHostCallback>,
    options_json: *const c_char,
    error: *mut *mut IsobridgeError,
) -> *mut IsobridgeIsolate {
    let json = match c_to_str(options_json) {
        Ok(json) => json,
        Err(err) => {
            set_error(error, &err);
            return ptr::null_mut();
        }
    };
    let options = match IsolateOptions::from_json(json) {
        Ok(options) => options,
        Err(err) => {
            set_error_str(error, &err.to_string());
            return ptr::null_mut();
        }
    };
    let host = match callback {
        Some(callback) => HostIsolate::new(options, CHostCallback { callback }),
        None => HostIsolate::new(options, NoopHostCallback),
    };
    Box::into_raw(Box::new(IsolateHandle { host })) as *mut IsobridgeIsolate
}

/// Dispose an isolate, tearing down every context
///
/// # Safety
/// - Isolate pointer must be valid (created by `isobridge_isolate_new*()`)
/// - Isolate must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn isobridge_isolate_dispose(iso: *mut IsobridgeIsolate) {
    if iso.is_null() {
        return;
    }
    let handle = Box::from_raw(iso as *mut IsolateHandle);
    drop(handle);
}

/// Create a context
///
/// # Returns
/// * The context's `ctx_ref` (>= 1), or -1 on error
///
/// # Safety
/// Isolate pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_context_new(
    iso: *mut IsobridgeIsolate,
    error: *mut *mut IsobridgeError,
) -> c_int {
    let Some(host) = host(iso) else {
        set_error_str(error, "null pointer");
        return -1;
    };
    match host.create_context() {
        Ok(ctx_ref) => ctx_ref.as_i32(),
        Err(err) => {
            set_error(error, &err);
            -1
        }
    }
}

/// Tear down a context and release all of its values
///
/// # Returns
/// * 1 on success, 0 if the context is unknown
///
/// # Safety
/// Isolate pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_context_free(iso: *mut IsobridgeIsolate, ctx_ref: c_int) -> c_int {
    match host(iso) {
        Some(host) => host.dispose_context(CtxRef(ctx_ref)).is_ok() as c_int,
        None => 0,
    }
}

// ============================================================================
// Template Functions
// ============================================================================

/// Create a function template bound to `callback_ref`
///
/// # Safety
/// - Isolate pointer must be valid
/// - The returned template must be freed with `isobridge_template_free()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_new_function_template(
    iso: *mut IsobridgeIsolate,
    callback_ref: c_int,
) -> *mut IsobridgeTemplate {
    let Some(host) = host(iso) else {
        return ptr::null_mut();
    };
    let template = host.new_function_template(CallbackRef(callback_ref));
    Box::into_raw(Box::new(TemplateHandle { template })) as *mut IsobridgeTemplate
}

/// Get the function of a function template in a context
///
/// # Safety
/// Isolate and template pointers must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_function_template_get_function(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
    ctx_ref: c_int,
) -> RtnValue {
    match (host(iso), template(tmpl)) {
        (Some(host), Some(template)) => {
            rtn(host.function_template_get_function(template, CtxRef(ctx_ref)))
        }
        _ => rtn_invalid(),
    }
}

/// Create an object template
///
/// # Safety
/// - Isolate pointer must be valid
/// - The returned template must be freed with `isobridge_template_free()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_new_object_template(
    iso: *mut IsobridgeIsolate,
) -> *mut IsobridgeTemplate {
    let Some(host) = host(iso) else {
        return ptr::null_mut();
    };
    let template = host.new_object_template();
    Box::into_raw(Box::new(TemplateHandle { template })) as *mut IsobridgeTemplate
}

/// Instantiate an object template in a context
///
/// # Safety
/// Isolate and template pointers must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_template_new_instance(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
    ctx_ref: c_int,
) -> RtnValue {
    match (host(iso), template(tmpl)) {
        (Some(host), Some(template)) => rtn(host.instantiate(template, CtxRef(ctx_ref))),
        _ => rtn_invalid(),
    }
}

/// Set the internal field count of an object template
///
/// # Safety
/// Isolate and template pointers must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_template_set_internal_field_count(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
    count: c_int,
    error: *mut *mut IsobridgeError,
) {
    let (Some(host), Some(template)) = (host(iso), template(tmpl)) else {
        set_error_str(error, "null pointer");
        return;
    };
    if let Err(err) = host.set_internal_field_count(template, count.max(0) as usize) {
        set_error(error, &err);
    }
}

/// Internal field count of an object template
///
/// # Returns
/// * The count, or -1 for a null pointer or a function template
///
/// # Safety
/// Isolate and template pointers must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_template_internal_field_count(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
) -> c_int {
    match (host(iso), template(tmpl)) {
        (Some(host), Some(template)) => host
            .internal_field_count(template)
            .map_or(-1, |count| count as c_int),
        _ => -1,
    }
}

/// Add an accessor property. `getter` and `setter` may be NULL.
///
/// # Safety
/// - Isolate and template pointers must be valid
/// - `key` must be a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_template_set_accessor_property(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
    key: *const c_char,
    getter: *const IsobridgeTemplate,
    setter: *const IsobridgeTemplate,
    attributes: c_int,
    error: *mut *mut IsobridgeError,
) {
    let (Some(host), Some(template)) = (host(iso), template(tmpl)) else {
        set_error_str(error, "null pointer");
        return;
    };
    let key = match c_to_str(key) {
        Ok(key) => key,
        Err(err) => {
            set_error(error, &err);
            return;
        }
    };
    let attributes = PropertyAttribute::from_bits_truncate(attributes as u32);
    if let Err(err) =
        host.set_accessor_property(template, key, self::template(getter), self::template(setter), attributes)
    {
        set_error(error, &err);
    }
}

/// Install an indexed-property getter bound to `callback_ref`
///
/// # Safety
/// Isolate and template pointers must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_template_set_index_handler(
    iso: *mut IsobridgeIsolate,
    tmpl: *const IsobridgeTemplate,
    callback_ref: c_int,
    error: *mut *mut IsobridgeError,
) {
    let (Some(host), Some(template)) = (host(iso), template(tmpl)) else {
        set_error_str(error, "null pointer");
        return;
    };
    if let Err(err) = host.set_indexed_handler(template, CallbackRef(callback_ref)) {
        set_error(error, &err);
    }
}

/// Free a template handle. The engine template lives as long as its isolate.
///
/// # Safety
/// - Template pointer must be valid (created by this API)
/// - Template must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn isobridge_template_free(tmpl: *mut IsobridgeTemplate) {
    if tmpl.is_null() {
        return;
    }
    let _ = Box::from_raw(tmpl as *mut TemplateHandle);
}

// ============================================================================
// Symbol Functions
// ============================================================================

/// The isolate's well-known symbol for `index` (1..=11)
///
/// # Safety
/// Isolate pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_builtin_symbol(iso: *mut IsobridgeIsolate, index: c_int) -> RtnValue {
    match host(iso) {
        Some(host) => rtn(host.builtin_symbol_by_index(index)),
        None => rtn_invalid(),
    }
}

/// Description of a symbol
///
/// # Returns
/// * Newly allocated string, or NULL if the value is not a live symbol
///
/// # Safety
/// - Isolate pointer must be valid
/// - The returned string must be freed with `isobridge_string_free()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_symbol_description(
    iso: *mut IsobridgeIsolate,
    value: ValueRef,
) -> *mut c_char {
    match host(iso).map(|host| host.symbol_description(value)) {
        Some(Ok(description)) => rust_to_c_string(&description),
        _ => ptr::null_mut(),
    }
}

// ============================================================================
// Value Functions
// ============================================================================

/// Release a tracked value. Releasing twice is a no-op.
///
/// # Safety
/// Isolate pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_value_release(iso: *mut IsobridgeIsolate, value: ValueRef) {
    if let Some(host) = host(iso) {
        host.release(value);
    }
}

/// Create a string value in a context
///
/// # Safety
/// - Isolate pointer must be valid
/// - `s` must be a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn isobridge_new_string(
    iso: *mut IsobridgeIsolate,
    ctx_ref: c_int,
    s: *const c_char,
) -> RtnValue {
    let Some(host) = host(iso) else {
        return rtn_invalid();
    };
    rtn(c_to_str(s).and_then(|s| host.scope(CtxRef(ctx_ref)).new_string(s)))
}

/// Create an `Error` object in a context
///
/// # Safety
/// - Isolate pointer must be valid
/// - `message` must be a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn isobridge_new_error(
    iso: *mut IsobridgeIsolate,
    ctx_ref: c_int,
    message: *const c_char,
) -> RtnValue {
    let Some(host) = host(iso) else {
        return rtn_invalid();
    };
    rtn(c_to_str(message).and_then(|m| host.scope(CtxRef(ctx_ref)).new_error(m)))
}

/// String conversion of a value
///
/// # Returns
/// * Newly allocated string, or NULL if the value does not resolve
///
/// # Safety
/// - Isolate pointer must be valid
/// - The returned string must be freed with `isobridge_string_free()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_value_to_string(
    iso: *mut IsobridgeIsolate,
    value: ValueRef,
) -> *mut c_char {
    match host(iso).map(|host| host.scope(value.ctx_ref).value_to_string(value)) {
        Some(Ok(s)) => rust_to_c_string(&s),
        _ => ptr::null_mut(),
    }
}

/// Indexed read (runs indexed interceptors)
///
/// # Safety
/// Isolate pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_object_get_index(
    iso: *mut IsobridgeIsolate,
    ctx_ref: c_int,
    object: ValueRef,
    index: u32,
) -> RtnValue {
    match host(iso) {
        Some(host) => rtn(host.scope(CtxRef(ctx_ref)).get_index(object, index)),
        None => rtn_invalid(),
    }
}

/// Call a function. A null `recv` calls with the global object as `this`.
///
/// # Safety
/// - Isolate pointer must be valid
/// - `args` must point to `arg_count` values (may be NULL when 0)
#[no_mangle]
pub unsafe extern "C" fn isobridge_function_call(
    iso: *mut IsobridgeIsolate,
    ctx_ref: c_int,
    function: ValueRef,
    recv: ValueRef,
    args: *const ValueRef,
    arg_count: usize,
) -> RtnValue {
    let Some(host) = host(iso) else {
        return rtn_invalid();
    };
    let args: &[ValueRef] = if args.is_null() || arg_count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(args, arg_count)
    };
    rtn(host.scope(CtxRef(ctx_ref)).call(function, recv, args))
}

// ============================================================================
// Inspector Functions
// ============================================================================

/// Create an inspector client. Console messages go to `callback` tagged
/// with `callback_ref`.
///
/// # Safety
/// The returned client must be freed with `isobridge_inspector_client_delete()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_client_new(
    callback_ref: c_int,
    callback: IsobridgeConsoleCallback,
) -> *mut IsobridgeInspectorClient {
    let callback_ref = CallbackRef(callback_ref);
    let clients = Arc::new(ClientRegistry::new());
    let client = InspectorClient::with_ref(
        &clients,
        callback_ref,
        CConsoleHandler {
            callback_ref,
            callback,
        },
    );
    Box::into_raw(Box::new(ClientHandle { clients, client })) as *mut IsobridgeInspectorClient
}

/// Delete an inspector client. Inspectors using it stop delivering.
///
/// # Safety
/// - Client pointer must be valid
/// - Client must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_client_delete(client: *mut IsobridgeInspectorClient) {
    if client.is_null() {
        return;
    }
    let handle = Box::from_raw(client as *mut ClientHandle);
    handle.client.dispose(&handle.clients);
}

/// Attach an inspector to an isolate
///
/// # Safety
/// - Isolate and client pointers must be valid
/// - The returned inspector must be freed with `isobridge_inspector_delete()`
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_create(
    iso: *mut IsobridgeIsolate,
    client: *const IsobridgeInspectorClient,
) -> *mut IsobridgeInspector {
    let Some(host) = host(iso) else {
        return ptr::null_mut();
    };
    if client.is_null() {
        return ptr::null_mut();
    }
    let client = &*(client as *const ClientHandle);
    let inspector = Inspector::new(host, client.clients.clone(), client.client.callback_ref());
    Box::into_raw(Box::new(InspectorHandle { inspector })) as *mut IsobridgeInspector
}

/// Delete an inspector
///
/// # Safety
/// - Inspector pointer must be valid
/// - Inspector must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_delete(inspector: *mut IsobridgeInspector) {
    if inspector.is_null() {
        return;
    }
    let _ = Box::from_raw(inspector as *mut InspectorHandle);
}

/// Report a context to the inspector
///
/// # Safety
/// Inspector pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_context_created(
    inspector: *mut IsobridgeInspector,
    ctx_ref: c_int,
) {
    if !inspector.is_null() {
        (*(inspector as *const InspectorHandle))
            .inspector
            .context_created(CtxRef(ctx_ref));
    }
}

/// Remove a context from the inspector
///
/// # Safety
/// Inspector pointer must be valid
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_context_destroyed(
    inspector: *mut IsobridgeInspector,
    ctx_ref: c_int,
) {
    if !inspector.is_null() {
        (*(inspector as *const InspectorHandle))
            .inspector
            .context_destroyed(CtxRef(ctx_ref));
    }
}

/// Emit a console message from a context
///
/// # Returns
/// * 1 if a client received it, 0 otherwise
///
/// # Safety
/// - Inspector pointer must be valid
/// - `message` must be a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn isobridge_inspector_console_message(
    inspector: *mut IsobridgeInspector,
    ctx_ref: c_int,
    level: c_int,
    message: *const c_char,
) -> c_int {
    if inspector.is_null() {
        return 0;
    }
    let (Some(level), Ok(message)) = (MessageErrorLevel::from_i32(level), c_to_str(message)) else {
        return 0;
    };
    let inspector = &(*(inspector as *const InspectorHandle)).inspector;
    inspector.console_api_message(CtxRef(ctx_ref), ConsoleApiMessage::new(level, message)) as c_int
}

// ============================================================================
// Error and String Functions
// ============================================================================

/// Error message
///
/// # Safety
/// Error pointer must be valid; the string is owned by the error
#[no_mangle]
pub unsafe extern "C" fn isobridge_error_message(error: *const IsobridgeError) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }
    (*error).message
}

/// Error location (NULL when absent)
///
/// # Safety
/// Error pointer must be valid; the string is owned by the error
#[no_mangle]
pub unsafe extern "C" fn isobridge_error_location(error: *const IsobridgeError) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }
    (*error).location
}

/// Error stack trace (NULL when absent)
///
/// # Safety
/// Error pointer must be valid; the string is owned by the error
#[no_mangle]
pub unsafe extern "C" fn isobridge_error_stack(error: *const IsobridgeError) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }
    (*error).stack
}

/// Free an error
///
/// # Safety
/// - Error pointer must be valid (created by this API)
/// - Error must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn isobridge_error_free(error: *mut IsobridgeError) {
    if error.is_null() {
        return;
    }
    free_c_string((*error).message);
    free_c_string((*error).location);
    free_c_string((*error).stack);
    let _ = Box::from_raw(error);
}

/// Free a string returned by this API
///
/// # Safety
/// String must have been returned by this API and not freed before
#[no_mangle]
pub unsafe extern "C" fn isobridge_string_free(s: *mut c_char) {
    free_c_string(s);
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the isobridge version string
///
/// # Safety
/// - The returned string is a static string and must not be freed
#[no_mangle]
pub unsafe extern "C" fn isobridge_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// Tests
// ============================================================================
