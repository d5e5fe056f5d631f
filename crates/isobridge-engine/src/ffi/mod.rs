//! C bindings
//!
//! This module provides the C ABI over [`crate::bridge::HostIsolate`]:
//! isolate and context lifecycle, the template builder, builtin symbols,
//! a handful of value operations for driving scripts from C, and the
//! inspector.

pub mod c_api;

// Re-export C API types
pub use c_api::{
    isobridge_builtin_symbol, isobridge_context_free, isobridge_context_new,
    isobridge_error_free, isobridge_error_location, isobridge_error_message,
    isobridge_error_stack, isobridge_function_call, isobridge_function_template_get_function,
    isobridge_inspector_client_delete, isobridge_inspector_client_new,
    isobridge_inspector_console_message, isobridge_inspector_context_created,
    isobridge_inspector_context_destroyed, isobridge_inspector_create, isobridge_inspector_delete,
    isobridge_isolate_dispose, isobridge_isolate_new, isobridge_isolate_new_with_options,
    isobridge_new_error, isobridge_new_function_template, isobridge_new_object_template,
    isobridge_new_string, isobridge_object_get_index,
    isobridge_object_template_internal_field_count, isobridge_object_template_new_instance,
    isobridge_object_template_set_accessor_property, isobridge_object_template_set_index_handler,
    isobridge_object_template_set_internal_field_count, isobridge_string_free,
    isobridge_symbol_description, isobridge_template_free, isobridge_value_release,
    isobridge_value_to_string, isobridge_version, CallbackReturn, IsobridgeConsoleCallback,
    IsobridgeError, IsobridgeHostCallback, IsobridgeInspector, IsobridgeInspectorClient,
    IsobridgeIsolate, IsobridgeTemplate, RtnValue, ISOBRIDGE_NO_INDEX,
};
