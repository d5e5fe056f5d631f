//! BridgeContext trait: engine operations available to host handlers
//!
//! A host handler runs on the engine's call stack with the isolate lock held.
//! It must not touch native handles directly; everything it needs goes
//! through this trait, which the engine implements for the duration of one
//! callback. Values created here are tracked in the calling context.

use crate::error::BridgeResult;
use crate::types::PropertyAttribute;
use crate::value::{CtxRef, ValueRef};

/// Abstract engine access for host handlers.
pub trait BridgeContext {
    /// Context the current callback executes in
    fn ctx_ref(&self) -> CtxRef;

    // ========================================================================
    // Value Creation
    // ========================================================================

    /// `undefined`
    fn undefined(&self) -> BridgeResult<ValueRef>;

    /// `null`
    fn null(&self) -> BridgeResult<ValueRef>;

    /// A boolean
    fn new_boolean(&self, b: bool) -> BridgeResult<ValueRef>;

    /// A number
    fn new_number(&self, n: f64) -> BridgeResult<ValueRef>;

    /// A string
    fn new_string(&self, s: &str) -> BridgeResult<ValueRef>;

    /// A plain object
    fn new_object(&self) -> BridgeResult<ValueRef>;

    /// An `Error` object carrying `message`
    fn new_error(&self, message: &str) -> BridgeResult<ValueRef>;

    // ========================================================================
    // Value Reading
    // ========================================================================

    /// String conversion of any value
    fn value_to_string(&self, value: ValueRef) -> BridgeResult<String>;

    /// Numeric payload, if the value is a number
    fn number_value(&self, value: ValueRef) -> BridgeResult<Option<f64>>;

    /// Identity/strict equality of two values
    fn strict_equals(&self, a: ValueRef, b: ValueRef) -> BridgeResult<bool>;

    // ========================================================================
    // Object Operations
    // ========================================================================

    /// Named property read
    fn get(&self, object: ValueRef, key: &str) -> BridgeResult<ValueRef>;

    /// Named property write; `false` when the write was ignored
    fn set(&self, object: ValueRef, key: &str, value: ValueRef) -> BridgeResult<bool>;

    /// Indexed read
    fn get_index(&self, object: ValueRef, index: u32) -> BridgeResult<ValueRef>;

    /// Indexed write
    fn set_index(&self, object: ValueRef, index: u32, value: ValueRef) -> BridgeResult<bool>;

    /// Attribute flags of an own named property; `None` when absent
    fn property_attributes(
        &self,
        object: ValueRef,
        key: &str,
    ) -> BridgeResult<Option<PropertyAttribute>>;

    /// Enumerable own string-named keys in sorted order
    fn own_keys(&self, object: ValueRef) -> BridgeResult<Vec<String>>;

    /// Number of internal fields the object carries
    fn internal_field_count(&self, object: ValueRef) -> BridgeResult<usize>;

    /// Read an internal field
    fn internal_field(&self, object: ValueRef, index: usize) -> BridgeResult<ValueRef>;

    /// Write an internal field
    fn set_internal_field(&self, object: ValueRef, index: usize, value: ValueRef)
        -> BridgeResult<()>;

    // ========================================================================
    // Function Execution
    // ========================================================================

    /// Call `function` with `recv` as `this` (synchronous, re-entrant)
    fn call(&self, function: ValueRef, recv: ValueRef, args: &[ValueRef]) -> BridgeResult<ValueRef>;

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Release a tracked value; no-op if already released
    fn release(&self, value: ValueRef);
}
