//! Boundary identifiers
//!
//! Everything that crosses the host/native boundary is plain data: integer
//! context references, integer callback references, and tracking ids. None of
//! these carry a pointer, so a host can store them, copy them, and hand them
//! back without ever touching a native handle.

use std::fmt;

/// Integer reference naming a context within one isolate.
///
/// Stored in the context's embedder-data slot so a native callback can
/// recover it from the executing context alone. `0` names the isolate's
/// internal context; user contexts start at `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct CtxRef(pub i32);

impl CtxRef {
    /// The isolate's internal context, used for isolate-scoped values
    pub const INTERNAL: CtxRef = CtxRef(0);

    /// Get the raw integer
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Whether this names the internal context
    #[inline]
    pub const fn is_internal(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CtxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque integer identifying a host-side handler.
///
/// This is the only closure state that survives a native callback. All real
/// state lives host-side, indexed by this token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CallbackRef(pub i32);

impl CallbackRef {
    /// Get the raw integer
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-context tracking id of a registered value.
///
/// `0` means "not registered". Ids are allocated monotonically per context
/// and never reused, so a released id can never alias a newer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TrackingId(pub u64);

impl TrackingId {
    /// The unregistered id
    pub const NONE: TrackingId = TrackingId(0);

    /// Get the raw integer
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this id was issued by a tracking table
    #[inline]
    pub const fn is_registered(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracked reference to an engine value, safe to hand across the boundary.
///
/// A `ValueRef` is the only way a host names a value. It resolves through the
/// owning context's tracking table; once released (or once the context is torn
/// down) it resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct ValueRef {
    /// Context whose table owns the value
    pub ctx_ref: CtxRef,
    /// Id within that table
    pub id: TrackingId,
}

impl ValueRef {
    /// The null reference (no value)
    pub const NULL: ValueRef = ValueRef {
        ctx_ref: CtxRef(0),
        id: TrackingId(0),
    };

    /// Create a reference
    #[inline]
    pub const fn new(ctx_ref: CtxRef, id: TrackingId) -> Self {
        Self { ctx_ref, id }
    }

    /// Whether this is the null reference
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.id.0 == 0
    }

    /// `None` for the null reference
    #[inline]
    pub fn non_null(self) -> Option<ValueRef> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.ctx_ref, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_value_ref() {
        assert!(ValueRef::NULL.is_null());
        assert!(ValueRef::default().is_null());
        assert_eq!(ValueRef::NULL.non_null(), None);

        let v = ValueRef::new(CtxRef(1), TrackingId(3));
        assert!(!v.is_null());
        assert_eq!(v.non_null(), Some(v));
    }

    #[test]
    fn test_null_requires_zero_id_only() {
        // A zero id is null regardless of the context it names
        let v = ValueRef::new(CtxRef(4), TrackingId::NONE);
        assert!(v.is_null());
    }

    #[test]
    fn test_display() {
        let v = ValueRef::new(CtxRef(2), TrackingId(17));
        assert_eq!(v.to_string(), "2#17");
        assert_eq!(CallbackRef(7).to_string(), "7");
    }

    #[test]
    fn test_internal_ctx_ref() {
        assert!(CtxRef::INTERNAL.is_internal());
        assert!(!CtxRef(1).is_internal());
        assert!(!TrackingId::NONE.is_registered());
        assert!(TrackingId(1).is_registered());
    }
}
