//! Isolate configuration

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an isolate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsolateId(u64);

impl IsolateId {
    /// Generate a new unique isolate ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for IsolateId {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource limits for an isolate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of live heap objects (None = unlimited)
    pub max_heap_objects: Option<usize>,
}

impl ResourceLimits {
    /// Create unlimited resource limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Create resource limits with a heap object cap
    pub fn with_heap_limit(max_heap_objects: usize) -> Self {
        Self {
            max_heap_objects: Some(max_heap_objects),
        }
    }
}

/// Options for creating an isolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolateOptions {
    /// Resource limits
    pub limits: ResourceLimits,

    /// Embedder-data slots per context
    pub embedder_slots: usize,
}

impl Default for IsolateOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            embedder_slots: 2,
        }
    }
}

impl IsolateOptions {
    /// Options with the given limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let options: IsolateOptions = serde_json::from_str(json)?;
        if options.limits.max_heap_objects == Some(0) {
            return Err(EngineError::Options(
                "max_heap_objects must be at least 1".to_string(),
            ));
        }
        Ok(options)
    }
}
