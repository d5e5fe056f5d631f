//! Inspector interface
//!
//! An [`Inspector`] attaches to one isolate, tracks which contexts are
//! visible to it, and forwards console API messages to an
//! [`InspectorClient`]. Clients are named across the boundary by an integer
//! reference held in a [`Registry`]; the inspector only stores that
//! reference and looks the client up per message.

use crate::bridge::HostIsolate;
use crate::native::IsolateId;
use isobridge_sdk::{CallbackRef, CtxRef};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// ============================================================================
// Registry
// ============================================================================

/// Integer-keyed registry for handing host objects across the boundary
pub struct Registry<T> {
    entries: RwLock<FxHashMap<i32, T>>,
    next_id: AtomicI32,
}

impl<T: Clone> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            next_id: AtomicI32::new(1),
        }
    }

    /// Register under a fresh id
    pub fn register(&self, entry: T) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(id, entry);
        id
    }

    /// Register under a caller-chosen id, replacing any previous entry
    pub fn register_as(&self, id: i32, entry: T) -> Option<T> {
        self.entries.write().insert(id, entry)
    }

    /// Remove an entry
    pub fn unregister(&self, id: i32) -> Option<T> {
        self.entries.write().remove(&id)
    }

    /// Look up an entry
    pub fn get(&self, id: i32) -> Option<T> {
        self.entries.read().get(&id).cloned()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Console Messages
// ============================================================================

/// Console message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum MessageErrorLevel {
    /// `console.log`
    Log = 1,
    /// `console.debug`
    Debug = 2,
    /// `console.info`
    Info = 4,
    /// `console.error`
    Error = 8,
    /// `console.warn`
    Warning = 16,
}

impl MessageErrorLevel {
    /// Parse the ABI value
    pub fn from_i32(level: i32) -> Option<Self> {
        match level {
            1 => Some(MessageErrorLevel::Log),
            2 => Some(MessageErrorLevel::Debug),
            4 => Some(MessageErrorLevel::Info),
            8 => Some(MessageErrorLevel::Error),
            16 => Some(MessageErrorLevel::Warning),
            _ => None,
        }
    }
}

/// A console API call observed by the inspector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleApiMessage {
    /// Context group the message came from
    pub context_group_id: i32,
    /// Severity
    pub error_level: MessageErrorLevel,
    /// Message text
    pub message: String,
    /// Script URL
    #[serde(default)]
    pub url: String,
    /// 1-based line
    #[serde(default)]
    pub line_number: u32,
    /// 1-based column
    #[serde(default)]
    pub column_number: u32,
}

impl ConsoleApiMessage {
    /// Message without source position
    pub fn new(error_level: MessageErrorLevel, message: impl Into<String>) -> Self {
        Self {
            context_group_id: 0,
            error_level,
            message: message.into(),
            url: String::new(),
            line_number: 0,
            column_number: 0,
        }
    }
}

/// Receives console messages
pub trait ConsoleApiMessageHandler: Send + Sync {
    /// Handle one message
    fn console_api_message(&self, message: &ConsoleApiMessage);
}

impl<F> ConsoleApiMessageHandler for F
where
    F: Fn(&ConsoleApiMessage) + Send + Sync,
{
    fn console_api_message(&self, message: &ConsoleApiMessage) {
        self(message)
    }
}

// ============================================================================
// Inspector Client
// ============================================================================

/// Clients addressable by reference
pub type ClientRegistry = Registry<Arc<InspectorClient>>;

/// Host-side receiver of inspector events
pub struct InspectorClient {
    callback_ref: CallbackRef,
    handler: Box<dyn ConsoleApiMessageHandler>,
}

impl InspectorClient {
    /// Create a client and register it under a fresh reference
    pub fn new(
        clients: &ClientRegistry,
        handler: impl ConsoleApiMessageHandler + 'static,
    ) -> Arc<Self> {
        let id = clients.next_id.fetch_add(1, Ordering::Relaxed);
        Self::with_ref(clients, CallbackRef(id), handler)
    }

    /// Create a client under a host-chosen reference
    pub fn with_ref(
        clients: &ClientRegistry,
        callback_ref: CallbackRef,
        handler: impl ConsoleApiMessageHandler + 'static,
    ) -> Arc<Self> {
        let client = Arc::new(Self {
            callback_ref,
            handler: Box::new(handler),
        });
        clients.register_as(callback_ref.as_i32(), client.clone());
        client
    }

    /// The client's reference
    pub fn callback_ref(&self) -> CallbackRef {
        self.callback_ref
    }

    /// Remove the client from `clients`; later messages for it are dropped
    pub fn dispose(&self, clients: &ClientRegistry) {
        clients.unregister(self.callback_ref.as_i32());
    }

    fn deliver(&self, message: &ConsoleApiMessage) {
        self.handler.console_api_message(message);
    }
}

// ============================================================================
// Inspector
// ============================================================================

/// Inspector attached to one isolate
pub struct Inspector {
    isolate: IsolateId,
    client_ref: CallbackRef,
    clients: Arc<ClientRegistry>,
    contexts: Mutex<FxHashSet<CtxRef>>,
}

impl Inspector {
    /// Attach to `host`, reporting to the client registered as `client_ref`
    pub fn new(host: &HostIsolate, clients: Arc<ClientRegistry>, client_ref: CallbackRef) -> Self {
        tracing::debug!(isolate = host.id().as_u64(), %client_ref, "inspector attached");
        Self {
            isolate: host.id(),
            client_ref,
            clients,
            contexts: Mutex::new(FxHashSet::default()),
        }
    }

    /// Isolate this inspector is attached to
    pub fn isolate(&self) -> IsolateId {
        self.isolate
    }

    /// Make a context visible to the inspector
    pub fn context_created(&self, ctx_ref: CtxRef) {
        self.contexts.lock().insert(ctx_ref);
    }

    /// Forget a context
    pub fn context_destroyed(&self, ctx_ref: CtxRef) {
        self.contexts.lock().remove(&ctx_ref);
    }

    /// Contexts currently visible, ascending
    pub fn contexts(&self) -> Vec<CtxRef> {
        let mut contexts: Vec<CtxRef> = self.contexts.lock().iter().copied().collect();
        contexts.sort();
        contexts
    }

    /// Forward a console message raised in `ctx_ref`. Returns whether a
    /// client received it.
    pub fn console_api_message(&self, ctx_ref: CtxRef, mut message: ConsoleApiMessage) -> bool {
        if !self.contexts.lock().contains(&ctx_ref) {
            tracing::trace!(%ctx_ref, "console message from an uninspected context");
            return false;
        }
        let Some(client) = self.clients.get(self.client_ref.as_i32()) else {
            tracing::warn!(client_ref = %self.client_ref, "inspector client is gone");
            return false;
        };
        message.context_group_id = ctx_ref.as_i32();
        client.deliver(&message);
        true
    }
}

impl Drop for Inspector {
    fn drop(&mut self) {
        tracing::debug!(isolate = self.isolate.as_u64(), "inspector detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobridge_sdk::NoopHostCallback;

    fn collecting_client(
        clients: &ClientRegistry,
    ) -> (Arc<InspectorClient>, Arc<Mutex<Vec<ConsoleApiMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let client = InspectorClient::new(clients, move |message: &ConsoleApiMessage| {
            sink.lock().push(message.clone());
        });
        (client, seen)
    }

    #[test]
    fn test_registry_ids_start_at_one() {
        let registry: Registry<&'static str> = Registry::new();
        assert_eq!(registry.register("a"), 1);
        assert_eq!(registry.register("b"), 2);
        assert_eq!(registry.get(1), Some("a"));
        assert_eq!(registry.unregister(1), Some("a"));
        assert_eq!(registry.get(1), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_messages_reach_the_client() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let ctx = host.create_context().unwrap();
        let clients = Arc::new(ClientRegistry::new());
        let (client, seen) = collecting_client(&clients);

        let inspector = Inspector::new(&host, clients.clone(), client.callback_ref());
        assert!(!inspector.console_api_message(ctx, ConsoleApiMessage::new(MessageErrorLevel::Log, "early")));

        inspector.context_created(ctx);
        assert_eq!(inspector.contexts(), vec![ctx]);
        assert!(inspector.console_api_message(ctx, ConsoleApiMessage::new(MessageErrorLevel::Info, "Hello")));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "Hello");
        assert_eq!(seen[0].context_group_id, ctx.as_i32());
    }

    #[test]
    fn test_disposed_client_drops_messages() {
        let host = HostIsolate::with_host(NoopHostCallback);
        let ctx = host.create_context().unwrap();
        let clients = Arc::new(ClientRegistry::new());
        let (client, seen) = collecting_client(&clients);
        let inspector = Inspector::new(&host, clients.clone(), client.callback_ref());
        inspector.context_created(ctx);

        client.dispose(&clients);
        assert!(clients.is_empty());
        assert!(!inspector.console_api_message(ctx, ConsoleApiMessage::new(MessageErrorLevel::Error, "lost")));
        assert!(seen.lock().is_empty());

        inspector.context_destroyed(ctx);
        assert!(inspector.contexts().is_empty());
    }

    #[test]
    fn test_message_json() {
        let message = ConsoleApiMessage::new(MessageErrorLevel::Warning, "careful");
        let json = serde_json::to_string(&message).unwrap();
        let back: ConsoleApiMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
        assert_eq!(MessageErrorLevel::from_i32(16), Some(MessageErrorLevel::Warning));
        assert_eq!(MessageErrorLevel::from_i32(3), None);
    }
}
