//! Isolate and isolate lock
//!
//! An [`Isolate`] owns a heap, its templates and contexts. All access goes
//! through a [`Locker`], an exclusive lock that the owning thread may take
//! again while it already holds it (native callbacks re-enter the engine on
//! the same call stack).
//!
//! Operations that can throw follow the engine convention: they return
//! `None` and leave the exception pending. A [`TryCatch`] scope picks it up.
//!
//! [`TryCatch`]: super::scope::TryCatch

use super::context::{Context, ContextData};
use super::heap::{ErrorKind, Heap, HeapObject, HeapStats, ObjectKind, Property};
use super::options::{IsolateId, IsolateOptions};
use super::scope::ContextScope;
use super::template::{
    AccessorSpec, FunctionCallback, FunctionCallbackInfo, IndexedPropertyHandlerConfiguration,
    Intercepted, PropertyCallbackInfo, TemplateData, TemplateId, TemplateKind,
};
use super::value::{number_to_string, ObjectId, PropertyKey, SymbolId, Value};
use isobridge_sdk::{PropertyAttribute, SymbolIndex};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::sync::{Arc, Weak};

// ============================================================================
// Isolate
// ============================================================================

/// An engine isolate. Cloning yields another handle to the same isolate.
#[derive(Clone)]
pub struct Isolate {
    pub(crate) inner: Arc<IsolateInner>,
}

pub(crate) struct IsolateInner {
    id: IsolateId,
    options: IsolateOptions,
    state: ReentrantMutex<RefCell<IsolateState>>,
    slots: Mutex<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Isolate {
    /// Create an isolate
    pub fn new(options: IsolateOptions) -> Self {
        let id = IsolateId::new();
        let state = IsolateState::new(&options);
        tracing::debug!(isolate = id.as_u64(), ?options, "isolate created");
        Self {
            inner: Arc::new(IsolateInner {
                id,
                options,
                state: ReentrantMutex::new(RefCell::new(state)),
                slots: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// Isolate id
    pub fn id(&self) -> IsolateId {
        self.inner.id
    }

    /// Options the isolate was created with
    pub fn options(&self) -> &IsolateOptions {
        &self.inner.options
    }

    /// Take the isolate lock. Re-entrant on the owning thread.
    pub fn lock(&self) -> Locker<'_> {
        Locker {
            isolate: self,
            guard: self.inner.state.lock(),
        }
    }

    /// Store embedder state on the isolate, one value per type
    pub fn set_slot<T: Any + Send + Sync>(&self, value: Arc<T>) {
        self.inner.slots.lock().insert(TypeId::of::<T>(), value);
    }

    /// Fetch embedder state stored with [`Isolate::set_slot`]
    pub fn get_slot<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self.inner.slots.lock().get(&TypeId::of::<T>()).cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Remove embedder state
    pub fn remove_slot<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self.inner.slots.lock().remove(&TypeId::of::<T>())?;
        slot.downcast::<T>().ok()
    }

    pub(crate) fn downgrade(&self) -> Weak<IsolateInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<IsolateInner>) -> Self {
        Self { inner }
    }
}

impl Default for Isolate {
    fn default() -> Self {
        Self::new(IsolateOptions::default())
    }
}

impl fmt::Debug for Isolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isolate").field("id", &self.inner.id).finish()
    }
}

// ============================================================================
// Isolate State
// ============================================================================

pub(crate) struct IsolateState {
    heap: Heap,
    symbols: Vec<Arc<str>>,
    well_known: Vec<SymbolId>,
    templates: Vec<TemplateData>,
    contexts: FxHashMap<Context, ContextData>,
    next_context: u32,
    persistents: Vec<Option<Value>>,
    free_persistents: Vec<usize>,
    local_roots: Vec<Value>,
    entered: Vec<Context>,
    pending_exception: Option<Value>,
    embedder_slots: usize,
}

impl IsolateState {
    fn new(options: &IsolateOptions) -> Self {
        let mut symbols = Vec::with_capacity(SymbolIndex::ALL.len());
        let mut well_known = Vec::with_capacity(SymbolIndex::ALL.len());
        for index in SymbolIndex::ALL {
            well_known.push(SymbolId(symbols.len() as u32));
            symbols.push(Arc::from(index.description()));
        }

        Self {
            heap: Heap::new(options.limits.max_heap_objects),
            symbols,
            well_known,
            templates: Vec::new(),
            contexts: FxHashMap::default(),
            next_context: 1,
            persistents: Vec::new(),
            free_persistents: Vec::new(),
            local_roots: Vec::new(),
            entered: Vec::new(),
            pending_exception: None,
            embedder_slots: options.embedder_slots,
        }
    }

    fn root_local(&mut self, value: &Value) {
        if let Value::Object(_) = value {
            self.local_roots.push(value.clone());
        }
    }

    /// Allocate under the heap limit; throws `RangeError` when it is hit
    fn allocate(&mut self, object: HeapObject) -> Option<ObjectId> {
        match self.heap.allocate(object) {
            Some(id) => {
                self.local_roots.push(Value::Object(id));
                Some(id)
            }
            None => {
                tracing::warn!(stats = ?self.heap.stats(), "heap object limit reached");
                self.throw_error(ErrorKind::RangeError, "Heap object limit exceeded");
                None
            }
        }
    }

    fn new_error(&mut self, kind: ErrorKind, message: &str) -> ObjectId {
        let mut object = HeapObject::new(ObjectKind::Error(kind));
        let hidden = |value: Value| Property::Data {
            value,
            attributes: PropertyAttribute::DONT_ENUM,
        };
        let stack = format!("{}: {}\n    at <native>", kind.name(), message);
        object
            .properties
            .insert(PropertyKey::from("name"), hidden(Value::string(kind.name())));
        object
            .properties
            .insert(PropertyKey::from("message"), hidden(Value::string(message)));
        object
            .properties
            .insert(PropertyKey::from("stack"), hidden(Value::string(&stack)));

        let id = self.heap.allocate_unchecked(object);
        self.local_roots.push(Value::Object(id));
        id
    }

    fn throw_error(&mut self, kind: ErrorKind, message: &str) {
        let id = self.new_error(kind, message);
        self.pending_exception = Some(Value::Object(id));
    }

    fn require_context(&mut self, context: Context) -> Option<()> {
        if self.contexts.contains_key(&context) {
            Some(())
        } else {
            self.throw_error(ErrorKind::Error, "Context has been disposed");
            None
        }
    }

    /// Object behind `value`, or the result for a primitive receiver.
    /// `undefined`/`null` receivers throw.
    fn receiver(&mut self, value: &Value, access: &dyn fmt::Display) -> Result<ObjectId, Option<()>> {
        match value {
            Value::Object(id) => Ok(*id),
            Value::Undefined | Value::Null => {
                let message = format!(
                    "Cannot access property '{}' of {}",
                    access,
                    value.type_name()
                );
                self.throw_error(ErrorKind::TypeError, &message);
                Err(None)
            }
            _ => Err(Some(())),
        }
    }

    fn template(&self, template: TemplateId) -> Option<&TemplateData> {
        self.templates.get(template.0 as usize)
    }

    fn template_mut(&mut self, template: TemplateId) -> Option<&mut TemplateData> {
        self.templates.get_mut(template.0 as usize)
    }
}

fn data_string(object: &HeapObject, key: &str) -> Option<String> {
    match object.properties.get(&PropertyKey::from(key)) {
        Some(Property::Data {
            value: Value::String(s),
            ..
        }) => Some(s.to_string()),
        _ => None,
    }
}

// ============================================================================
// Locker
// ============================================================================

/// Proof that the current thread holds the isolate lock
pub struct Locker<'a> {
    isolate: &'a Isolate,
    guard: ReentrantMutexGuard<'a, RefCell<IsolateState>>,
}

impl<'a> Locker<'a> {
    /// The locked isolate
    pub fn isolate(&self) -> &'a Isolate {
        self.isolate
    }

    /// Borrow the isolate state. Never held across a callback.
    fn state(&self) -> RefMut<'_, IsolateState> {
        self.guard.borrow_mut()
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    /// Create a context with a fresh global object
    pub fn new_context(&self) -> Context {
        let mut guard = self.state();
        let st = &mut *guard;
        let context = Context(st.next_context);
        st.next_context += 1;
        let global = st.heap.allocate_unchecked(HeapObject::new(ObjectKind::Ordinary));
        st.contexts
            .insert(context, ContextData::new(global, st.embedder_slots));
        tracing::trace!(context = context.0, "context created");
        context
    }

    /// Discard a context. Its function instances are dropped from every
    /// template cache; the objects themselves go on the next collection.
    pub fn dispose_context(&self, context: Context) -> bool {
        let mut guard = self.state();
        let st = &mut *guard;
        if st.contexts.remove(&context).is_none() {
            return false;
        }
        for template in &mut st.templates {
            if let TemplateData::Function { instances, .. } = template {
                instances.remove(&context);
            }
        }
        tracing::trace!(context = context.0, "context disposed");
        true
    }

    /// Whether the context still exists
    pub fn context_is_alive(&self, context: Context) -> bool {
        self.state().contexts.contains_key(&context)
    }

    /// Number of live contexts
    pub fn context_count(&self) -> usize {
        self.state().contexts.len()
    }

    /// The context's global object
    pub fn context_global(&self, context: Context) -> Option<Value> {
        let st = self.state();
        st.contexts.get(&context).map(|c| Value::Object(c.global))
    }

    /// The innermost entered context
    pub fn current_context(&self) -> Option<Context> {
        self.state().entered.last().copied()
    }

    pub(crate) fn enter_context(&self, context: Context) {
        self.state().entered.push(context);
    }

    pub(crate) fn exit_context(&self) {
        self.state().entered.pop();
    }

    /// Write an embedder-data slot. `false` for an unknown context or slot.
    pub fn set_embedder_data(&self, context: Context, slot: usize, value: Value) -> bool {
        let mut st = self.state();
        match st
            .contexts
            .get_mut(&context)
            .and_then(|c| c.embedder_data.get_mut(slot))
        {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }

    /// Read an embedder-data slot
    pub fn embedder_data(&self, context: Context, slot: usize) -> Option<Value> {
        let st = self.state();
        st.contexts
            .get(&context)
            .and_then(|c| c.embedder_data.get(slot))
            .cloned()
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Create a function template
    pub fn new_function_template(&self, callback: Option<FunctionCallback>, data: Value) -> TemplateId {
        let mut st = self.state();
        let id = TemplateId(st.templates.len() as u32);
        st.templates.push(TemplateData::Function {
            callback,
            data,
            instances: FxHashMap::default(),
        });
        id
    }

    /// Create an empty object template
    pub fn new_object_template(&self) -> TemplateId {
        let mut st = self.state();
        let id = TemplateId(st.templates.len() as u32);
        st.templates.push(TemplateData::Object {
            internal_field_count: 0,
            accessors: Vec::new(),
            indexed: None,
        });
        id
    }

    /// Kind of a template, `None` if it does not exist
    pub fn template_kind(&self, template: TemplateId) -> Option<TemplateKind> {
        self.state().template(template).map(TemplateData::kind)
    }

    /// Set the internal field count of an object template
    pub fn set_internal_field_count(&self, template: TemplateId, count: usize) -> bool {
        match self.state().template_mut(template) {
            Some(TemplateData::Object {
                internal_field_count,
                ..
            }) => {
                *internal_field_count = count;
                true
            }
            _ => false,
        }
    }

    /// Internal field count of an object template
    pub fn template_internal_field_count(&self, template: TemplateId) -> Option<usize> {
        match self.state().template(template) {
            Some(TemplateData::Object {
                internal_field_count,
                ..
            }) => Some(*internal_field_count),
            _ => None,
        }
    }

    /// Add an accessor property backed by function templates
    pub fn set_accessor_property(
        &self,
        template: TemplateId,
        key: PropertyKey,
        getter: Option<TemplateId>,
        setter: Option<TemplateId>,
        attributes: PropertyAttribute,
    ) -> bool {
        let mut guard = self.state();
        let st = &mut *guard;
        let is_function = |id: Option<TemplateId>| {
            id.map_or(true, |id| {
                matches!(st.template(id), Some(TemplateData::Function { .. }))
            })
        };
        if !is_function(getter) || !is_function(setter) {
            return false;
        }
        match st.template_mut(template) {
            Some(TemplateData::Object { accessors, .. }) => {
                accessors.retain(|spec| spec.key != key);
                accessors.push(AccessorSpec {
                    key,
                    getter,
                    setter,
                    attributes,
                });
                true
            }
            _ => false,
        }
    }

    /// Install an indexed-property interceptor
    pub fn set_indexed_property_handler(
        &self,
        template: TemplateId,
        config: IndexedPropertyHandlerConfiguration,
    ) -> bool {
        match self.state().template_mut(template) {
            Some(TemplateData::Object { indexed, .. }) => {
                *indexed = Some(config);
                true
            }
            _ => false,
        }
    }

    /// The template's function in `context`, created on first use
    pub fn get_function(&self, template: TemplateId, context: Context) -> Option<Value> {
        self.function_object(template, context).map(Value::Object)
    }

    fn function_object(&self, template: TemplateId, context: Context) -> Option<ObjectId> {
        let mut guard = self.state();
        let st = &mut *guard;
        st.require_context(context)?;
        match st.template(template) {
            Some(TemplateData::Function { instances, .. }) => {
                if let Some(&id) = instances.get(&context) {
                    if st.heap.contains(id) {
                        st.local_roots.push(Value::Object(id));
                        return Some(id);
                    }
                }
            }
            _ => {
                st.throw_error(ErrorKind::TypeError, "Not a function template");
                return None;
            }
        }

        let id = st.allocate(HeapObject::new(ObjectKind::Function { template, context }))?;
        if let Some(TemplateData::Function { instances, .. }) = st.template_mut(template) {
            instances.insert(context, id);
        }
        Some(id)
    }

    /// Create an instance of an object template in `context`
    pub fn new_instance(&self, template: TemplateId, context: Context) -> Option<Value> {
        let (id, accessors) = {
            let mut guard = self.state();
            let st = &mut *guard;
            st.require_context(context)?;
            let (count, accessors) = match st.template(template) {
                Some(TemplateData::Object {
                    internal_field_count,
                    accessors,
                    ..
                }) => (*internal_field_count, accessors.clone()),
                _ => {
                    st.throw_error(ErrorKind::TypeError, "Not an object template");
                    return None;
                }
            };
            let mut object = HeapObject::new(ObjectKind::Ordinary);
            object.internal_fields = vec![Value::Undefined; count];
            object.template = Some(template);
            (st.allocate(object)?, accessors)
        };

        for spec in accessors {
            let getter = match spec.getter {
                Some(t) => Some(self.function_object(t, context)?),
                None => None,
            };
            let setter = match spec.setter {
                Some(t) => Some(self.function_object(t, context)?),
                None => None,
            };
            if let Some(object) = self.state().heap.get_mut(id) {
                object.properties.insert(
                    spec.key,
                    Property::Accessor {
                        getter,
                        setter,
                        attributes: spec.attributes,
                    },
                );
            }
        }
        Some(Value::Object(id))
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Create an empty object
    pub fn new_object(&self) -> Option<Value> {
        self.state()
            .allocate(HeapObject::new(ObjectKind::Ordinary))
            .map(Value::Object)
    }

    /// Create an error object. Error objects are exempt from the heap limit.
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> Value {
        Value::Object(self.state().new_error(kind, message))
    }

    /// The isolate's instance of a well-known symbol
    pub fn well_known_symbol(&self, index: SymbolIndex) -> Value {
        Value::Symbol(self.state().well_known[index.ordinal()])
    }

    /// Description of a symbol
    pub fn symbol_description(&self, symbol: SymbolId) -> Option<String> {
        self.state()
            .symbols
            .get(symbol.0 as usize)
            .map(|s| s.to_string())
    }

    /// String conversion (`String(value)`)
    pub fn to_display_string(&self, value: &Value) -> String {
        let st = self.state();
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Symbol(id) => {
                let description = st.symbols.get(id.0 as usize).map(|s| s.as_ref()).unwrap_or("");
                format!("Symbol({})", description)
            }
            Value::Object(id) => match st.heap.get(*id) {
                Some(object) => match object.kind {
                    ObjectKind::Error(kind) => {
                        let name = data_string(object, "name").unwrap_or_else(|| kind.name().to_string());
                        match data_string(object, "message") {
                            Some(message) if !message.is_empty() => format!("{}: {}", name, message),
                            _ => name,
                        }
                    }
                    ObjectKind::Function { .. } => "function () { [native code] }".to_string(),
                    ObjectKind::Ordinary => "[object Object]".to_string(),
                },
                None => "[object Object]".to_string(),
            },
        }
    }

    /// Whether `value` is an error object
    pub fn is_error(&self, value: &Value) -> bool {
        let st = self.state();
        value
            .as_object()
            .and_then(|id| st.heap.get(id))
            .map_or(false, |o| matches!(o.kind, ObjectKind::Error(_)))
    }

    /// Whether `value` is callable
    pub fn is_function(&self, value: &Value) -> bool {
        let st = self.state();
        value
            .as_object()
            .and_then(|id| st.heap.get(id))
            .map_or(false, |o| matches!(o.kind, ObjectKind::Function { .. }))
    }

    /// Own data property, without running accessors
    pub fn own_data_property(&self, object: &Value, key: &str) -> Option<Value> {
        let st = self.state();
        let object = st.heap.get(object.as_object()?)?;
        match object.properties.get(&PropertyKey::from(key)) {
            Some(Property::Data { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Attribute flags of an own named property
    pub fn property_attributes(
        &self,
        object: &Value,
        key: &PropertyKey,
    ) -> Option<PropertyAttribute> {
        let st = self.state();
        let object = st.heap.get(object.as_object()?)?;
        object.properties.get(key).map(Property::attributes)
    }

    /// Enumerable own string-named keys, sorted. `DONT_ENUM` properties and
    /// symbol keys are skipped.
    pub fn own_keys(&self, object: &Value) -> Vec<Arc<str>> {
        let st = self.state();
        let Some(object) = object.as_object().and_then(|id| st.heap.get(id)) else {
            return Vec::new();
        };
        let mut keys: Vec<Arc<str>> = object
            .properties
            .iter()
            .filter(|(_, p)| !p.attributes().contains(PropertyAttribute::DONT_ENUM))
            .filter_map(|(key, _)| match key {
                PropertyKey::Name(name) => Some(name.clone()),
                PropertyKey::Symbol(_) => None,
            })
            .collect();
        keys.sort();
        keys
    }

    // ========================================================================
    // Property Access
    // ========================================================================

    /// Named property read. Runs accessor getters.
    pub fn get(&self, object: &Value, key: &PropertyKey) -> Option<Value> {
        let getter = {
            let mut guard = self.state();
            let st = &mut *guard;
            let id = match st.receiver(object, key) {
                Ok(id) => id,
                Err(thrown) => return thrown.map(|_| Value::Undefined),
            };
            let found = match st.heap.get(id).and_then(|o| o.properties.get(key)) {
                Some(Property::Data { value, .. }) => Ok(value.clone()),
                Some(Property::Accessor {
                    getter: Some(getter),
                    ..
                }) => Err(*getter),
                _ => Ok(Value::Undefined),
            };
            match found {
                Ok(value) => {
                    st.root_local(&value);
                    return Some(value);
                }
                Err(getter) => getter,
            }
        };
        self.call(&Value::Object(getter), object.clone(), &[])
    }

    /// Named property write. `Some(false)` when the write was ignored
    /// (read-only data property, accessor without a setter).
    pub fn set(&self, object: &Value, key: &PropertyKey, value: Value) -> Option<bool> {
        let setter = {
            let mut guard = self.state();
            let st = &mut *guard;
            let id = match st.receiver(object, key) {
                Ok(id) => id,
                Err(thrown) => return thrown.map(|_| false),
            };
            let Some(target) = st.heap.get_mut(id) else {
                return Some(false);
            };
            match target.properties.get_mut(key) {
                Some(Property::Data { attributes, .. })
                    if attributes.contains(PropertyAttribute::READ_ONLY) =>
                {
                    return Some(false)
                }
                Some(Property::Data { value: slot, .. }) => {
                    *slot = value;
                    return Some(true);
                }
                Some(Property::Accessor {
                    setter: Some(setter),
                    ..
                }) => *setter,
                Some(Property::Accessor { setter: None, .. }) => return Some(false),
                None => {
                    target.properties.insert(
                        key.clone(),
                        Property::Data {
                            value,
                            attributes: PropertyAttribute::NONE,
                        },
                    );
                    return Some(true);
                }
            }
        };
        self.call(&Value::Object(setter), object.clone(), &[value])
            .map(|_| true)
    }

    /// Indexed read. Consults the template's indexed interceptor first.
    pub fn get_index(&self, object: &Value, index: u32) -> Option<Value> {
        let interceptor = {
            let mut guard = self.state();
            let st = &mut *guard;
            let id = match st.receiver(object, &index) {
                Ok(id) => id,
                Err(thrown) => return thrown.map(|_| Value::Undefined),
            };
            let Some(target) = st.heap.get(id) else {
                return Some(Value::Undefined);
            };
            let config = match target.template.and_then(|t| st.template(t)) {
                Some(TemplateData::Object {
                    indexed: Some(config),
                    ..
                }) => Some(config.clone()),
                _ => None,
            };
            match config {
                Some(config) => config,
                None => {
                    let value = target.elements.get(&index).cloned().unwrap_or(Value::Undefined);
                    st.root_local(&value);
                    return Some(value);
                }
            }
        };

        let mut info = PropertyCallbackInfo {
            isolate: self.isolate,
            this: object.clone(),
            holder: object.clone(),
            data: interceptor.data,
            return_value: Value::Undefined,
        };
        let intercepted = (interceptor.getter)(index, &mut info);

        let mut guard = self.state();
        let st = &mut *guard;
        if st.pending_exception.is_some() {
            return None;
        }
        let value = match intercepted {
            Intercepted::Yes => info.return_value,
            Intercepted::No => object
                .as_object()
                .and_then(|id| st.heap.get(id))
                .and_then(|o| o.elements.get(&index).cloned())
                .unwrap_or(Value::Undefined),
        };
        st.root_local(&value);
        Some(value)
    }

    /// Indexed write into the object's elements
    pub fn set_index(&self, object: &Value, index: u32, value: Value) -> Option<bool> {
        let mut guard = self.state();
        let st = &mut *guard;
        let id = match st.receiver(object, &index) {
            Ok(id) => id,
            Err(thrown) => return thrown.map(|_| false),
        };
        match st.heap.get_mut(id) {
            Some(target) => {
                target.elements.insert(index, value);
                Some(true)
            }
            None => Some(false),
        }
    }

    // ========================================================================
    // Internal Fields
    // ========================================================================

    /// Number of internal fields on an object
    pub fn internal_field_count(&self, object: &Value) -> Option<usize> {
        let st = self.state();
        st.heap
            .get(object.as_object()?)
            .map(|o| o.internal_fields.len())
    }

    /// Read an internal field
    pub fn internal_field(&self, object: &Value, index: usize) -> Option<Value> {
        let st = self.state();
        st.heap
            .get(object.as_object()?)?
            .internal_fields
            .get(index)
            .cloned()
    }

    /// Write an internal field. `false` when out of range.
    pub fn set_internal_field(&self, object: &Value, index: usize, value: Value) -> bool {
        let mut st = self.state();
        let Some(id) = object.as_object() else {
            return false;
        };
        match st
            .heap
            .get_mut(id)
            .and_then(|o| o.internal_fields.get_mut(index))
        {
            Some(field) => {
                *field = value;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a function. An `undefined`/`null` receiver becomes the global
    /// object of the function's context, which is entered for the call.
    pub fn call(&self, function: &Value, recv: Value, args: &[Value]) -> Option<Value> {
        let (callback, data, context, recv) = {
            let mut guard = self.state();
            let st = &mut *guard;
            if st.pending_exception.is_some() {
                return None;
            }
            let target = function
                .as_object()
                .and_then(|id| st.heap.get(id))
                .map(|o| o.kind);
            let Some(ObjectKind::Function { template, context }) = target else {
                let message = format!("{} is not a function", function.type_name());
                st.throw_error(ErrorKind::TypeError, &message);
                return None;
            };
            let (callback, data) = match st.template(template) {
                Some(TemplateData::Function { callback, data, .. }) => (*callback, data.clone()),
                _ => {
                    st.throw_error(ErrorKind::TypeError, "Function template is gone");
                    return None;
                }
            };
            let recv = if recv.is_null_or_undefined() {
                st.contexts
                    .get(&context)
                    .map(|c| Value::Object(c.global))
                    .unwrap_or(Value::Undefined)
            } else {
                recv
            };
            (callback, data, context, recv)
        };

        let Some(callback) = callback else {
            return Some(Value::Undefined);
        };

        let mut info = FunctionCallbackInfo {
            isolate: self.isolate,
            this: recv.clone(),
            holder: recv,
            args: args.to_vec(),
            data,
            return_value: Value::Undefined,
        };
        {
            let _entered = ContextScope::new(self.isolate, context);
            callback(&mut info);
        }

        let mut st = self.state();
        if st.pending_exception.is_some() {
            return None;
        }
        st.root_local(&info.return_value);
        Some(info.return_value)
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Throw `value` as the pending exception
    pub fn throw_exception(&self, value: Value) {
        self.state().pending_exception = Some(value);
    }

    /// Throw a fresh error object
    pub fn throw_error(&self, kind: ErrorKind, message: &str) {
        self.state().throw_error(kind, message);
    }

    /// Whether an exception is pending
    pub fn has_pending_exception(&self) -> bool {
        self.state().pending_exception.is_some()
    }

    pub(crate) fn pending_exception(&self) -> Option<Value> {
        self.state().pending_exception.clone()
    }

    pub(crate) fn replace_pending_exception(&self, exception: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut self.state().pending_exception, exception)
    }

    // ========================================================================
    // Roots and Collection
    // ========================================================================

    /// Root `value` in the innermost handle scope
    pub fn root_local(&self, value: &Value) {
        self.state().root_local(value);
    }

    pub(crate) fn local_root_count(&self) -> usize {
        self.state().local_roots.len()
    }

    pub(crate) fn truncate_local_roots(&self, len: usize) {
        self.state().local_roots.truncate(len);
    }

    pub(crate) fn create_persistent(&self, value: Value) -> usize {
        let mut st = self.state();
        match st.free_persistents.pop() {
            Some(slot) => {
                st.persistents[slot] = Some(value);
                slot
            }
            None => {
                st.persistents.push(Some(value));
                st.persistents.len() - 1
            }
        }
    }

    pub(crate) fn persistent(&self, slot: usize) -> Option<Value> {
        self.state().persistents.get(slot).cloned().flatten()
    }

    pub(crate) fn set_persistent(&self, slot: usize, value: Value) {
        if let Some(entry) = self.state().persistents.get_mut(slot) {
            *entry = Some(value);
        }
    }

    pub(crate) fn reset_persistent(&self, slot: usize) {
        let mut st = self.state();
        if let Some(entry) = st.persistents.get_mut(slot) {
            if entry.take().is_some() {
                st.free_persistents.push(slot);
            }
        }
    }

    /// Number of live persistent handles
    pub fn persistent_count(&self) -> usize {
        self.state().persistents.iter().filter(|p| p.is_some()).count()
    }

    /// Full mark-sweep collection. Returns the number of objects freed.
    pub fn collect_garbage(&self) -> usize {
        let mut guard = self.state();
        let st = &mut *guard;

        let mut roots: Vec<ObjectId> = Vec::new();
        roots.extend(st.local_roots.iter().filter_map(Value::as_object));
        roots.extend(st.persistents.iter().flatten().filter_map(Value::as_object));
        for context in st.contexts.values() {
            context.for_each_root(|id| roots.push(id));
        }
        for template in &st.templates {
            template.for_each_root(|id| roots.push(id));
        }
        roots.extend(st.pending_exception.as_ref().and_then(Value::as_object));

        st.heap.collect(roots)
    }

    /// Heap statistics
    pub fn heap_stats(&self) -> HeapStats {
        self.state().heap.stats()
    }
}
