//! Isolate heap and mark-sweep collector
//!
//! Objects live in a slot vector indexed by [`ObjectId`]. Freed slots are
//! recycled through a free list. Collection is explicit: the isolate gathers
//! its roots and calls [`Heap::collect`].

use super::context::Context;
use super::template::TemplateId;
use super::value::{ObjectId, PropertyKey, Value};
use isobridge_sdk::PropertyAttribute;
use rustc_hash::FxHashMap;

/// Built-in error constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `Error`
    Error,
    /// `TypeError`
    TypeError,
    /// `RangeError`
    RangeError,
}

impl ErrorKind {
    /// Constructor name
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
        }
    }
}

/// What kind of object a heap slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Ordinary,
    /// Function instantiated from a template inside `context`
    Function {
        template: TemplateId,
        context: Context,
    },
    Error(ErrorKind),
}

/// An own property
#[derive(Debug, Clone)]
pub(crate) enum Property {
    Data {
        value: Value,
        attributes: PropertyAttribute,
    },
    Accessor {
        getter: Option<ObjectId>,
        setter: Option<ObjectId>,
        attributes: PropertyAttribute,
    },
}

impl Property {
    pub fn attributes(&self) -> PropertyAttribute {
        match self {
            Property::Data { attributes, .. } | Property::Accessor { attributes, .. } => *attributes,
        }
    }
}

/// A heap object
#[derive(Debug)]
pub(crate) struct HeapObject {
    pub kind: ObjectKind,
    pub properties: FxHashMap<PropertyKey, Property>,
    pub elements: FxHashMap<u32, Value>,
    pub internal_fields: Vec<Value>,
    /// Object template this instance was created from (interceptor lookup)
    pub template: Option<TemplateId>,
    marked: bool,
}

impl HeapObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: FxHashMap::default(),
            elements: FxHashMap::default(),
            internal_fields: Vec::new(),
            template: None,
            marked: false,
        }
    }

    fn for_each_child(&self, mut f: impl FnMut(ObjectId)) {
        for property in self.properties.values() {
            match property {
                Property::Data { value, .. } => {
                    if let Some(id) = value.as_object() {
                        f(id);
                    }
                }
                Property::Accessor { getter, setter, .. } => {
                    getter.iter().chain(setter.iter()).copied().for_each(&mut f);
                }
            }
        }
        self.elements
            .values()
            .chain(self.internal_fields.iter())
            .filter_map(Value::as_object)
            .for_each(f);
    }
}

/// Heap statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live objects
    pub live_objects: usize,
    /// Object limit, if any
    pub max_objects: Option<usize>,
    /// Objects freed by the last collection
    pub last_freed: usize,
}

/// Object storage
pub(crate) struct Heap {
    slots: Vec<Option<HeapObject>>,
    free: Vec<u32>,
    live: usize,
    max_objects: Option<usize>,
    last_freed: usize,
}

impl Heap {
    pub fn new(max_objects: Option<usize>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            max_objects,
            last_freed: 0,
        }
    }

    /// Allocate, honoring the object limit. `None` when the limit is hit.
    pub fn allocate(&mut self, object: HeapObject) -> Option<ObjectId> {
        if let Some(max) = self.max_objects {
            if self.live >= max {
                return None;
            }
        }
        Some(self.allocate_unchecked(object))
    }

    /// Allocate past the limit. Used for the error object that reports
    /// the limit itself.
    pub fn allocate_unchecked(&mut self, object: HeapObject) -> ObjectId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(object);
                ObjectId(index)
            }
            None => {
                self.slots.push(Some(object));
                ObjectId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.live,
            max_objects: self.max_objects,
            last_freed: self.last_freed,
        }
    }

    /// Mark everything reachable from `roots`, free the rest.
    /// Returns the number of objects freed.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = ObjectId>) -> usize {
        let marked = self.mark(roots);
        let freed = self.sweep();
        tracing::trace!(marked, freed, live = self.live, "heap collected");
        self.last_freed = freed;
        freed
    }

    fn mark(&mut self, roots: impl IntoIterator<Item = ObjectId>) -> usize {
        for object in self.slots.iter_mut().flatten() {
            object.marked = false;
        }

        let mut marked = 0;
        let mut worklist: Vec<ObjectId> = roots.into_iter().collect();
        while let Some(id) = worklist.pop() {
            let Some(object) = self.get_mut(id) else {
                continue;
            };
            if object.marked {
                continue;
            }
            object.marked = true;
            marked += 1;
            object.for_each_child(|child| worklist.push(child));
        }
        marked
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if matches!(slot, Some(object) if !object.marked) {
                *slot = None;
                self.free.push(index as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordinary() -> HeapObject {
        HeapObject::new(ObjectKind::Ordinary)
    }

    #[test]
    fn test_heap_limit() {
        let mut heap = Heap::new(Some(2));
        assert!(heap.allocate(ordinary()).is_some());
        assert!(heap.allocate(ordinary()).is_some());
        assert!(heap.allocate(ordinary()).is_none());

        // The unchecked path still works at the limit
        let id = heap.allocate_unchecked(ordinary());
        assert!(heap.contains(id));
        assert_eq!(heap.stats().live_objects, 3);
    }

    #[test]
    fn test_collect_unreachable() {
        let mut heap = Heap::new(None);
        let a = heap.allocate(ordinary()).unwrap();
        let b = heap.allocate(ordinary()).unwrap();
        let c = heap.allocate(ordinary()).unwrap();

        // a -> b through a data property; c is garbage
        heap.get_mut(a).unwrap().properties.insert(
            PropertyKey::from("child"),
            Property::Data {
                value: Value::Object(b),
                attributes: PropertyAttribute::NONE,
            },
        );

        let freed = heap.collect([a]);
        assert_eq!(freed, 1);
        assert!(heap.contains(a));
        assert!(heap.contains(b));
        assert!(!heap.contains(c));
        assert_eq!(heap.stats().live_objects, 2);
        assert_eq!(heap.stats().last_freed, 1);
    }

    #[test]
    fn test_collect_follows_accessors_elements_and_fields() {
        let mut heap = Heap::new(None);
        let root = heap.allocate(ordinary()).unwrap();
        let getter = heap.allocate(ordinary()).unwrap();
        let element = heap.allocate(ordinary()).unwrap();
        let field = heap.allocate(ordinary()).unwrap();

        let object = heap.get_mut(root).unwrap();
        object.properties.insert(
            PropertyKey::from("x"),
            Property::Accessor {
                getter: Some(getter),
                setter: None,
                attributes: PropertyAttribute::NONE,
            },
        );
        object.elements.insert(0, Value::Object(element));
        object.internal_fields.push(Value::Object(field));

        assert_eq!(heap.collect([root]), 0);
        assert_eq!(heap.stats().live_objects, 4);
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut heap = Heap::new(None);
        let a = heap.allocate(ordinary()).unwrap();
        heap.collect(std::iter::empty());
        assert!(!heap.contains(a));
        let b = heap.allocate(ordinary()).unwrap();
        assert_eq!(a, b);
    }
}
