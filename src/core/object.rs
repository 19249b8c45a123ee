//! Objects and resources
//!
//! Both have handle semantics: copying a value that holds an object or a
//! resource shares the same instance. Identity is pointer identity; the
//! numeric ids are issued by the owning [`RequestContext`] and only used for
//! display (`#1` in `var_dump`, `Resource id #5`).
//!
//! [`RequestContext`]: crate::runtime::context::RequestContext

use crate::core::alias::PhpAlias;
use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use indexmap::IndexMap;
use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// `__toString()` implementation for a native class.
pub type ToStringHandler = fn(&PhpObject) -> PhpString;

/// Minimal class description needed by the value layer.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Rc<str>,
    pub to_string: Option<ToStringHandler>,
}

impl ClassDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            to_string: None,
        }
    }

    pub fn with_to_string(mut self, handler: ToStringHandler) -> Self {
        self.to_string = Some(handler);
        self
    }
}

pub struct ObjectData {
    id: u64,
    class: Rc<ClassDef>,
    properties: RefCell<IndexMap<PhpString, PhpValue>>,
    internal: Option<Rc<dyn Any>>, // native payload, e.g. the body of a Closure
}

#[derive(Clone)]
pub struct PhpObject(Rc<ObjectData>);

impl PhpObject {
    pub fn new(id: u64, class: Rc<ClassDef>) -> Self {
        Self(Rc::new(ObjectData {
            id,
            class,
            properties: RefCell::new(IndexMap::new()),
            internal: None,
        }))
    }

    pub fn with_internal(id: u64, class: Rc<ClassDef>, internal: Rc<dyn Any>) -> Self {
        Self(Rc::new(ObjectData {
            id,
            class,
            properties: RefCell::new(IndexMap::new()),
            internal: Some(internal),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn class(&self) -> &Rc<ClassDef> {
        &self.0.class
    }

    pub fn class_name(&self) -> &str {
        &self.0.class.name
    }

    pub fn internal(&self) -> Option<&Rc<dyn Any>> {
        self.0.internal.as_ref()
    }

    pub fn ptr_eq(&self, other: &PhpObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Value of a property, dereferenced.
    pub fn get_property(&self, name: &str) -> Option<PhpValue> {
        self.0
            .properties
            .borrow()
            .get(&PhpString::from(name))
            .map(PhpValue::copy_value)
    }

    /// Assign a property; writes through a reference bound to it.
    pub fn set_property(&self, name: &str, value: PhpValue) {
        let mut props = self.0.properties.borrow_mut();
        match props.get_mut(&PhpString::from(name)) {
            Some(slot) => slot.assign(value),
            None => {
                props.insert(PhpString::from(name), value.into_dereferenced());
            }
        }
    }

    /// `&$obj->name`: upgrade the property slot to a reference.
    pub fn property_alias(&self, name: &str) -> PhpAlias {
        let mut props = self.0.properties.borrow_mut();
        props
            .entry(PhpString::from(name))
            .or_insert(PhpValue::Null)
            .ensure_alias()
    }

    pub fn unset_property(&self, name: &str) -> bool {
        self.0
            .properties
            .borrow_mut()
            .shift_remove(&PhpString::from(name))
            .is_some()
    }

    pub fn property_count(&self) -> usize {
        self.0.properties.borrow().len()
    }

    /// Borrow the property table in declaration order.
    pub fn properties(&self) -> Ref<'_, IndexMap<PhpString, PhpValue>> {
        self.0.properties.borrow()
    }

    /// `__toString()` result, if the class defines one.
    pub fn to_php_string(&self) -> Option<PhpString> {
        self.0.class.to_string.map(|handler| handler(self))
    }
}

impl fmt::Debug for PhpObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object({})#{}", self.class_name(), self.id())
    }
}

struct ResourceData {
    id: i64,
    kind: Rc<str>,
    open: Cell<bool>,
}

/// Opaque handle to a host resource (stream, connection, ...).
#[derive(Clone)]
pub struct PhpResource(Rc<ResourceData>);

impl PhpResource {
    pub fn new(id: i64, kind: &str) -> Self {
        Self(Rc::new(ResourceData {
            id,
            kind: Rc::from(kind),
            open: Cell::new(true),
        }))
    }

    pub fn id(&self) -> i64 {
        self.0.id
    }

    /// `get_resource_type()`: `"Unknown"` once closed
    pub fn kind(&self) -> &str {
        if self.is_open() { &self.0.kind } else { "Unknown" }
    }

    pub fn is_open(&self) -> bool {
        self.0.open.get()
    }

    pub fn close(&self) {
        self.0.open.set(false);
    }

    pub fn ptr_eq(&self, other: &PhpResource) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PhpResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource({}) of type ({})", self.id(), self.kind())
    }
}
