//! PHP references (`&$x`)
//!
//! A `PhpAlias` is one shared storage cell. Every variable, array slot or
//! property bound to the same reference holds a clone of the same alias, so
//! a write through any of them is seen by all.
//!
//! Invariant: the value held by an alias is never itself an alias. The only
//! entry points that store a value ([`PhpAlias::new`], [`PhpAlias::set`],
//! [`PhpAlias::with_mut`]) flatten their input, so reference chains cannot be
//! built.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_types.h` - zend_reference
//! - Zend: `$PHP_SRC_PATH/Zend/zend_execute.c` - zend_assign_to_variable_reference

use crate::core::value::PhpValue;
use crate::runtime::error::PhpError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

const BUSY_REFERENCE: &str = "Cannot modify a reference from inside its own target";

#[derive(Clone)]
pub struct PhpAlias(Rc<RefCell<PhpValue>>);

impl PhpAlias {
    pub fn new(value: PhpValue) -> Self {
        Self(Rc::new(RefCell::new(value.into_dereferenced())))
    }

    /// Copy of the referenced value (never an alias).
    ///
    /// A cell that is being written further up the stack reads as null.
    pub fn get(&self) -> PhpValue {
        self.with(PhpValue::clone)
    }

    /// Store a value in the shared cell, dereferencing it first.
    ///
    /// A cell that is being written further up the stack cannot take the
    /// write; it is dropped with a warning event.
    pub fn set(&self, value: PhpValue) {
        let value = value.into_dereferenced();
        match self.0.try_borrow_mut() {
            Ok(mut slot) => *slot = value,
            Err(_) => tracing::warn!("write to a reference that is already being modified was dropped"),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&PhpValue) -> R) -> R {
        match self.0.try_borrow() {
            Ok(slot) => f(&slot),
            Err(_) => f(&PhpValue::Null),
        }
    }

    /// Mutate the referenced value in place.
    ///
    /// Fails when the cell is already being modified further up the stack,
    /// which is what a reference stored inside its own target leads to
    /// (`$a[0] = &$a; $a[0][] = 1;`).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut PhpValue) -> R) -> Result<R, PhpError> {
        let mut slot = self
            .0
            .try_borrow_mut()
            .map_err(|_| PhpError::Error(BUSY_REFERENCE.to_string()))?;
        let result = f(&mut slot);
        if let PhpValue::Alias(inner) = &*slot {
            // a cell bound to itself has nothing left to read
            let flattened = if Rc::ptr_eq(&inner.0, &self.0) {
                PhpValue::Null
            } else {
                inner.get()
            };
            *slot = flattened;
        }
        Ok(result)
    }

    pub fn ptr_eq(&self, other: &PhpAlias) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of storage locations bound to this reference.
    pub fn reference_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// True when more than one storage location is bound to this reference.
    pub fn is_shared(&self) -> bool {
        self.reference_count() > 1
    }
}

impl fmt::Debug for PhpAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => write!(f, "&{:?}", *value),
            Err(_) => f.write_str("&<borrowed>"),
        }
    }
}
