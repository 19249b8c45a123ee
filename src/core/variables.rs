//! Variable scope
//!
//! An ordered symbol table for one function frame (or the global scope).
//! It is the host-side counterpart of compiled variable slots and lets
//! embedders express assignment, reference binding and `unset` with PHP
//! semantics.

use crate::core::alias::PhpAlias;
use crate::core::array::{IntStringKey, OrderedDictionary};
use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use crate::runtime::error::PhpError;
use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub struct LocalScope {
    vars: IndexMap<PhpString, PhpValue>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `isset($name)`: defined and not null.
    pub fn is_set(&self, name: &str) -> bool {
        self.vars
            .get(&PhpString::from(name))
            .is_some_and(|v| !v.is_null())
    }

    /// Value of `$name`, dereferenced. `None` when undefined.
    pub fn get(&self, name: &str) -> Option<PhpValue> {
        self.vars.get(&PhpString::from(name)).map(PhpValue::copy_value)
    }

    /// `$name = value`
    pub fn assign(&mut self, name: &str, value: PhpValue) {
        self.slot(name).assign(value);
    }

    /// Storage slot of `$name`, created as null when undefined.
    pub fn slot(&mut self, name: &str) -> &mut PhpValue {
        self.vars.entry(PhpString::from(name)).or_insert(PhpValue::Null)
    }

    /// `&$name`
    pub fn reference(&mut self, name: &str) -> PhpAlias {
        self.slot(name).ensure_alias()
    }

    /// `$target = &$source`
    pub fn assign_by_ref(&mut self, target: &str, source: &str) {
        let alias = self.reference(source);
        self.bind(target, alias);
    }

    /// Bind `$name` to an existing reference.
    pub fn bind(&mut self, name: &str, alias: PhpAlias) {
        self.slot(name).bind_alias(alias);
    }

    /// `&$name[key]`: upgrade an array element to a reference, turning an
    /// undefined or null variable into an array first.
    pub fn reference_element(&mut self, name: &str, key: IntStringKey) -> Result<PhpAlias, PhpError> {
        self.slot(name).with_array_mut(|arr| arr.ensure_alias(key))
    }

    /// Write access to the array in `$name` (auto-vivified from null).
    pub fn with_array_mut<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut OrderedDictionary) -> R,
    ) -> Result<R, PhpError> {
        self.slot(name).with_array_mut(f)
    }

    /// `unset($name)`: drops this binding only; other variables bound to the
    /// same reference keep the value.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.shift_remove(&PhpString::from(name)).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &PhpString> {
        self.vars.keys()
    }

    /// `get_defined_vars()`
    pub fn to_array(&self) -> OrderedDictionary {
        self.vars
            .iter()
            .map(|(name, value)| (IntStringKey::from(name.clone()), value.copy_value()))
            .collect()
    }
}
