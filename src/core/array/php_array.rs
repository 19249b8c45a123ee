//! Copy-on-write array handle and literal builder

use super::{IntStringKey, OrderedDictionary};
use crate::core::value::PhpValue;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Array value: a shared dictionary that is copied on the first write made
/// while another value still holds it.
#[derive(Clone, Default)]
pub struct PhpArray(Rc<OrderedDictionary>);

impl PhpArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Rc::new(OrderedDictionary::with_capacity(capacity)))
    }

    /// Writable dictionary, separated from other holders first.
    pub fn make_mut(&mut self) -> &mut OrderedDictionary {
        if Rc::strong_count(&self.0) > 1 {
            tracing::trace!(len = self.0.len(), "separating shared array");
        }
        Rc::make_mut(&mut self.0)
    }

    pub fn ptr_eq(&self, other: &PhpArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True while another value shares this dictionary.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.0) > 1
    }

    pub fn into_dictionary(self) -> OrderedDictionary {
        Rc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl Deref for PhpArray {
    type Target = OrderedDictionary;

    fn deref(&self) -> &OrderedDictionary {
        &self.0
    }
}

impl From<OrderedDictionary> for PhpArray {
    fn from(dict: OrderedDictionary) -> Self {
        Self(Rc::new(dict))
    }
}

impl PartialEq for PhpArray {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl fmt::Debug for PhpArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl FromIterator<PhpValue> for PhpArray {
    fn from_iter<I: IntoIterator<Item = PhpValue>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<OrderedDictionary>())
    }
}

impl FromIterator<(IntStringKey, PhpValue)> for PhpArray {
    fn from_iter<I: IntoIterator<Item = (IntStringKey, PhpValue)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<OrderedDictionary>())
    }
}

/// Builds an array literal entry by entry.
///
/// ```ignore
/// let arr = ArrayBuilder::new()
///     .insert("name", "php")
///     .push(8)
///     .finish();
/// ```
#[derive(Debug, Default)]
pub struct ArrayBuilder {
    dict: OrderedDictionary,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dict: OrderedDictionary::with_capacity(capacity),
        }
    }

    /// `[..., value]`
    pub fn push(mut self, value: impl Into<PhpValue>) -> Self {
        self.dict.push(value.into());
        self
    }

    /// `[..., key => value]`; a repeated key overwrites the earlier value.
    pub fn insert(mut self, key: impl Into<IntStringKey>, value: impl Into<PhpValue>) -> Self {
        self.dict.set(key.into(), value.into());
        self
    }

    pub fn finish(self) -> PhpArray {
        PhpArray::from(self.dict)
    }

    pub fn finish_dictionary(self) -> OrderedDictionary {
        self.dict
    }
}
