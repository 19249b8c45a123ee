//! Mutation-tolerant enumerators (`foreach` by reference)
//!
//! A [`FastEnumerator`] is a ticket for a scan position registered inside
//! the dictionary. Because the dictionary owns the position, it can keep it
//! valid across compactions and rebuilds, and removing the entry that was
//! just yielded never skips or repeats the following one.
//!
//! ```ignore
//! let mut it = dict.enumerator();
//! while let Some((key, value)) = it.move_next(&mut dict)? {
//!     if value.is_null() {
//!         dict.remove(&key);
//!     }
//! }
//! dict.release_enumerator(it)?;
//! ```
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_hash.c` - zend_hash_iterator_add,
//!   zend_hash_iterator_pos, zend_hash_iterators_update

use super::{IntStringKey, OrderedDictionary};
use crate::core::value::PhpValue;
use crate::runtime::error::ContractError;

/// Handle to a scan position registered with one dictionary.
#[derive(Debug, PartialEq, Eq)]
pub struct FastEnumerator {
    id: usize,
}

impl OrderedDictionary {
    /// Register a new enumerator positioned before the first entry.
    pub fn enumerator(&mut self) -> FastEnumerator {
        let id = match self.iterators.iter().position(Option::is_none) {
            Some(free) => {
                self.iterators[free] = Some(0);
                free
            }
            None => {
                self.iterators.push(Some(0));
                self.iterators.len() - 1
            }
        };
        FastEnumerator { id }
    }

    /// Unregister an enumerator; consuming it makes a second release
    /// impossible.
    pub fn release_enumerator(&mut self, enumerator: FastEnumerator) -> Result<(), ContractError> {
        self.iterator_slot(enumerator.id)?;
        self.iterators[enumerator.id] = None;
        while matches!(self.iterators.last(), Some(None)) {
            self.iterators.pop();
        }
        Ok(())
    }

    /// Number of enumerators currently registered.
    pub fn active_enumerators(&self) -> usize {
        self.iterators.iter().flatten().count()
    }

    fn iterator_slot(&self, id: usize) -> Result<usize, ContractError> {
        self.iterators
            .get(id)
            .copied()
            .flatten()
            .ok_or(ContractError::UnknownEnumerator { id })
    }
}

impl FastEnumerator {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Yield the next entry (value dereferenced) and advance past it.
    pub fn move_next(
        &mut self,
        dict: &mut OrderedDictionary,
    ) -> Result<Option<(IntStringKey, PhpValue)>, ContractError> {
        let from = dict.iterator_slot(self.id)?;
        let Some(pos) = dict.live_from(from) else {
            dict.iterators[self.id] = Some(dict.used());
            return Ok(None);
        };
        dict.iterators[self.id] = Some(pos + 1);
        Ok(dict
            .entry_at_pos(pos)
            .map(|(key, value)| (key, value.copy_value())))
    }

    /// Key of the entry the next call will yield, without advancing.
    pub fn peek_key(&self, dict: &OrderedDictionary) -> Result<Option<IntStringKey>, ContractError> {
        let from = dict.iterator_slot(self.id)?;
        Ok(dict
            .live_from(from)
            .and_then(|pos| dict.entry_at_pos(pos))
            .map(|(key, _)| key))
    }

    /// Rewind to the first entry.
    pub fn reset(&mut self, dict: &mut OrderedDictionary) -> Result<(), ContractError> {
        dict.iterator_slot(self.id)?;
        dict.iterators[self.id] = Some(0);
        Ok(())
    }
}
