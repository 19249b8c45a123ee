//! Ordered dictionary - the storage behind PHP arrays
//!
//! Two storage modes, one observable behaviour:
//!
//! - **Packed**: keys are exactly `0..len` in order. Values sit in a `Vec`
//!   and the key is the index.
//! - **Hashed**: any keys. Entries live in insertion order in a bucket list
//!   indexed by a chained hash table (see [`hash`]); removal leaves a
//!   tombstone.
//!
//! A packed dictionary is promoted to hashed when:
//! - a string key or an integer key other than `len` is inserted,
//! - `[]` would use a key other than `len` (e.g. after removing the last
//!   element the next free key stays where it was),
//! - an entry other than the last one is removed,
//! - an order-changing rebuild keeps non-sequential keys (reverse, key
//!   preserving sorts).
//!
//! There is no implicit demotion. Operations that build a fresh layout
//! (`reindex`, `shuffle`, non key preserving sorts) produce packed storage.
//!
//! Positions (bucket indices, or vector indices in packed mode) are stable
//! between compactions. Registered enumerators and the internal pointer are
//! stored as positions and remapped whenever the layout is rebuilt.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_hash.c` - HashTable, packed arrays,
//!   nNextFreeElement, zend_hash_iterators_update
//! - Zend: `$PHP_SRC_PATH/Zend/zend_types.h` - HASH_FLAG_PACKED

pub mod algorithms;
pub mod enumerator;
mod hash;
pub mod key;
mod php_array;

pub use algorithms::{Entry, SetOperation};
pub use enumerator::FastEnumerator;
pub use key::{IntStringKey, KeyCastNotice};
pub use php_array::{ArrayBuilder, PhpArray};

use crate::core::alias::PhpAlias;
use crate::core::value::PhpValue;
use crate::runtime::error::ContractError;
use hash::{Bucket, HashTable};
use std::fmt;
use std::ops::Index;

/// `nNextFreeElement` before any integer key was used.
const NO_INT_KEY: i64 = i64::MIN;
/// Tombstones below this count are never worth a compaction.
const MIN_RECLAIM: usize = 8;

#[derive(Debug)]
enum Storage {
    Packed(Vec<PhpValue>),
    Hashed(HashTable),
}

pub struct OrderedDictionary {
    storage: Storage,
    next_free: i64,
    /// Internal array pointer (`current()`/`next()`), as a position.
    pointer: usize,
    /// Next scan position of every registered enumerator; `None` is a free slot.
    iterators: Vec<Option<usize>>,
}

impl OrderedDictionary {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Storage::Packed(Vec::with_capacity(capacity)),
            next_free: NO_INT_KEY,
            pointer: 0,
            iterators: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Packed(values) => values.len(),
            Storage::Hashed(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_packed(&self) -> bool {
        matches!(self.storage, Storage::Packed(_))
    }

    /// Key that `$a[] = ...` would use.
    pub fn next_free_key(&self) -> i64 {
        if self.next_free == NO_INT_KEY {
            0
        } else {
            self.next_free
        }
    }

    // ---- positions ----

    /// Number of positions, tombstones included.
    fn used(&self) -> usize {
        match &self.storage {
            Storage::Packed(values) => values.len(),
            Storage::Hashed(table) => table.used(),
        }
    }

    fn find(&self, key: &IntStringKey) -> Option<usize> {
        match &self.storage {
            Storage::Packed(values) => match key {
                IntStringKey::Int(i) if *i >= 0 && (*i as u64) < values.len() as u64 => {
                    Some(*i as usize)
                }
                _ => None,
            },
            Storage::Hashed(table) => table.find(key),
        }
    }

    fn entry_at_pos(&self, pos: usize) -> Option<(IntStringKey, &PhpValue)> {
        match &self.storage {
            Storage::Packed(values) => values.get(pos).map(|v| (IntStringKey::Int(pos as i64), v)),
            Storage::Hashed(table) => {
                let bucket = table.buckets().get(pos)?;
                bucket.value.as_ref().map(|v| (bucket.key.clone(), v))
            }
        }
    }

    fn value_at_pos(&self, pos: usize) -> Option<&PhpValue> {
        match &self.storage {
            Storage::Packed(values) => values.get(pos),
            Storage::Hashed(table) => table.value(pos),
        }
    }

    fn value_at_pos_mut(&mut self, pos: usize) -> Option<&mut PhpValue> {
        match &mut self.storage {
            Storage::Packed(values) => values.get_mut(pos),
            Storage::Hashed(table) => table.value_mut(pos),
        }
    }

    /// First live position at or after `pos`.
    fn live_from(&self, pos: usize) -> Option<usize> {
        match &self.storage {
            Storage::Packed(values) => (pos < values.len()).then_some(pos),
            Storage::Hashed(table) => table
                .buckets()
                .iter()
                .enumerate()
                .skip(pos)
                .find(|(_, b)| b.value.is_some())
                .map(|(p, _)| p),
        }
    }

    /// Last live position strictly before `pos`.
    fn live_before(&self, pos: usize) -> Option<usize> {
        match &self.storage {
            Storage::Packed(values) => pos.min(values.len()).checked_sub(1),
            Storage::Hashed(table) => table.buckets()[..pos.min(table.used())]
                .iter()
                .rposition(|b| b.value.is_some()),
        }
    }

    /// Number of live entries before `pos`.
    fn ordinal(&self, pos: usize) -> usize {
        match &self.storage {
            Storage::Packed(values) => pos.min(values.len()),
            Storage::Hashed(table) => table.buckets()[..pos.min(table.used())]
                .iter()
                .filter(|b| b.value.is_some())
                .count(),
        }
    }

    fn for_each_position(&mut self, mut f: impl FnMut(usize) -> usize) {
        self.pointer = f(self.pointer);
        for pos in self.iterators.iter_mut().flatten() {
            *pos = f(*pos);
        }
    }

    /// Convert every tracked position to its ordinal, ready for a layout
    /// without tombstones.
    fn positions_to_ordinals(&mut self) {
        let ordinals: Vec<usize> = std::iter::once(self.pointer)
            .chain(self.iterators.iter().flatten().copied())
            .map(|pos| self.ordinal(pos))
            .collect();
        let mut ordinals = ordinals.into_iter();
        self.for_each_position(|pos| ordinals.next().unwrap_or(pos));
    }

    fn clamp_positions(&mut self) {
        let used = self.used();
        self.for_each_position(|pos| pos.min(used));
    }

    // ---- lookup ----

    /// Raw slot for `key`; may hold an alias.
    pub fn get(&self, key: &IntStringKey) -> Option<&PhpValue> {
        self.find(key).and_then(|pos| self.value_at_pos(pos))
    }

    pub fn get_int(&self, key: i64) -> Option<&PhpValue> {
        self.get(&IntStringKey::Int(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&PhpValue> {
        self.get(&IntStringKey::from(key))
    }

    pub fn get_mut(&mut self, key: &IntStringKey) -> Option<&mut PhpValue> {
        let pos = self.find(key)?;
        self.value_at_pos_mut(pos)
    }

    /// Dereferenced copy of the value stored under `key`.
    pub fn try_get_value(&self, key: &IntStringKey) -> Option<PhpValue> {
        self.get(key).map(PhpValue::copy_value)
    }

    pub fn contains_key(&self, key: &IntStringKey) -> bool {
        self.find(key).is_some()
    }

    // ---- insertion ----

    fn note_int_key(&mut self, key: i64) {
        if key >= self.next_free {
            self.next_free = if key == i64::MAX { i64::MAX } else { key + 1 };
        }
    }

    /// Promote packed storage to a bucket table with identical positions.
    fn promote(&mut self) -> &mut HashTable {
        if let Storage::Packed(values) = &mut self.storage {
            let values = std::mem::take(values);
            tracing::trace!(len = values.len(), "promoting packed array to hashed");
            let mut table = HashTable::with_capacity(values.len() + 1);
            for (i, value) in values.into_iter().enumerate() {
                table.push(IntStringKey::Int(i as i64), value);
            }
            self.storage = Storage::Hashed(table);
        }
        match &mut self.storage {
            Storage::Hashed(table) => table,
            Storage::Packed(_) => unreachable!("promoted above"),
        }
    }

    fn reclaim_if_sparse(&mut self) {
        let remap = match &mut self.storage {
            Storage::Hashed(table) if table.holes() >= MIN_RECLAIM && table.holes() >= table.len() => {
                table.compact()
            }
            _ => return,
        };
        self.apply_remap(&remap);
    }

    fn apply_remap(&mut self, remap: &[usize]) {
        let last = remap.len() - 1;
        self.for_each_position(|pos| remap[pos.min(last)]);
    }

    /// Append an entry whose key is known to be absent; returns its slot.
    fn insert_new(&mut self, key: IntStringKey, value: PhpValue) -> &mut PhpValue {
        if let IntStringKey::Int(k) = key {
            self.note_int_key(k);
        }
        let appends = match (&self.storage, &key) {
            (Storage::Packed(values), IntStringKey::Int(k)) => *k == values.len() as i64,
            _ => false,
        };
        if appends {
            return match &mut self.storage {
                Storage::Packed(values) => {
                    values.push(value);
                    let pos = values.len() - 1;
                    &mut values[pos]
                }
                Storage::Hashed(_) => unreachable!("checked packed above"),
            };
        }
        self.promote();
        self.reclaim_if_sparse();
        match &mut self.storage {
            Storage::Hashed(table) => {
                let pos = table.push(key, value);
                table.live_mut(pos)
            }
            Storage::Packed(_) => unreachable!("promoted above"),
        }
    }

    /// `$a[key] = value`: overwrites in place (through a reference bound to
    /// the slot) or appends a new entry.
    pub fn set(&mut self, key: IntStringKey, value: PhpValue) {
        match self.get_mut(&key) {
            Some(slot) => slot.assign(value),
            None => {
                self.insert_new(key, value.into_dereferenced());
            }
        }
    }

    /// Store `value` as-is under `key`, replacing the slot (and any reference
    /// bound to it). Returns the previous slot content.
    pub fn insert(&mut self, key: IntStringKey, value: PhpValue) -> Option<PhpValue> {
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.insert_new(key, value);
                None
            }
        }
    }

    /// `$a[] = value`. Returns the key used, or `None` when the next free key
    /// is already taken (it saturates at `i64::MAX`).
    pub fn push(&mut self, value: PhpValue) -> Option<i64> {
        let key = self.next_free_key();
        if self.contains_key(&IntStringKey::Int(key)) {
            return None;
        }
        self.insert_new(IntStringKey::Int(key), value.into_dereferenced());
        Some(key)
    }

    /// Slot for `key`, inserting null first when absent (nested writes such
    /// as `$a[k][] = v`).
    pub fn get_or_insert_null(&mut self, key: IntStringKey) -> &mut PhpValue {
        match self.find(&key) {
            Some(pos) => match self.value_at_pos_mut(pos) {
                Some(slot) => slot,
                None => unreachable!("find returns live positions"),
            },
            None => self.insert_new(key, PhpValue::Null),
        }
    }

    /// `&$a[key]`: upgrade the slot to a reference, creating it as null.
    pub fn ensure_alias(&mut self, key: IntStringKey) -> PhpAlias {
        self.get_or_insert_null(key).ensure_alias()
    }

    /// `$a[key] = &$other`
    pub fn set_alias(&mut self, key: IntStringKey, alias: PhpAlias) {
        self.get_or_insert_null(key).bind_alias(alias);
    }

    // ---- removal ----

    /// `unset($a[key])`. Returns the removed slot content.
    pub fn remove(&mut self, key: &IntStringKey) -> Option<PhpValue> {
        let pos = self.find(key)?;
        if let Storage::Packed(values) = &mut self.storage {
            if pos + 1 == values.len() {
                let value = values.pop();
                self.clamp_positions();
                return value;
            }
        }
        self.promote().remove_at(pos)
    }

    /// `array_pop()`: remove the last entry. The next free key steps back
    /// when the popped key was the last one issued; the internal pointer is
    /// reset.
    pub fn pop(&mut self) -> Option<(IntStringKey, PhpValue)> {
        let pos = self.live_before(self.used())?;
        let key = self.entry_at_pos(pos).map(|(k, _)| k)?;
        let value = self.remove(&key)?;
        if let IntStringKey::Int(k) = key {
            if self.next_free != NO_INT_KEY && k == self.next_free - 1 {
                self.next_free = k;
            }
        }
        self.pointer = 0;
        Some((key, value))
    }

    /// `array_shift()`: remove the first entry and renumber integer keys
    /// from zero.
    pub fn shift(&mut self) -> Option<(IntStringKey, PhpValue)> {
        let (key, _) = self.first()?;
        let value = self.remove(&key)?;
        self.renumber_int_keys();
        self.pointer = 0;
        Some((key, value))
    }

    pub fn clear(&mut self) {
        self.storage = Storage::Packed(Vec::new());
        self.next_free = NO_INT_KEY;
        self.for_each_position(|_| 0);
    }

    /// Reclaim all tombstones now.
    pub fn compact(&mut self) {
        let remap = match &mut self.storage {
            Storage::Hashed(table) if table.holes() > 0 => table.compact(),
            _ => return,
        };
        self.apply_remap(&remap);
    }

    /// Replace the whole layout with `entries` (already unique keys).
    /// Tracked positions must already be ordinals (see `take_entries`).
    fn rebuild(&mut self, entries: Vec<Entry>, next_free: i64) {
        let sequential = entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| matches!(k, IntStringKey::Int(j) if *j == i as i64));
        tracing::trace!(len = entries.len(), packed = sequential, "rebuilding array storage");
        self.storage = if sequential {
            Storage::Packed(entries.into_iter().map(|(_, v)| v).collect())
        } else {
            let mut table = HashTable::with_capacity(entries.len());
            for (key, value) in entries {
                table.push(key, value);
            }
            Storage::Hashed(table)
        };
        self.next_free = next_free;
        self.clamp_positions();
    }

    /// Move all entries out, leaving the dictionary empty but keeping the
    /// tracked positions as ordinals.
    fn take_entries(&mut self) -> Vec<Entry> {
        self.positions_to_ordinals();
        match std::mem::replace(&mut self.storage, Storage::Packed(Vec::new())) {
            Storage::Packed(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (IntStringKey::Int(i as i64), v))
                .collect(),
            Storage::Hashed(table) => table.into_entries().collect(),
        }
    }

    fn raw_next_free(&self) -> i64 {
        self.next_free
    }

    fn reset_pointer(&mut self) {
        self.pointer = 0;
    }

    fn shift_positions(&mut self, by: usize) {
        self.for_each_position(|pos| pos + by);
        self.clamp_positions();
    }

    // ---- iteration ----

    pub fn iter(&self) -> Iter<'_> {
        let inner = match &self.storage {
            Storage::Packed(values) => IterInner::Packed(values.iter().enumerate()),
            Storage::Hashed(table) => IterInner::Hashed(table.buckets().iter()),
        };
        Iter { inner }
    }

    pub fn keys(&self) -> impl Iterator<Item = IntStringKey> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &PhpValue> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut PhpValue> + '_ {
        let (packed, hashed) = match &mut self.storage {
            Storage::Packed(values) => (Some(values.iter_mut()), None),
            Storage::Hashed(table) => (
                None,
                Some(table.buckets_mut().iter_mut().filter_map(|b| b.value.as_mut())),
            ),
        };
        packed.into_iter().flatten().chain(hashed.into_iter().flatten())
    }

    pub fn first(&self) -> Option<(IntStringKey, &PhpValue)> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<(IntStringKey, &PhpValue)> {
        let pos = self.live_before(self.used())?;
        self.entry_at_pos(pos)
    }

    /// Entry by ordinal position (0 = first in iteration order).
    pub fn entry_at(&self, index: usize) -> Result<(IntStringKey, &PhpValue), ContractError> {
        let len = self.len();
        if index >= len {
            return Err(ContractError::IndexOutOfRange { index, len });
        }
        let found = match &self.storage {
            Storage::Hashed(table) if table.holes() > 0 => self.iter().nth(index),
            _ => self.entry_at_pos(index),
        };
        found.ok_or(ContractError::IndexOutOfRange { index, len })
    }

    /// `array_is_list()`
    pub fn is_list(&self) -> bool {
        match &self.storage {
            Storage::Packed(_) => true,
            Storage::Hashed(_) => self
                .keys()
                .enumerate()
                .all(|(i, k)| matches!(k, IntStringKey::Int(j) if j == i as i64)),
        }
    }

    // ---- internal pointer ----

    /// `current()`
    pub fn current(&self) -> Option<&PhpValue> {
        self.live_from(self.pointer).and_then(|pos| self.value_at_pos(pos))
    }

    /// `key()`
    pub fn current_key(&self) -> Option<IntStringKey> {
        self.live_from(self.pointer)
            .and_then(|pos| self.entry_at_pos(pos))
            .map(|(k, _)| k)
    }

    /// `next()`
    pub fn move_next(&mut self) -> Option<&PhpValue> {
        if let Some(pos) = self.live_from(self.pointer) {
            self.pointer = pos + 1;
        }
        self.current()
    }

    /// `prev()`: stepping back from the first entry leaves the pointer
    /// past the end.
    pub fn move_prev(&mut self) -> Option<&PhpValue> {
        if let Some(pos) = self.live_from(self.pointer) {
            self.pointer = self.live_before(pos).unwrap_or_else(|| self.used());
        }
        self.current()
    }

    /// `reset()`
    pub fn move_first(&mut self) -> Option<&PhpValue> {
        self.pointer = 0;
        self.current()
    }

    /// `end()`
    pub fn move_last(&mut self) -> Option<&PhpValue> {
        self.pointer = self.live_before(self.used()).unwrap_or(0);
        self.current()
    }
}

impl Default for OrderedDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of one slot for a new dictionary. References bound only to a slot
/// of the source are dropped in the copy (the other side of the reference
/// is gone, so the slot is a plain value again); shared references stay
/// shared between both.
pub(crate) fn separate_slot(value: &PhpValue) -> PhpValue {
    match value {
        PhpValue::Alias(alias) if !alias.is_shared() => alias.get(),
        other => other.clone(),
    }
}

impl Clone for OrderedDictionary {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Packed(values) => Storage::Packed(values.iter().map(separate_slot).collect()),
            Storage::Hashed(table) => Storage::Hashed(table.clone_with(separate_slot)),
        };
        Self {
            storage,
            next_free: self.next_free,
            pointer: self.pointer,
            // enumerators belong to the dictionary that registered them
            iterators: Vec::new(),
        }
    }
}

/// Same keys in the same order with identical (`===`) values.
impl PartialEq for OrderedDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}

impl fmt::Debug for OrderedDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Positional access for host code. Panics on an out-of-range index.
impl Index<usize> for OrderedDictionary {
    type Output = PhpValue;

    fn index(&self, index: usize) -> &PhpValue {
        match self.entry_at(index) {
            Ok((_, value)) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

enum IterInner<'a> {
    Packed(std::iter::Enumerate<std::slice::Iter<'a, PhpValue>>),
    Hashed(std::slice::Iter<'a, Bucket>),
}

/// Entries in iteration order; keys are yielded by value.
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (IntStringKey, &'a PhpValue);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Packed(iter) => iter.next().map(|(i, v)| (IntStringKey::Int(i as i64), v)),
            IterInner::Hashed(iter) => iter
                .find(|b| b.value.is_some())
                .and_then(|b| b.value.as_ref().map(|v| (b.key.clone(), v))),
        }
    }
}

impl<'a> IntoIterator for &'a OrderedDictionary {
    type Item = (IntStringKey, &'a PhpValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl FromIterator<PhpValue> for OrderedDictionary {
    fn from_iter<I: IntoIterator<Item = PhpValue>>(iter: I) -> Self {
        let values: Vec<PhpValue> = iter.into_iter().map(PhpValue::into_dereferenced).collect();
        let mut dict = Self::new();
        if !values.is_empty() {
            dict.next_free = values.len() as i64;
        }
        dict.storage = Storage::Packed(values);
        dict
    }
}

/// Later duplicates overwrite earlier ones, like an array literal.
impl FromIterator<(IntStringKey, PhpValue)> for OrderedDictionary {
    fn from_iter<I: IntoIterator<Item = (IntStringKey, PhpValue)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}
