//! Whole-array algorithms: sort, shuffle, reverse, set operations,
//! duplicate selection and key renumbering.
//!
//! All comparers see entries as `(key, value)` pairs holding the raw slot
//! (references included); sort and set-operation callers decide what part of
//! the entry to compare.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/ext/standard/array.c` - php_usort, PHP_FUNCTION(shuffle),
//!   php_array_diff, php_array_intersect, PHP_FUNCTION(array_unshift)

use super::{IntStringKey, OrderedDictionary, separate_slot};
use crate::core::value::PhpValue;
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::convert::Infallible;
use std::hash::Hash;

/// An owned array entry.
pub type Entry = (IntStringKey, PhpValue);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    /// Keep entries that match no other array.
    Difference,
    /// Keep entries that match every other array.
    Intersection,
}

/// Wrap a fallible comparer so it can run inside std's infallible sort and
/// search: the first error is parked and every later comparison is `Equal`.
struct Guarded<F, E> {
    compare: F,
    failure: Option<E>,
}

impl<F, E> Guarded<F, E>
where
    F: FnMut(&Entry, &Entry) -> Result<Ordering, E>,
{
    fn new(compare: F) -> Self {
        Self {
            compare,
            failure: None,
        }
    }

    fn call(&mut self, a: &Entry, b: &Entry) -> Ordering {
        if self.failure.is_some() {
            return Ordering::Equal;
        }
        match (self.compare)(a, b) {
            Ok(ordering) => ordering,
            Err(err) => {
                self.failure = Some(err);
                Ordering::Equal
            }
        }
    }

    fn finish(self) -> Result<(), E> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Stable top-down merge sort. `slice::sort_by` may panic when the comparer
/// is not a total order, which user callbacks are free to be.
fn merge_sort<T, F>(items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let next = if compare(r, l) == Ordering::Less {
            right.next()
        } else {
            left.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

fn never<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

impl OrderedDictionary {
    /// Owned copies of all entries in iteration order.
    pub fn to_entries(&self) -> Vec<Entry> {
        self.iter().map(|(k, v)| (k, v.clone())).collect()
    }

    /// Stable sort. Without `preserve_keys` the result is a list keyed
    /// `0..len`. The internal pointer is reset.
    pub fn sort_by<F>(&mut self, preserve_keys: bool, mut compare: F)
    where
        F: FnMut(&Entry, &Entry) -> Ordering,
    {
        never(self.try_sort_by(preserve_keys, |a, b| Ok(compare(a, b))));
    }

    /// Stable sort with a fallible comparer (user callbacks). On error the
    /// dictionary is left exactly as it was.
    pub fn try_sort_by<E, F>(&mut self, preserve_keys: bool, compare: F) -> Result<(), E>
    where
        F: FnMut(&Entry, &Entry) -> Result<Ordering, E>,
    {
        let mut guarded = Guarded::new(compare);
        let entries = merge_sort(self.to_entries(), &mut |a, b| guarded.call(a, b));
        guarded.finish()?;

        self.positions_to_ordinals();
        if preserve_keys {
            let next_free = self.raw_next_free();
            self.rebuild(entries, next_free);
        } else {
            let len = entries.len() as i64;
            let renumbered = entries
                .into_iter()
                .enumerate()
                .map(|(i, (_, v))| (IntStringKey::Int(i as i64), v))
                .collect();
            self.rebuild(renumbered, len);
        }
        self.reset_pointer();
        Ok(())
    }

    /// Fisher-Yates shuffle driven by `rng`. Keys are discarded; the result
    /// is a list keyed `0..len`.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut values: Vec<PhpValue> = self.take_entries().into_iter().map(|(_, v)| v).collect();
        values.shuffle(rng);
        let len = values.len() as i64;
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (IntStringKey::Int(i as i64), v))
            .collect();
        self.rebuild(entries, len);
        self.reset_pointer();
    }

    /// Reverse iteration order in place, keeping every key.
    pub fn reverse(&mut self) {
        let next_free = self.raw_next_free();
        let mut entries = self.take_entries();
        entries.reverse();
        self.rebuild(entries, next_free);
        self.reset_pointer();
    }

    /// Renumber all keys `0..len`, dropping string keys.
    pub fn reindex(&mut self) {
        let values = self.take_entries();
        let len = values.len() as i64;
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, (_, v))| (IntStringKey::Int(i as i64), v))
            .collect();
        self.rebuild(entries, len);
    }

    /// Renumber integer keys from zero in iteration order; string keys are
    /// kept. The next free key becomes the number of integer keys.
    pub fn renumber_int_keys(&mut self) {
        let entries = self.take_entries();
        let (entries, next_free) = renumber(entries);
        self.rebuild(entries, next_free);
    }

    /// Prepend one entry. String keys are kept (an existing entry with the
    /// same string key is replaced); integer keys, including `key` itself,
    /// are renumbered from zero.
    pub fn add_first(&mut self, key: IntStringKey, value: PhpValue) {
        if !key.is_int() {
            self.remove(&key);
        }
        self.prepend(vec![(key, value.into_dereferenced())]);
    }

    /// `array_unshift()`: prepend values as a list and renumber integer keys.
    pub fn unshift(&mut self, values: Vec<PhpValue>) {
        let entries = values
            .into_iter()
            .map(|v| (IntStringKey::Int(0), v.into_dereferenced()))
            .collect();
        self.prepend(entries);
    }

    fn prepend(&mut self, mut front: Vec<Entry>) {
        let added = front.len();
        front.extend(self.take_entries());
        let (entries, next_free) = renumber(front);
        self.rebuild(entries, next_free);
        // registered enumerators keep pointing at the same entries
        self.shift_positions(added);
        self.reset_pointer();
    }

    /// Entries of `self` that match no other array (`Difference`) or every
    /// other array (`Intersection`) under `compare`. Survivors keep their
    /// keys and order.
    ///
    /// `compare` must be a total order; it is used to sort the other arrays
    /// and binary search them.
    pub fn set_operation<F>(
        &self,
        op: SetOperation,
        others: &[&OrderedDictionary],
        mut compare: F,
    ) -> OrderedDictionary
    where
        F: FnMut(&Entry, &Entry) -> Ordering,
    {
        never(self.try_set_operation(op, others, |a, b| Ok(compare(a, b))))
    }

    pub fn try_set_operation<E, F>(
        &self,
        op: SetOperation,
        others: &[&OrderedDictionary],
        compare: F,
    ) -> Result<OrderedDictionary, E>
    where
        F: FnMut(&Entry, &Entry) -> Result<Ordering, E>,
    {
        let mut guarded = Guarded::new(compare);
        let sorted: Vec<Vec<Entry>> = others
            .iter()
            .map(|other| merge_sort(other.to_entries(), &mut |a, b| guarded.call(a, b)))
            .collect();

        let mut result = OrderedDictionary::with_capacity(self.len());
        for (key, value) in self.iter() {
            let entry = (key, value.clone());
            let hits = sorted
                .iter()
                .filter(|list| {
                    list.binary_search_by(|probe| guarded.call(probe, &entry))
                        .is_ok()
                })
                .count();
            let keep = match op {
                SetOperation::Difference => hits == 0,
                SetOperation::Intersection => hits == sorted.len(),
            };
            if keep {
                result.insert(entry.0, separate_slot(&entry.1));
            }
        }
        guarded.finish()?;
        result.next_free = self.next_free;
        Ok(result)
    }

    /// Entries whose projected key was already produced by an earlier entry.
    /// The first occurrence of each key is never reported.
    pub fn select_duplicates<K, S>(&self, key_selector: S) -> Vec<Entry>
    where
        K: Hash + Eq,
        S: FnMut(&IntStringKey, &PhpValue) -> K,
    {
        self.select_duplicates_where(key_selector, |_, _| true)
    }

    /// Like [`select_duplicates`](Self::select_duplicates), but only entries
    /// accepted by `predicate` take part (as first occurrences or as
    /// duplicates).
    pub fn select_duplicates_where<K, S, P>(&self, mut key_selector: S, mut predicate: P) -> Vec<Entry>
    where
        K: Hash + Eq,
        S: FnMut(&IntStringKey, &PhpValue) -> K,
        P: FnMut(&IntStringKey, &PhpValue) -> bool,
    {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for (key, value) in self.iter() {
            if !predicate(&key, value) {
                continue;
            }
            if !seen.insert(key_selector(&key, value)) {
                duplicates.push((key, value.clone()));
            }
        }
        duplicates
    }

    /// Duplicates under an ordering instead of a hashable key: entries are
    /// stably sorted by `compare`, and within each run of equal values every
    /// entry after the first (earliest in iteration order) is a duplicate.
    /// Returned in iteration order.
    pub fn select_duplicates_by<F>(&self, mut compare: F) -> Vec<Entry>
    where
        F: FnMut(&PhpValue, &PhpValue) -> Ordering,
    {
        let indexed: Vec<(usize, IntStringKey, &PhpValue)> = self
            .iter()
            .enumerate()
            .map(|(pos, (key, value))| (pos, key, value))
            .collect();
        let sorted = merge_sort(indexed, &mut |a, b| compare(a.2, b.2));

        let mut duplicates = Vec::new();
        let mut kept: Option<&PhpValue> = None;
        for (pos, key, value) in sorted {
            match kept {
                Some(first) if compare(first, value) == Ordering::Equal => {
                    duplicates.push((pos, key, value.clone()));
                }
                _ => kept = Some(value),
            }
        }
        duplicates.sort_unstable_by_key(|(pos, _, _)| *pos);
        duplicates.into_iter().map(|(_, key, value)| (key, value)).collect()
    }
}

/// Renumber integer keys from zero; returns the entries and the count of
/// integer keys.
fn renumber(entries: Vec<Entry>) -> (Vec<Entry>, i64) {
    let mut next = 0i64;
    let entries = entries
        .into_iter()
        .map(|(key, value)| match key {
            IntStringKey::Int(_) => {
                let key = IntStringKey::Int(next);
                next += 1;
                (key, value)
            }
            string => (string, value),
        })
        .collect();
    (entries, next)
}
