//! Bucket table for hashed-mode arrays
//!
//! Entries live in insertion order in `buckets`; `heads` maps a hash slot to
//! the first bucket of its collision chain and each bucket links to the next
//! one through `next`. Removing an entry unlinks it from its chain and leaves
//! a tombstone (`value == None`) so the positions of all other buckets stay
//! put. Tombstones are only reclaimed by [`HashTable::compact`], which
//! reports how positions moved.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_hash.c` - _zend_hash_index_add_or_update_i,
//!   zend_hash_rehash, _zend_hash_del_el_ex

use super::key::IntStringKey;
use crate::core::value::PhpValue;

pub(crate) const INVALID: u32 = u32::MAX;
const MIN_SLOTS: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    pub key: IntStringKey,
    pub hash: u64,
    pub value: Option<PhpValue>,
    next: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct HashTable {
    buckets: Vec<Bucket>,
    heads: Vec<u32>,
    holes: usize,
}

impl HashTable {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = capacity.max(MIN_SLOTS).next_power_of_two();
        Self {
            buckets: Vec::with_capacity(capacity),
            heads: vec![INVALID; slots],
            holes: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.buckets.len() - self.holes
    }

    /// Number of positions, tombstones included.
    pub fn used(&self) -> usize {
        self.buckets.len()
    }

    pub fn holes(&self) -> usize {
        self.holes
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn buckets_mut(&mut self) -> &mut [Bucket] {
        &mut self.buckets
    }

    #[inline]
    fn slot(&self, hash: u64) -> usize {
        (hash as usize) & (self.heads.len() - 1)
    }

    pub fn find(&self, key: &IntStringKey) -> Option<usize> {
        let hash = key.hash_code();
        let mut idx = self.heads[self.slot(hash)];
        while idx != INVALID {
            let bucket = &self.buckets[idx as usize];
            if bucket.hash == hash && bucket.key == *key {
                return Some(idx as usize);
            }
            idx = bucket.next;
        }
        None
    }

    pub fn value(&self, pos: usize) -> Option<&PhpValue> {
        self.buckets.get(pos).and_then(|b| b.value.as_ref())
    }

    pub fn value_mut(&mut self, pos: usize) -> Option<&mut PhpValue> {
        self.buckets.get_mut(pos).and_then(|b| b.value.as_mut())
    }

    /// Value at a position known to be live.
    pub fn live_mut(&mut self, pos: usize) -> &mut PhpValue {
        match &mut self.buckets[pos].value {
            Some(value) => value,
            None => unreachable!("position {pos} is a tombstone"),
        }
    }

    /// Copy the table, mapping every live value through `f`.
    pub fn clone_with(&self, f: impl Fn(&PhpValue) -> PhpValue) -> Self {
        Self {
            buckets: self
                .buckets
                .iter()
                .map(|b| Bucket {
                    key: b.key.clone(),
                    hash: b.hash,
                    value: b.value.as_ref().map(&f),
                    next: b.next,
                })
                .collect(),
            heads: self.heads.clone(),
            holes: self.holes,
        }
    }

    /// Append a new entry. The key must not be present.
    pub fn push(&mut self, key: IntStringKey, value: PhpValue) -> usize {
        debug_assert!(self.find(&key).is_none(), "duplicate key {key}");
        if self.buckets.len() >= self.heads.len() {
            self.grow_index();
        }
        let hash = key.hash_code();
        let slot = self.slot(hash);
        let pos = self.buckets.len();
        self.buckets.push(Bucket {
            key,
            hash,
            value: Some(value),
            next: self.heads[slot],
        });
        self.heads[slot] = pos as u32;
        pos
    }

    /// Unlink the entry at `pos` and leave a tombstone in its place.
    pub fn remove_at(&mut self, pos: usize) -> Option<PhpValue> {
        let hash = self.buckets.get(pos)?.hash;
        self.buckets[pos].value.as_ref()?;

        let slot = self.slot(hash);
        let target = pos as u32;
        if self.heads[slot] == target {
            self.heads[slot] = self.buckets[pos].next;
        } else {
            let mut idx = self.heads[slot];
            while idx != INVALID {
                let next = self.buckets[idx as usize].next;
                if next == target {
                    self.buckets[idx as usize].next = self.buckets[pos].next;
                    break;
                }
                idx = next;
            }
        }

        self.holes += 1;
        self.buckets[pos].next = INVALID;
        self.buckets[pos].value.take()
    }

    fn grow_index(&mut self) {
        let slots = self.heads.len() * 2;
        tracing::trace!(slots, entries = self.len(), "growing array hash index");
        self.heads = vec![INVALID; slots];
        self.relink();
    }

    fn relink(&mut self) {
        self.heads.iter_mut().for_each(|h| *h = INVALID);
        for pos in 0..self.buckets.len() {
            if self.buckets[pos].value.is_none() {
                self.buckets[pos].next = INVALID;
                continue;
            }
            let slot = self.slot(self.buckets[pos].hash);
            self.buckets[pos].next = self.heads[slot];
            self.heads[slot] = pos as u32;
        }
    }

    /// Reclaim tombstones. Returns `remap` with `remap[old] == new` for every
    /// old position `0..=used()`; a tombstone maps to the position of the
    /// next live entry.
    pub fn compact(&mut self) -> Vec<usize> {
        let mut remap = Vec::with_capacity(self.buckets.len() + 1);
        let mut live = 0;
        for bucket in &self.buckets {
            remap.push(live);
            if bucket.value.is_some() {
                live += 1;
            }
        }
        remap.push(live);

        tracing::trace!(holes = self.holes, live, "compacting array buckets");
        self.buckets.retain(|b| b.value.is_some());
        self.holes = 0;
        self.relink();
        remap
    }

    /// Consume the table, yielding live entries in order.
    pub fn into_entries(self) -> impl Iterator<Item = (IntStringKey, PhpValue)> {
        self.buckets
            .into_iter()
            .filter_map(|b| b.value.map(|v| (b.key, v)))
    }
}
