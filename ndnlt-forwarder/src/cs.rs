//! Content Store: caches Data packets to satisfy future Interests without
//! forwarding them upstream again.

use crate::error::{Error, Result};
use ndnlt_common::clock::Clock;
use ndnlt_common::nametree::{EntryKind, NameTree, INVALID_ID};
use ndnlt_common::packet::Data;
use std::time::{Duration, Instant};

pub struct CsEntry {
    pub data: Data,
    pub cached_at: Instant,
    pub fresh_until: Option<Instant>,
    nametree_id: u16,
}

impl CsEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.fresh_until {
            Some(until) => now <= until,
            None => true,
        }
    }

    pub fn nametree_id(&self) -> u16 {
        self.nametree_id
    }
}

pub struct ContentStore {
    slots: Vec<Option<CsEntry>>,
    capacity: usize,
    /// Insertion order of occupied slots, oldest first, for FIFO eviction
    /// when the store is full (the reference forwarder's map is an LRU;
    /// a plain capacity-bounded FIFO gets the same "don't grow unbounded"
    /// property without needing access-time bookkeeping per lookup).
    insertion_order: Vec<u16>,
}

impl ContentStore {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            capacity,
            insertion_order: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn alloc(&mut self) -> Result<u16> {
        for (id, slot) in self.slots.iter().enumerate() {
            if slot.is_none() {
                return Ok(id as u16);
            }
        }
        Err(Error::CsFull)
    }

    /// Inserts or replaces the cache entry for `data.name`, evicting the
    /// oldest entry if the store is full. Returns the slot used and whether
    /// an existing entry had to be evicted to make room.
    pub fn insert(&mut self, tree: &mut NameTree, data: Data, clock: &dyn Clock) -> Result<(u16, bool)> {
        let tree_id = tree.find_or_insert(&data.name)?;
        let existing = tree.cs_id(tree_id);
        if existing != INVALID_ID {
            let fresh_until = data
                .freshness_period_ms
                .map(|ms| clock.now() + Duration::from_millis(ms as u64));
            self.slots[existing as usize] = Some(CsEntry {
                data,
                cached_at: clock.now(),
                fresh_until,
                nametree_id: tree_id,
            });
            return Ok((existing, false));
        }

        let (cs_id, evicted) = match self.alloc() {
            Ok(id) => (id, false),
            Err(Error::CsFull) => {
                let oldest = self.insertion_order.remove(0);
                if let Some(entry) = self.slots[oldest as usize].take() {
                    tree.release(&entry.data.name, EntryKind::Cs);
                }
                (oldest, true)
            }
            Err(other) => return Err(other),
        };

        let fresh_until = data
            .freshness_period_ms
            .map(|ms| clock.now() + Duration::from_millis(ms as u64));
        self.slots[cs_id as usize] = Some(CsEntry {
            data,
            cached_at: clock.now(),
            fresh_until,
            nametree_id: tree_id,
        });
        tree.set_cs_id(tree_id, cs_id);
        self.insertion_order.push(cs_id);
        Ok((cs_id, evicted))
    }

    /// Finds cached Data satisfying `name`, honoring `must_be_fresh` and
    /// `can_be_prefix`.
    ///
    /// An exact match is always tried first. When `can_be_prefix` is set,
    /// Data cached under a longer name than the query also satisfies it —
    /// the opposite lookup direction from a FIB/PIT longest-prefix match,
    /// since here the cached name is the descendant and the query is the
    /// ancestor.
    pub fn prefix_match(
        &self,
        tree: &NameTree,
        name: &ndnlt_common::name::Name,
        can_be_prefix: bool,
        must_be_fresh: bool,
        now: Instant,
    ) -> Option<&CsEntry> {
        if let Some(node_id) = tree.find(name) {
            if let Some(entry) = self.fresh_entry_at(tree, node_id, must_be_fresh, now) {
                return Some(entry);
            }
            if can_be_prefix {
                let descendant = tree.find_descendant_with_entry(node_id, EntryKind::Cs)?;
                return self.fresh_entry_at(tree, descendant, must_be_fresh, now);
            }
            return None;
        }

        if can_be_prefix && name.is_empty() {
            let descendant = tree.find_descendant_with_entry(INVALID_ID, EntryKind::Cs)?;
            return self.fresh_entry_at(tree, descendant, must_be_fresh, now);
        }

        None
    }

    fn fresh_entry_at(&self, tree: &NameTree, node_id: u16, must_be_fresh: bool, now: Instant) -> Option<&CsEntry> {
        let cs_id = tree.cs_id(node_id);
        if cs_id == INVALID_ID {
            return None;
        }
        let entry = self.slots[cs_id as usize].as_ref()?;
        if must_be_fresh && !entry.is_fresh(now) {
            return None;
        }
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndnlt_common::clock::TestClock;
    use ndnlt_common::name::Name;
    use ndnlt_common::packet::{Signature, SignatureType};

    fn sample_data(name: &str) -> Data {
        let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
        Data::new(Name::from_str(name).unwrap(), b"hi".to_vec(), sig).unwrap()
    }

    #[test]
    fn insert_then_match() {
        let mut tree = NameTree::new(16);
        let mut cs = ContentStore::new(4);
        let clock = TestClock::new();
        cs.insert(&mut tree, sample_data("/a/b"), &clock).unwrap();
        let found = cs
            .prefix_match(&tree, &Name::from_str("/a/b").unwrap(), false, false, clock.now())
            .unwrap();
        assert_eq!(found.data.content, *b"hi");
    }

    #[test]
    fn can_be_prefix_matches_descendant_data() {
        let mut tree = NameTree::new(16);
        let mut cs = ContentStore::new(4);
        let clock = TestClock::new();
        cs.insert(&mut tree, sample_data("/x/y"), &clock).unwrap();

        let exact_only = cs.prefix_match(&tree, &Name::from_str("/x").unwrap(), false, false, clock.now());
        assert!(exact_only.is_none());

        let with_prefix = cs
            .prefix_match(&tree, &Name::from_str("/x").unwrap(), true, false, clock.now())
            .unwrap();
        assert_eq!(with_prefix.data.content, *b"hi");
    }

    #[test]
    fn can_be_prefix_matches_from_root() {
        let mut tree = NameTree::new(16);
        let mut cs = ContentStore::new(4);
        let clock = TestClock::new();
        cs.insert(&mut tree, sample_data("/x/y"), &clock).unwrap();

        let found = cs
            .prefix_match(&tree, &Name::new(), true, false, clock.now())
            .unwrap();
        assert_eq!(found.data.content, *b"hi");
    }

    #[test]
    fn must_be_fresh_excludes_stale_entries() {
        let mut tree = NameTree::new(16);
        let mut cs = ContentStore::new(4);
        let mut clock = TestClock::new();
        let data = sample_data("/a").with_freshness_period(10);
        cs.insert(&mut tree, data, &clock).unwrap();
        clock.advance(Duration::from_millis(20));
        let found = cs.prefix_match(&tree, &Name::from_str("/a").unwrap(), false, true, clock.now());
        assert!(found.is_none());
    }

    #[test]
    fn full_store_evicts_oldest() {
        let mut tree = NameTree::new(16);
        let mut cs = ContentStore::new(1);
        let clock = TestClock::new();
        cs.insert(&mut tree, sample_data("/a"), &clock).unwrap();
        cs.insert(&mut tree, sample_data("/b"), &clock).unwrap();
        assert!(cs.prefix_match(&tree, &Name::from_str("/a").unwrap(), false, false, clock.now()).is_none());
        assert!(cs.prefix_match(&tree, &Name::from_str("/b").unwrap(), false, false, clock.now()).is_some());
    }
}
