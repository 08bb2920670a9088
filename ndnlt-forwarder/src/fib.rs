//! Forwarding Information Base: maps a name prefix to a set of next-hop
//! faces, with an optional application callback standing in for a locally
//! registered prefix.

use crate::error::{Error, Result};
use ndnlt_common::bitset::BitSet;
use ndnlt_common::nametree::{EntryKind, NameTree, INVALID_ID};

/// A locally registered prefix's Interest handler. Returning `true` tells
/// the forwarder the callback claimed the Interest (it will answer with
/// `put_data` on its own); `false` means fall through to any next-hop
/// faces as well.
pub type OnInterest = Box<dyn FnMut(&ndnlt_common::packet::Interest, u16) -> bool>;

pub struct FibEntry {
    pub name: ndnlt_common::name::Name,
    pub nexthop: BitSet,
    pub on_interest: Option<OnInterest>,
    nametree_id: u16,
}

impl FibEntry {
    pub fn nametree_id(&self) -> u16 {
        self.nametree_id
    }
}

pub struct Fib {
    slots: Vec<Option<FibEntry>>,
    capacity: usize,
}

impl Fib {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn alloc(&mut self) -> Result<u16> {
        for (id, slot) in self.slots.iter().enumerate() {
            if slot.is_none() {
                return Ok(id as u16);
            }
        }
        Err(Error::FibFull)
    }

    /// Finds or creates the FIB entry for `prefix`, allocating a NameTree
    /// slot for it if this is the first route registered under it.
    pub fn find_or_insert(
        &mut self,
        tree: &mut NameTree,
        prefix: &ndnlt_common::name::Name,
    ) -> Result<u16> {
        let tree_id = tree.find_or_insert(prefix)?;
        let existing = tree.fib_id(tree_id);
        if existing != INVALID_ID {
            return Ok(existing);
        }

        let fib_id = self.alloc()?;
        self.slots[fib_id as usize] = Some(FibEntry {
            name: prefix.clone(),
            nexthop: BitSet::new(),
            on_interest: None,
            nametree_id: tree_id,
        });
        tree.set_fib_id(tree_id, fib_id);
        Ok(fib_id)
    }

    pub fn find(&self, tree: &NameTree, prefix: &ndnlt_common::name::Name) -> Option<u16> {
        let tree_id = tree.find(prefix)?;
        let fib_id = tree.fib_id(tree_id);
        if fib_id == INVALID_ID {
            None
        } else {
            Some(fib_id)
        }
    }

    /// Longest-prefix match over `name`, returning the deepest FIB entry
    /// covering it.
    pub fn prefix_match(&self, tree: &NameTree, name: &ndnlt_common::name::Name) -> Option<u16> {
        let tree_id = tree.longest_prefix_match(name, EntryKind::Fib)?;
        let fib_id = tree.fib_id(tree_id);
        (fib_id != INVALID_ID).then_some(fib_id)
    }

    pub fn get(&self, fib_id: u16) -> Option<&FibEntry> {
        self.slots.get(fib_id as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, fib_id: u16) -> Option<&mut FibEntry> {
        self.slots.get_mut(fib_id as usize)?.as_mut()
    }

    /// Removes `fib_id`'s entry and releases its NameTree slot.
    pub fn remove(&mut self, tree: &mut NameTree, prefix: &ndnlt_common::name::Name, fib_id: u16) {
        if let Some(slot) = self.slots.get_mut(fib_id as usize) {
            *slot = None;
        }
        tree.release(prefix, EntryKind::Fib);
    }

    /// Clears `face_id` from every nexthop set, removing entries that end
    /// up with no routes and no callback left.
    pub fn unregister_face(&mut self, tree: &mut NameTree, face_id: u16) {
        for slot in self.slots.iter_mut() {
            if let Some(entry) = slot {
                entry.nexthop.clear(face_id);
                if entry.nexthop.is_empty() && entry.on_interest.is_none() {
                    tree.release(&entry.name, EntryKind::Fib);
                    *slot = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndnlt_common::name::Name;

    #[test]
    fn insert_and_match_prefix() {
        let mut tree = NameTree::new(16);
        let mut fib = Fib::new(4);
        let prefix = Name::from_str("/a/b").unwrap();
        let fib_id = fib.find_or_insert(&mut tree, &prefix).unwrap();
        fib.get_mut(fib_id).unwrap().nexthop.set(2);

        let query = Name::from_str("/a/b/c").unwrap();
        let matched = fib.prefix_match(&tree, &query).unwrap();
        assert_eq!(matched, fib_id);
        assert!(fib.get(fib_id).unwrap().nexthop.contains(2));
    }

    #[test]
    fn repeated_insert_returns_same_entry() {
        let mut tree = NameTree::new(16);
        let mut fib = Fib::new(4);
        let prefix = Name::from_str("/a").unwrap();
        let first = fib.find_or_insert(&mut tree, &prefix).unwrap();
        let second = fib.find_or_insert(&mut tree, &prefix).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn full_fib_reports_full() {
        let mut tree = NameTree::new(16);
        let mut fib = Fib::new(1);
        fib.find_or_insert(&mut tree, &Name::from_str("/a").unwrap()).unwrap();
        let err = fib.find_or_insert(&mut tree, &Name::from_str("/b").unwrap());
        assert!(matches!(err, Err(Error::FibFull)));
    }
}
