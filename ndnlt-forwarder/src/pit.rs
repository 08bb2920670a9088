//! Pending Interest Table: tracks Interests awaiting a matching Data, the
//! faces that sent them, and the faces the forwarder has sent them to.

use crate::error::{Error, Result};
use ndnlt_common::bitset::BitSet;
use ndnlt_common::clock::Clock;
use ndnlt_common::nametree::{EntryKind, NameTree, INVALID_ID};
use ndnlt_common::packet::{Data, Interest};
use std::time::{Duration, Instant};

pub type OnData = Box<dyn FnMut(&Data)>;
pub type OnTimeout = Box<dyn FnMut()>;

pub struct PitEntry {
    pub name: ndnlt_common::name::Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub incoming_faces: BitSet,
    pub outgoing_faces: BitSet,
    pub last_time: Instant,
    pub lifetime: Duration,
    /// Nonce of the Interest currently occupying this entry. A retransmission
    /// of the same Interest (same name, same nonce) refreshes `last_time`; a
    /// different Interest for a live name with a nonce already seen on this
    /// entry is a looped/duplicate Interest and gets rejected rather than
    /// resetting the entry.
    pub nonce: u32,
    /// `Some` only for an Interest expressed by a local application rather
    /// than received from a face.
    pub on_data: Option<OnData>,
    pub on_timeout: Option<OnTimeout>,
    nametree_id: u16,
}

impl PitEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_time) > self.lifetime
    }

    pub fn nametree_id(&self) -> u16 {
        self.nametree_id
    }
}

pub struct Pit {
    slots: Vec<Option<PitEntry>>,
    capacity: usize,
}

impl Pit {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, capacity }
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
        Err(Error::PitFull)
    }

    /// Finds the entry matching `interest`'s exact name, creating one if
    /// this is a new Interest. `clock` stamps `last_time` on both paths, so
    /// a repeated Interest refreshes its entry's age.
    pub fn find_or_insert(
        &mut self,
        tree: &mut NameTree,
        interest: &Interest,
        clock: &dyn Clock,
    ) -> Result<u16> {
        let tree_id = tree.find_or_insert(&interest.name)?;
        let existing = tree.pit_id(tree_id);
        if existing != INVALID_ID {
            let entry = self.slots[existing as usize].as_mut().unwrap();
            if !entry.is_expired(clock.now()) && entry.nonce == interest.nonce {
                return Err(Error::InterestRejected("duplicate nonce on a live entry"));
            }
            entry.last_time = clock.now();
            entry.nonce = interest.nonce;
            return Ok(existing);
        }

        let pit_id = self.alloc()?;
        self.slots[pit_id as usize] = Some(PitEntry {
            name: interest.name.clone(),
            can_be_prefix: interest.can_be_prefix,
            must_be_fresh: interest.must_be_fresh,
            incoming_faces: BitSet::new(),
            outgoing_faces: BitSet::new(),
            last_time: clock.now(),
            lifetime: Duration::from_millis(interest.lifetime_ms as u64),
            nonce: interest.nonce,
            on_data: None,
            on_timeout: None,
            nametree_id: tree_id,
        });
        tree.set_pit_id(tree_id, pit_id);
        Ok(pit_id)
    }

    pub fn find(&self, tree: &NameTree, interest: &Interest) -> Option<u16> {
        let tree_id = tree.find(&interest.name)?;
        let pit_id = tree.pit_id(tree_id);
        (pit_id != INVALID_ID).then_some(pit_id)
    }

    /// Finds all live entries whose name is a prefix of `name`'s, in
    /// practice only the exact-match case plus any `can_be_prefix` entries
    /// along the path, matching against an incoming Data's name.
    pub fn prefix_match(&self, tree: &NameTree, name: &ndnlt_common::name::Name) -> Option<u16> {
        let tree_id = tree.longest_prefix_match(name, EntryKind::Pit)?;
        let pit_id = tree.pit_id(tree_id);
        (pit_id != INVALID_ID).then_some(pit_id)
    }

    pub fn get(&self, pit_id: u16) -> Option<&PitEntry> {
        self.slots.get(pit_id as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, pit_id: u16) -> Option<&mut PitEntry> {
        self.slots.get_mut(pit_id as usize)?.as_mut()
    }

    /// Removes the entry satisfied by incoming Data or expired by a timer.
    pub fn remove(&mut self, tree: &mut NameTree, pit_id: u16) -> Option<PitEntry> {
        let removed = self.slots.get_mut(pit_id as usize)?.take()?;
        tree.release(&removed.name, EntryKind::Pit);
        Some(removed)
    }

    /// Clears `face_id` from every incoming/outgoing set. The reference
    /// forwarder leaves the entry itself in place; a later sweep or Data
    /// arrival reaps it.
    pub fn unregister_face(&mut self, face_id: u16) {
        for slot in self.slots.iter_mut().flatten() {
            slot.incoming_faces.clear(face_id);
            slot.outgoing_faces.clear(face_id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &PitEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|e| (id as u16, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndnlt_common::clock::TestClock;
    use ndnlt_common::name::Name;

    #[test]
    fn insert_then_find() {
        let mut tree = NameTree::new(16);
        let mut pit = Pit::new(4);
        let clock = TestClock::new();
        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 1);
        let pit_id = pit.find_or_insert(&mut tree, &interest, &clock).unwrap();
        pit.get_mut(pit_id).unwrap().incoming_faces.set(0);
        assert_eq!(pit.find(&tree, &interest), Some(pit_id));
    }

    #[test]
    fn retransmission_with_fresh_nonce_refreshes_timestamp() {
        let mut tree = NameTree::new(16);
        let mut pit = Pit::new(4);
        let mut clock = TestClock::new();
        let interest = Interest::new(Name::from_str("/a").unwrap(), 1);
        let id = pit.find_or_insert(&mut tree, &interest, &clock).unwrap();
        let first_time = pit.get(id).unwrap().last_time;
        clock.advance(Duration::from_millis(50));
        let retransmit = Interest::new(Name::from_str("/a").unwrap(), 2);
        let id2 = pit.find_or_insert(&mut tree, &retransmit, &clock).unwrap();
        assert_eq!(id, id2);
        assert!(pit.get(id).unwrap().last_time > first_time);
    }

    #[test]
    fn repeated_nonce_on_live_entry_is_rejected() {
        let mut tree = NameTree::new(16);
        let mut pit = Pit::new(4);
        let clock = TestClock::new();
        let interest = Interest::new(Name::from_str("/a").unwrap(), 7);
        pit.find_or_insert(&mut tree, &interest, &clock).unwrap();
        let looped = Interest::new(Name::from_str("/a").unwrap(), 7);
        assert!(matches!(
            pit.find_or_insert(&mut tree, &looped, &clock),
            Err(Error::InterestRejected(_))
        ));
    }

    #[test]
    fn repeated_nonce_after_expiry_is_accepted() {
        let mut tree = NameTree::new(16);
        let mut pit = Pit::new(4);
        let mut clock = TestClock::new();
        let interest = Interest::new(Name::from_str("/a").unwrap(), 7).with_lifetime(10);
        pit.find_or_insert(&mut tree, &interest, &clock).unwrap();
        clock.advance(Duration::from_millis(50));
        let retry = Interest::new(Name::from_str("/a").unwrap(), 7).with_lifetime(10);
        assert!(pit.find_or_insert(&mut tree, &retry, &clock).is_ok());
    }

    #[test]
    fn expiry_uses_entry_lifetime() {
        let mut tree = NameTree::new(16);
        let mut pit = Pit::new(4);
        let mut clock = TestClock::new();
        let interest = Interest::new(Name::from_str("/a").unwrap(), 1).with_lifetime(100);
        let id = pit.find_or_insert(&mut tree, &interest, &clock).unwrap();
        assert!(!pit.get(id).unwrap().is_expired(clock.now()));
        clock.advance(Duration::from_millis(200));
        assert!(pit.get(id).unwrap().is_expired(clock.now()));
    }
}
