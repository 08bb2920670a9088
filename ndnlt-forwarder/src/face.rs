//! The abstract network face and the fixed-capacity table that tracks them.

use crate::error::{Error, Result};
use ndnlt_common::bitset::BitSet;

/// A face's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceState {
    Down,
    Up,
    Destroyed,
}

/// Whether a face talks to a local application or to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    App,
    Net,
}

/// A network or application-facing endpoint the forwarder can send packets
/// through. Implementors provide the platform-specific transport (QUIC,
/// serial link, an in-process channel to an application); the forwarder
/// only ever calls through this trait.
pub trait Face {
    /// Brings the face up. Called lazily by `send` if the face is down.
    fn up(&mut self) -> Result<()>;

    /// Sends an already-encoded packet out this face.
    fn send(&mut self, packet: &[u8]) -> Result<()>;

    /// Brings the face down without destroying it.
    fn down(&mut self) -> Result<()>;

    fn state(&self) -> FaceState;

    fn kind(&self) -> FaceKind;
}

/// Sends through `face`, bringing it up first if it's down, matching the
/// reference forwarder's `ndn_face_send` helper.
pub fn send_through(face: &mut dyn Face, packet: &[u8]) -> Result<()> {
    if face.state() != FaceState::Up {
        face.up()?;
    }
    face.send(packet)
}

/// Registry of live faces, indexed by a small integer id handed out at
/// registration time and reused once a face is unregistered.
pub struct FaceTable {
    slots: Vec<Option<Box<dyn Face>>>,
    capacity: usize,
}

impl FaceTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, capacity }
    }

    /// Registers `face`, returning the id it was assigned.
    pub fn register(&mut self, face: Box<dyn Face>) -> Result<u16> {
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(face);
                return Ok(id as u16);
            }
        }
        Err(Error::FaceTableFull)
    }

    /// Removes a face. Returns `Ok(())` even if the id was already empty,
    /// matching the reference forwarder's "no effect" unregister semantics.
    pub fn unregister(&mut self, face_id: u16) -> Result<()> {
        if let Some(slot) = self.slots.get_mut(face_id as usize) {
            *slot = None;
            Ok(())
        } else {
            Err(Error::NoSuchFace(face_id))
        }
    }

    pub fn get_mut(&mut self, face_id: u16) -> Result<&mut (dyn Face + '_)> {
        match self.slots.get_mut(face_id as usize) {
            Some(Some(face)) => Ok(face.as_mut()),
            _ => Err(Error::NoSuchFace(face_id)),
        }
    }

    pub fn contains(&self, face_id: u16) -> bool {
        self.slots
            .get(face_id as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sends `packet` through every face named in `faces`, in ascending
    /// face-id order (the bitset already pops least-significant-bit first).
    pub fn send_to_all(&mut self, faces: &BitSet, packet: &[u8]) {
        for face_id in faces.iter() {
            if let Some(Some(face)) = self.slots.get_mut(face_id as usize) {
                let _ = send_through(face.as_mut(), packet);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubFace {
        state: FaceState,
        sent: Vec<Vec<u8>>,
    }

    impl Face for StubFace {
        fn up(&mut self) -> Result<()> {
            self.state = FaceState::Up;
            Ok(())
        }
        fn send(&mut self, packet: &[u8]) -> Result<()> {
            self.sent.push(packet.to_vec());
            Ok(())
        }
        fn down(&mut self) -> Result<()> {
            self.state = FaceState::Down;
            Ok(())
        }
        fn state(&self) -> FaceState {
            self.state
        }
        fn kind(&self) -> FaceKind {
            FaceKind::App
        }
    }

    fn stub() -> Box<dyn Face> {
        Box::new(StubFace {
            state: FaceState::Down,
            sent: Vec::new(),
        })
    }

    #[test]
    fn register_assigns_lowest_free_id() {
        let mut table = FaceTable::new(4);
        assert_eq!(table.register(stub()).unwrap(), 0);
        assert_eq!(table.register(stub()).unwrap(), 1);
        table.unregister(0).unwrap();
        assert_eq!(table.register(stub()).unwrap(), 0);
    }

    #[test]
    fn full_table_rejects_registration() {
        let mut table = FaceTable::new(1);
        table.register(stub()).unwrap();
        assert!(matches!(table.register(stub()), Err(Error::FaceTableFull)));
    }

    #[test]
    fn send_brings_face_up_first() {
        let mut table = FaceTable::new(1);
        let id = table.register(stub()).unwrap();
        let face = table.get_mut(id).unwrap();
        assert_eq!(face.state(), FaceState::Down);
        send_through(face, b"hello").unwrap();
        assert_eq!(face.state(), FaceState::Up);
    }
}
