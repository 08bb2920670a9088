//! Link-layer fragmentation for faces whose MTU is smaller than an NDN
//! packet. Each fragment carries a 3-byte header: bit 7 of byte 0 is a
//! marker (always set, so a receiver can tell a fragmented frame from a
//! bare unfragmented packet), bit 5 is the More-Fragments flag, and bits
//! 0-4 are a 5-bit sequence number capping a packet at 31 fragments. Bytes
//! 1-2 are a big-endian 16-bit fragment identifier shared by every fragment
//! of one packet, so fragments of back-to-back packets can't be confused by
//! a receiver that's still draining the previous one.

use bytes::{Bytes, BytesMut};
use ndnlt_common::error::Error;

const MARKER_BIT: u8 = 0x80;
const MORE_FRAGMENTS_BIT: u8 = 0x20;
const SEQUENCE_MASK: u8 = 0x1F;
const HEADER_LEN: usize = 3;

/// Maximum sequence number the 5-bit field can hold, so at most
/// `MAX_SEQUENCE + 1` fragments per packet.
pub const MAX_SEQUENCE: u8 = 30;

/// Splits `packet` into `mtu`-sized fragments tagged with `id`, lazily:
/// nothing is fragmented until the returned iterator is driven.
pub fn fragment(packet: Bytes, mtu: usize, id: u16) -> Result<Fragmenter, Error> {
    assert!(mtu > HEADER_LEN, "mtu must leave room for the fragment header");
    let payload_len = mtu - HEADER_LEN;
    let fragment_count = packet.len().div_ceil(payload_len).max(1);
    if fragment_count > MAX_SEQUENCE as usize + 1 {
        return Err(Error::TooManyFragments(fragment_count));
    }
    Ok(Fragmenter {
        packet,
        payload_len,
        id,
        sequence: 0,
        offset: 0,
    })
}

/// Lazily emits one fragment per `next()` call.
pub struct Fragmenter {
    packet: Bytes,
    payload_len: usize,
    id: u16,
    sequence: u8,
    offset: usize,
}

impl Iterator for Fragmenter {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.offset > self.packet.len() {
            return None;
        }
        if self.offset == self.packet.len() && self.sequence > 0 {
            return None;
        }

        let end = (self.offset + self.payload_len).min(self.packet.len());
        let more = end < self.packet.len();

        let mut frame = BytesMut::with_capacity(HEADER_LEN + (end - self.offset));
        let mut byte0 = MARKER_BIT | (self.sequence & SEQUENCE_MASK);
        if more {
            byte0 |= MORE_FRAGMENTS_BIT;
        }
        frame.extend_from_slice(&[byte0]);
        frame.extend_from_slice(&self.id.to_be_bytes());
        frame.extend_from_slice(&self.packet[self.offset..end]);

        self.offset = end;
        self.sequence += 1;

        Some(frame.freeze())
    }
}

/// Reassembles fragments sharing one identifier into a complete packet.
/// Built fresh per in-flight identifier; a face typically keeps one
/// assembler active at a time and rejects fragments for a different id.
pub struct Assembler {
    id: Option<u16>,
    next_sequence: u8,
    buffer: BytesMut,
    done: bool,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            id: None,
            next_sequence: 0,
            buffer: BytesMut::new(),
            done: false,
        }
    }

    /// Feeds one fragment. Returns the reassembled packet once the final
    /// fragment (More-Fragments clear) has been fed.
    pub fn feed(&mut self, frame: &[u8]) -> Result<Option<Bytes>, Error> {
        if self.done {
            let id = self.id.unwrap_or(0);
            return Err(Error::NoMoreFragments(id));
        }
        if frame.len() < HEADER_LEN {
            return Err(Error::WrongTlvLength);
        }

        let byte0 = frame[0];
        let sequence = byte0 & SEQUENCE_MASK;
        let more = byte0 & MORE_FRAGMENTS_BIT != 0;
        let id = u16::from_be_bytes([frame[1], frame[2]]);

        match self.id {
            None => self.id = Some(id),
            Some(expected) if expected != id => {
                return Err(Error::WrongFragmentId { expected, actual: id })
            }
            _ => {}
        }

        if sequence != self.next_sequence {
            return Err(Error::OutOfOrderFragment {
                expected: self.next_sequence,
                actual: sequence,
            });
        }

        self.buffer.extend_from_slice(&frame[HEADER_LEN..]);
        self.next_sequence += 1;

        if more {
            Ok(None)
        } else {
            self.done = true;
            Ok(Some(std::mem::take(&mut self.buffer).freeze()))
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn needs_fragmentation(packet_len: usize, mtu: usize) -> bool {
    packet_len + HEADER_LEN > mtu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_and_reassembles() {
        let packet = Bytes::from(vec![7u8; 1000]);
        let fragments: Vec<_> = fragment(packet.clone(), 103, 42).unwrap().collect();
        assert!(fragments.len() > 1);

        let mut assembler = Assembler::new();
        let mut result = None;
        for frame in &fragments {
            result = assembler.feed(frame).unwrap();
        }
        assert_eq!(result.unwrap(), packet);
    }

    #[test]
    fn single_fragment_when_it_fits() {
        let packet = Bytes::from(vec![1u8; 10]);
        let fragments: Vec<_> = fragment(packet.clone(), 100, 1).unwrap().collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0][0] & MORE_FRAGMENTS_BIT, 0);
    }

    #[test]
    fn rejects_out_of_order_fragment() {
        let packet = Bytes::from(vec![0u8; 500]);
        let mut fragments: Vec<_> = fragment(packet, 103, 5).unwrap().collect();
        fragments.swap(0, 1);
        let mut assembler = Assembler::new();
        assert!(assembler.feed(&fragments[0]).is_err());
    }

    #[test]
    fn rejects_mismatched_fragment_id() {
        let a: Vec<_> = fragment(Bytes::from(vec![0u8; 300]), 103, 1).unwrap().collect();
        let b: Vec<_> = fragment(Bytes::from(vec![0u8; 300]), 103, 2).unwrap().collect();
        let mut assembler = Assembler::new();
        assembler.feed(&a[0]).unwrap();
        assert!(assembler.feed(&b[1]).is_err());
    }

    #[test]
    fn too_many_fragments_is_rejected() {
        let packet = Bytes::from(vec![0u8; 100_000]);
        assert!(fragment(packet, 13, 1).is_err());
    }
}
