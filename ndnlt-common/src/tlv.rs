//! TLV (Type-Length-Value) encoding and decoding, per NDN Packet Format 0.3.
//!
//! Both the Type and Length fields use the same variable-length integer
//! encoding: a 1-byte value directly for numbers below 253, a 0xFD marker
//! followed by a big-endian u16 for numbers up to 0xFFFF, and a 0xFE marker
//! followed by a big-endian u32 beyond that. The 0xFF (64-bit) form from the
//! full NDN spec is not supported; a device-class target never emits or
//! expects TLVs that large.

use crate::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

// Packet types
pub const TLV_INTEREST: u64 = 5;
pub const TLV_DATA: u64 = 6;

// Common elements
pub const TLV_NAME: u64 = 7;
pub const TLV_GENERIC_NAME_COMPONENT: u64 = 8;
pub const TLV_IMPLICIT_SHA256_DIGEST_COMPONENT: u64 = 1;
pub const TLV_PARAMETERS_SHA256_DIGEST_COMPONENT: u64 = 2;
pub const TLV_KEYWORD_NAME_COMPONENT: u64 = 32;
pub const TLV_SEGMENT_NAME_COMPONENT: u64 = 33;
pub const TLV_BYTE_OFFSET_NAME_COMPONENT: u64 = 34;
pub const TLV_VERSION_NAME_COMPONENT: u64 = 35;
pub const TLV_TIMESTAMP_NAME_COMPONENT: u64 = 36;
pub const TLV_SEQUENCE_NUM_NAME_COMPONENT: u64 = 37;

// Interest packet. CanBePrefix/HopLimit/ApplicationParameters collide
// numerically with name component types above; the collision is upstream
// NDN Packet Format 0.3 and is harmless because the two always nest under
// disjoint parents (a Name TLV never contains an Interest-level TLV).
pub const TLV_CAN_BE_PREFIX: u64 = 33;
pub const TLV_MUST_BE_FRESH: u64 = 18;
pub const TLV_FORWARDING_HINT: u64 = 30;
pub const TLV_NONCE: u64 = 10;
pub const TLV_INTEREST_LIFETIME: u64 = 12;
pub const TLV_HOP_LIMIT: u64 = 34;
pub const TLV_APPLICATION_PARAMETERS: u64 = 36;
pub const TLV_INTEREST_SIGNATURE_INFO: u64 = 44;
pub const TLV_INTEREST_SIGNATURE_VALUE: u64 = 46;

// Data packet
pub const TLV_META_INFO: u64 = 20;
pub const TLV_CONTENT: u64 = 21;
pub const TLV_SIGNATURE_INFO: u64 = 22;
pub const TLV_SIGNATURE_VALUE: u64 = 23;

// Data/MetaInfo
pub const TLV_CONTENT_TYPE: u64 = 24;
pub const TLV_FRESHNESS_PERIOD: u64 = 25;
pub const TLV_FINAL_BLOCK_ID: u64 = 26;

// Signature
pub const TLV_SIGNATURE_TYPE: u64 = 27;
pub const TLV_KEY_LOCATOR: u64 = 28;
pub const TLV_KEY_DIGEST: u64 = 29;
pub const TLV_SIGNATURE_NONCE: u64 = 38;
pub const TLV_TIMESTAMP: u64 = 40;
pub const TLV_SEQ_NUM: u64 = 42;

// Link object
pub const TLV_DELEGATION: u64 = 31;
pub const TLV_PREFERENCE: u64 = 30;

// Certificate
pub const TLV_VALIDITY_PERIOD: u64 = 253;
pub const TLV_NOT_BEFORE: u64 = 254;
pub const TLV_NOT_AFTER: u64 = 255;

// App-support TLVs, used by the access-control / secure-sign-on sample
// profiles built on top of the trust schema. Not all of these are consumed
// by the forwarder itself, but wire compatibility requires recognizing them.
pub const TLV_AC_ECDH_PUB: u64 = 130;
pub const TLV_AC_SALT: u64 = 131;
pub const TLV_AC_KEY_LIFETIME: u64 = 132;
pub const TLV_AC_KEY_CIPHER: u64 = 133;
pub const TLV_AC_ENCRYPTED_CONTENT: u64 = 134;
pub const TLV_AC_AES_IV: u64 = 135;
pub const TLV_AC_ENCRYPTED_PAYLOAD: u64 = 136;
pub const TLV_SD_STATUS: u64 = 137;
pub const TLV_SEC_BOOT_CAPABILITIES: u64 = 160;
pub const TLV_SEC_BOOT_ANCHOR_DIGEST: u64 = 161;
pub const TLV_SEC_BOOT_N1_ECDH_PUB: u64 = 162;
pub const TLV_SEC_BOOT_N2_ECDH_PUB: u64 = 163;

/// Encodes a TLV variable-length number (used for both Type and Length).
pub fn encode_varnumber(value: u64, buf: &mut BytesMut) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= 0xFFFF {
        buf.put_u8(0xFD);
        buf.put_u16(value as u16);
    } else if value <= 0xFFFF_FFFF {
        buf.put_u8(0xFE);
        buf.put_u32(value as u32);
    } else {
        // Never reached by any caller in this crate; kept symmetrical with
        // decode_varnumber's rejection of the 0xFF marker.
        buf.put_u8(0xFE);
        buf.put_u32(u32::MAX);
    }
}

/// Returns the number of bytes `encode_varnumber` would write for `value`.
pub fn varnumber_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= 0xFFFF {
        3
    } else {
        5
    }
}

/// Decodes a TLV variable-length number (used for both Type and Length).
pub fn decode_varnumber(buf: &mut impl Buf) -> Result<u64, Error> {
    if !buf.has_remaining() {
        return Err(Error::OversizeVar);
    }
    let marker = buf.get_u8();
    match marker {
        0..=252 => Ok(marker as u64),
        0xFD => {
            if buf.remaining() < 2 {
                return Err(Error::OversizeVar);
            }
            Ok(buf.get_u16() as u64)
        }
        0xFE => {
            if buf.remaining() < 4 {
                return Err(Error::OversizeVar);
            }
            Ok(buf.get_u32() as u64)
        }
        0xFF => Err(Error::OversizeVar),
        _ => unreachable!(),
    }
}

/// A generic TLV element consisting of a type, length, and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvElement {
    pub tlv_type: u64,
    pub value: Bytes,
}

impl TlvElement {
    /// Creates a new TLV element.
    pub fn new(tlv_type: u64, value: impl Into<Bytes>) -> Self {
        Self {
            tlv_type,
            value: value.into(),
        }
    }

    /// Returns the total length of this TLV element when encoded.
    pub fn encoded_len(&self) -> usize {
        let value_len = self.value.len();
        varnumber_size(self.tlv_type) + varnumber_size(value_len as u64) + value_len
    }

    /// Encodes this TLV element into the provided buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_varnumber(self.tlv_type, buf);
        encode_varnumber(self.value.len() as u64, buf);
        buf.extend_from_slice(&self.value);
    }

    /// Decodes one TLV element from the front of `buf`, advancing it past
    /// the element. Returns `WrongTlvLength` if the declared length runs
    /// past what remains in the buffer.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, Error> {
        let tlv_type = decode_varnumber(buf)?;
        let length = decode_varnumber(buf)? as usize;

        if buf.remaining() < length {
            return Err(Error::WrongTlvLength);
        }

        let value = buf.copy_to_bytes(length);
        Ok(Self { tlv_type, value })
    }

    /// Decodes a TLV element and asserts its type matches `expected`.
    pub fn decode_expecting(buf: &mut impl Buf, expected: u64) -> Result<Self, Error> {
        let element = Self::decode(buf)?;
        if element.tlv_type != expected {
            return Err(Error::WrongTlvType {
                expected,
                actual: element.tlv_type,
            });
        }
        Ok(element)
    }
}

/// Encodes a nonnegative integer as the raw big-endian bytes NDN uses for
/// NonNegativeInteger TLV values (1, 2, 4 or 8 bytes, whichever is shortest).
pub fn encode_nonnegative_integer(value: u64, buf: &mut BytesMut) {
    if value <= u8::MAX as u64 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u32(value as u32);
    } else {
        buf.put_u64(value);
    }
}

/// Decodes a NonNegativeInteger TLV value from a byte slice of length 1, 2, 4 or 8.
pub fn decode_nonnegative_integer(bytes: &[u8]) -> Result<u64, Error> {
    match bytes.len() {
        1 => Ok(bytes[0] as u64),
        2 => Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as u64),
        4 => Ok(u32::from_be_bytes(bytes.try_into().unwrap()) as u64),
        8 => Ok(u64::from_be_bytes(bytes.try_into().unwrap())),
        _ => Err(Error::UnsupportedFormat(format!(
            "NonNegativeInteger of length {}",
            bytes.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varnumber_roundtrip_small() {
        let mut buf = BytesMut::new();
        encode_varnumber(200, &mut buf);
        assert_eq!(buf.len(), 1);
        let mut frozen = buf.freeze();
        assert_eq!(decode_varnumber(&mut frozen).unwrap(), 200);
    }

    #[test]
    fn varnumber_roundtrip_medium() {
        let mut buf = BytesMut::new();
        encode_varnumber(60000, &mut buf);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf[0], 0xFD);
        let mut frozen = buf.freeze();
        assert_eq!(decode_varnumber(&mut frozen).unwrap(), 60000);
    }

    #[test]
    fn varnumber_roundtrip_large() {
        let mut buf = BytesMut::new();
        encode_varnumber(100_000, &mut buf);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], 0xFE);
        let mut frozen = buf.freeze();
        assert_eq!(decode_varnumber(&mut frozen).unwrap(), 100_000);
    }

    #[test]
    fn tlv_roundtrip() {
        let element = TlvElement::new(TLV_NONCE, Bytes::from_static(&[1, 2, 3, 4]));
        let mut buf = BytesMut::new();
        element.encode(&mut buf);
        assert_eq!(buf.len(), element.encoded_len());
        let mut frozen = buf.freeze();
        let decoded = TlvElement::decode(&mut frozen).unwrap();
        assert_eq!(decoded, element);
    }

    #[test]
    fn truncated_value_is_wrong_length() {
        let mut buf = BytesMut::new();
        encode_varnumber(TLV_NONCE, &mut buf);
        encode_varnumber(10, &mut buf);
        buf.extend_from_slice(&[1, 2, 3]);
        let mut frozen = buf.freeze();
        assert_eq!(TlvElement::decode(&mut frozen), Err(Error::WrongTlvLength));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut buf = BytesMut::new();
        TlvElement::new(TLV_NONCE, Bytes::from_static(&[1])).encode(&mut buf);
        let mut frozen = buf.freeze();
        let err = TlvElement::decode_expecting(&mut frozen, TLV_NAME).unwrap_err();
        assert_eq!(
            err,
            Error::WrongTlvType {
                expected: TLV_NAME,
                actual: TLV_NONCE
            }
        );
    }
}
