//! Hierarchical names: `NameComponent` and `Name`.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum encoded length of a single name component's value.
pub const MAX_COMPONENT_LEN: usize = 36;
/// Maximum number of components in a `Name`.
pub const MAX_NAME_COMPONENTS: usize = 10;
/// Maximum total encoded size of a `Name` TLV, including the outer T and L.
pub const MAX_NAME_ENCODED_LEN: usize = 384;

/// The type tag carried by a name component, per NDN Packet Format 0.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Generic,
    ImplicitSha256Digest,
    ParametersSha256Digest,
    Keyword,
    Segment,
    ByteOffset,
    Version,
    Timestamp,
    SequenceNum,
}

impl ComponentKind {
    fn tlv_type(self) -> u64 {
        match self {
            ComponentKind::Generic => tlv::TLV_GENERIC_NAME_COMPONENT,
            ComponentKind::ImplicitSha256Digest => tlv::TLV_IMPLICIT_SHA256_DIGEST_COMPONENT,
            ComponentKind::ParametersSha256Digest => tlv::TLV_PARAMETERS_SHA256_DIGEST_COMPONENT,
            ComponentKind::Keyword => tlv::TLV_KEYWORD_NAME_COMPONENT,
            ComponentKind::Segment => tlv::TLV_SEGMENT_NAME_COMPONENT,
            ComponentKind::ByteOffset => tlv::TLV_BYTE_OFFSET_NAME_COMPONENT,
            ComponentKind::Version => tlv::TLV_VERSION_NAME_COMPONENT,
            ComponentKind::Timestamp => tlv::TLV_TIMESTAMP_NAME_COMPONENT,
            ComponentKind::SequenceNum => tlv::TLV_SEQUENCE_NUM_NAME_COMPONENT,
        }
    }

    fn from_tlv_type(t: u64) -> Option<Self> {
        Some(match t {
            tlv::TLV_GENERIC_NAME_COMPONENT => ComponentKind::Generic,
            tlv::TLV_IMPLICIT_SHA256_DIGEST_COMPONENT => ComponentKind::ImplicitSha256Digest,
            tlv::TLV_PARAMETERS_SHA256_DIGEST_COMPONENT => ComponentKind::ParametersSha256Digest,
            tlv::TLV_KEYWORD_NAME_COMPONENT => ComponentKind::Keyword,
            tlv::TLV_SEGMENT_NAME_COMPONENT => ComponentKind::Segment,
            tlv::TLV_BYTE_OFFSET_NAME_COMPONENT => ComponentKind::ByteOffset,
            tlv::TLV_VERSION_NAME_COMPONENT => ComponentKind::Version,
            tlv::TLV_TIMESTAMP_NAME_COMPONENT => ComponentKind::Timestamp,
            tlv::TLV_SEQUENCE_NUM_NAME_COMPONENT => ComponentKind::SequenceNum,
            _ => return None,
        })
    }

    /// Whether this kind's value is a NonNegativeInteger rather than an opaque byte string.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ComponentKind::Segment
                | ComponentKind::ByteOffset
                | ComponentKind::Version
                | ComponentKind::Timestamp
                | ComponentKind::SequenceNum
        )
    }
}

/// A single typed component of a `Name`. Components compare by kind, then by
/// the lexicographic order of their encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent {
    kind: ComponentKind,
    value: Bytes,
}

impl NameComponent {
    /// Builds a generic component from raw bytes, the common case for ordinary
    /// path segments (e.g. `/some/generic/component`).
    pub fn generic(value: impl Into<Bytes>) -> Result<Self, Error> {
        Self::new(ComponentKind::Generic, value.into())
    }

    /// Builds a numeric component (segment, version, timestamp, ...), encoding
    /// `value` in the minimum-width big-endian form the wire format requires.
    pub fn numeric(kind: ComponentKind, value: u64) -> Result<Self, Error> {
        debug_assert!(kind.is_numeric());
        let mut buf = BytesMut::new();
        tlv::encode_nonnegative_integer(value, &mut buf);
        Self::new(kind, buf.freeze())
    }

    /// Reads back the integer carried by a numeric component.
    pub fn as_numeric(&self) -> Result<u64, Error> {
        if !self.kind.is_numeric() {
            return Err(Error::UnsupportedFormat(format!(
                "{:?} component is not numeric",
                self.kind
            )));
        }
        tlv::decode_nonnegative_integer(&self.value)
    }

    pub fn new(kind: ComponentKind, value: impl Into<Bytes>) -> Result<Self, Error> {
        let value = value.into();
        if value.len() > MAX_COMPONENT_LEN {
            return Err(Error::Oversize {
                what: "name component",
                actual: value.len(),
                limit: MAX_COMPONENT_LEN,
            });
        }
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn to_tlv(&self) -> TlvElement {
        TlvElement::new(self.kind.tlv_type(), self.value.clone())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        let kind = ComponentKind::from_tlv_type(element.tlv_type).ok_or_else(|| {
            Error::UnsupportedFormat(format!("unknown name component TLV type {}", element.tlv_type))
        })?;
        Self::new(kind, element.value.clone())
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.value.as_ref().cmp(other.value.as_ref()))
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self.value.iter().all(|&b| b.is_ascii_graphic() || b == b' ');
        if printable {
            write!(f, "{}", String::from_utf8_lossy(&self.value))
        } else {
            write!(f, "0x")?;
            for &b in self.value.iter() {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }
}

/// An ordered sequence of up to [`MAX_NAME_COMPONENTS`] components, immutable
/// once built. Comparison is lexicographic over components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Name {
    components: Vec<NameComponent>,
}

impl Name {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parses a `/`-separated path of generic components, e.g. `/a/b/c`.
    /// Leading and trailing slashes and empty segments are ignored.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        let mut name = Self::new();
        for segment in s.split('/').filter(|s| !s.is_empty()) {
            name.push(NameComponent::generic(segment.as_bytes().to_vec())?)?;
        }
        Ok(name)
    }

    pub fn push(&mut self, component: NameComponent) -> Result<&mut Self, Error> {
        if self.components.len() >= MAX_NAME_COMPONENTS {
            return Err(Error::Oversize {
                what: "name components",
                actual: self.components.len() + 1,
                limit: MAX_NAME_COMPONENTS,
            });
        }
        self.components.push(component);
        if self.encoded_len() > MAX_NAME_ENCODED_LEN {
            self.components.pop();
            return Err(Error::Oversize {
                what: "encoded name",
                actual: self.encoded_len(),
                limit: MAX_NAME_ENCODED_LEN,
            });
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    /// The component at `index` counting back from the end (0 is the last
    /// component). Used by key-id extraction in `ndnlt-security`.
    pub fn get_from_back(&self, index_from_back: usize) -> Option<&NameComponent> {
        let len = self.components.len();
        if index_from_back >= len {
            return None;
        }
        self.components.get(len - 1 - index_from_back)
    }

    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub fn encoded_len(&self) -> usize {
        let value_len: usize = self.components.iter().map(|c| c.to_tlv().encoded_len()).sum();
        crate::tlv::varnumber_size(tlv::TLV_NAME) + crate::tlv::varnumber_size(value_len as u64) + value_len
    }

    pub fn to_tlv(&self) -> TlvElement {
        let mut buf = BytesMut::new();
        for component in &self.components {
            component.to_tlv().encode(&mut buf);
        }
        TlvElement::new(tlv::TLV_NAME, buf.freeze())
    }

    pub fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_NAME {
            return Err(Error::WrongTlvType {
                expected: tlv::TLV_NAME,
                actual: element.tlv_type,
            });
        }

        let mut name = Self::new();
        let mut buf = element.value.clone();
        while buf.has_remaining() {
            let inner = TlvElement::decode(&mut buf)?;
            name.push(NameComponent::from_tlv(&inner)?)?;
        }
        Ok(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple_name() {
        let name = Name::from_str("/test/apple").unwrap();
        assert_eq!(name.len(), 2);
        let tlv = name.to_tlv();
        let decoded = Name::from_tlv(&tlv).unwrap();
        assert_eq!(decoded, name);
        assert_eq!(decoded.get(0).unwrap().to_string(), "test");
        assert_eq!(decoded.get(1).unwrap().to_string(), "apple");
    }

    #[test]
    fn is_prefix_of() {
        let a = Name::from_str("/a/b").unwrap();
        let b = Name::from_str("/a/b/c").unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
    }

    #[test]
    fn rejects_too_many_components() {
        let mut name = Name::new();
        for i in 0..MAX_NAME_COMPONENTS {
            name.push(NameComponent::generic(format!("c{i}").into_bytes())).unwrap_or_else(|_| panic!("push {i}"));
        }
        let err = name.push(NameComponent::generic(b"overflow".to_vec()).unwrap());
        assert!(err.is_err());
    }

    #[test]
    fn rejects_oversize_component() {
        let big = vec![0u8; MAX_COMPONENT_LEN + 1];
        assert!(NameComponent::generic(big).is_err());
    }

    #[test]
    fn numeric_component_roundtrip() {
        let c = NameComponent::numeric(ComponentKind::Segment, 300).unwrap();
        assert_eq!(c.as_numeric().unwrap(), 300);
    }

    #[test]
    fn ordering_is_by_kind_then_value() {
        let a = NameComponent::generic(b"a".to_vec()).unwrap();
        let b = NameComponent::generic(b"b".to_vec()).unwrap();
        assert!(a < b);
    }
}
