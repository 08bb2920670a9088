//! `Interest` and `Data` packets, and the `Signature` they optionally carry.

use crate::error::Error;
use crate::name::Name;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Maximum size of the ApplicationParameters carried by a signed Interest.
pub const MAX_PARAMETERS_LEN: usize = 248;
/// Maximum size of a Data packet's Content block.
pub const MAX_CONTENT_LEN: usize = 256;
/// Maximum size of a SignatureValue.
pub const MAX_SIGNATURE_VALUE_LEN: usize = 128;
/// Default Interest lifetime when none is specified.
pub const DEFAULT_INTEREST_LIFETIME_MS: u32 = 4000;

/// The signature scheme named by a `SignatureInfo`'s SignatureType field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignatureType {
    DigestSha256 = 0,
    HmacSha256 = 4,
    EcdsaSha256 = 3,
}

impl SignatureType {
    fn from_u64(v: u64) -> Result<Self, Error> {
        match v {
            0 => Ok(SignatureType::DigestSha256),
            4 => Ok(SignatureType::HmacSha256),
            3 => Ok(SignatureType::EcdsaSha256),
            other => Err(Error::UnsupportedFormat(format!(
                "unknown signature type {other}"
            ))),
        }
    }
}

/// A name identifying the key that produced a `Signature`, carried as a
/// `KeyDigest` (the usual case for HMAC/ECDSA) inside `SignatureInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLocator {
    pub key_name: Name,
}

/// Signature metadata plus value, attached to a `Data` or a signed `Interest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signature_type: SignatureType,
    pub key_locator: Option<KeyLocator>,
    pub value: Bytes,
}

impl Signature {
    pub fn new(signature_type: SignatureType, value: impl Into<Bytes>) -> Result<Self, Error> {
        let value = value.into();
        if value.len() > MAX_SIGNATURE_VALUE_LEN {
            return Err(Error::Oversize {
                what: "signature value",
                actual: value.len(),
                limit: MAX_SIGNATURE_VALUE_LEN,
            });
        }
        Ok(Self {
            signature_type,
            key_locator: None,
            value,
        })
    }

    pub fn with_key_locator(mut self, key_name: Name) -> Self {
        self.key_locator = Some(KeyLocator { key_name });
        self
    }

    fn encode_info(&self, buf: &mut BytesMut) {
        let mut info = BytesMut::new();
        let mut type_buf = BytesMut::new();
        tlv::encode_nonnegative_integer(self.signature_type as u64, &mut type_buf);
        TlvElement::new(tlv::TLV_SIGNATURE_TYPE, type_buf.freeze()).encode(&mut info);

        if let Some(locator) = &self.key_locator {
            let mut locator_buf = BytesMut::new();
            locator.key_name.to_tlv().encode(&mut locator_buf);
            TlvElement::new(tlv::TLV_KEY_LOCATOR, locator_buf.freeze()).encode(&mut info);
        }

        TlvElement::new(tlv::TLV_SIGNATURE_INFO, info.freeze()).encode(buf);
    }

    fn encode_value(&self, buf: &mut BytesMut) {
        TlvElement::new(tlv::TLV_SIGNATURE_VALUE, self.value.clone()).encode(buf);
    }

    fn decode(info_element: &TlvElement, value_element: &TlvElement) -> Result<Self, Error> {
        if value_element.tlv_type != tlv::TLV_SIGNATURE_VALUE {
            return Err(Error::WrongTlvType {
                expected: tlv::TLV_SIGNATURE_VALUE,
                actual: value_element.tlv_type,
            });
        }

        let mut buf = info_element.value.clone();
        let type_element = TlvElement::decode_expecting(&mut buf, tlv::TLV_SIGNATURE_TYPE)?;
        let signature_type = SignatureType::from_u64(tlv::decode_nonnegative_integer(&type_element.value)?)?;

        let mut key_locator = None;
        if buf.has_remaining() {
            let locator_element = TlvElement::decode_expecting(&mut buf, tlv::TLV_KEY_LOCATOR)?;
            let mut inner = locator_element.value.clone();
            let name_element = TlvElement::decode(&mut inner)?;
            key_locator = Some(KeyLocator {
                key_name: Name::from_tlv(&name_element)?,
            });
        }

        Ok(Self {
            signature_type,
            key_locator,
            value: value_element.value.clone(),
        })
    }
}

/// An Interest packet: a name plus selectors, a freshness-only request flag,
/// a routing hop limit, and optionally signed application parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: u32,
    pub lifetime_ms: u32,
    pub hop_limit: Option<u8>,
    pub parameters: Option<Bytes>,
    pub signature: Option<Signature>,
}

impl Interest {
    pub fn new(name: Name, nonce: u32) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce,
            lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            hop_limit: None,
            parameters: None,
            signature: None,
        }
    }

    pub fn with_can_be_prefix(mut self, v: bool) -> Self {
        self.can_be_prefix = v;
        self
    }

    pub fn with_must_be_fresh(mut self, v: bool) -> Self {
        self.must_be_fresh = v;
        self
    }

    pub fn with_lifetime(mut self, ms: u32) -> Self {
        self.lifetime_ms = ms;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = Some(hop_limit);
        self
    }

    pub fn with_parameters(mut self, parameters: impl Into<Bytes>) -> Result<Self, Error> {
        let parameters = parameters.into();
        if parameters.len() > MAX_PARAMETERS_LEN {
            return Err(Error::Oversize {
                what: "interest parameters",
                actual: parameters.len(),
                limit: MAX_PARAMETERS_LEN,
            });
        }
        self.parameters = Some(parameters);
        Ok(self)
    }

    pub fn encode(&self) -> TlvElement {
        let mut body = BytesMut::new();
        self.name.to_tlv().encode(&mut body);

        if self.can_be_prefix {
            TlvElement::new(tlv::TLV_CAN_BE_PREFIX, Bytes::new()).encode(&mut body);
        }
        if self.must_be_fresh {
            TlvElement::new(tlv::TLV_MUST_BE_FRESH, Bytes::new()).encode(&mut body);
        }

        let mut nonce_buf = BytesMut::new();
        nonce_buf.extend_from_slice(&self.nonce.to_be_bytes());
        TlvElement::new(tlv::TLV_NONCE, nonce_buf.freeze()).encode(&mut body);

        let mut lifetime_buf = BytesMut::new();
        tlv::encode_nonnegative_integer(self.lifetime_ms as u64, &mut lifetime_buf);
        TlvElement::new(tlv::TLV_INTEREST_LIFETIME, lifetime_buf.freeze()).encode(&mut body);

        if let Some(hop_limit) = self.hop_limit {
            TlvElement::new(tlv::TLV_HOP_LIMIT, Bytes::copy_from_slice(&[hop_limit])).encode(&mut body);
        }

        if let Some(parameters) = &self.parameters {
            TlvElement::new(tlv::TLV_APPLICATION_PARAMETERS, parameters.clone()).encode(&mut body);
        }

        if let Some(signature) = &self.signature {
            let mut info = BytesMut::new();
            let mut type_buf = BytesMut::new();
            tlv::encode_nonnegative_integer(signature.signature_type as u64, &mut type_buf);
            TlvElement::new(tlv::TLV_SIGNATURE_TYPE, type_buf.freeze()).encode(&mut info);
            TlvElement::new(tlv::TLV_INTEREST_SIGNATURE_INFO, info.freeze()).encode(&mut body);
            TlvElement::new(tlv::TLV_INTEREST_SIGNATURE_VALUE, signature.value.clone()).encode(&mut body);
        }

        TlvElement::new(tlv::TLV_INTEREST, body.freeze())
    }

    pub fn decode(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::WrongTlvType {
                expected: tlv::TLV_INTEREST,
                actual: element.tlv_type,
            });
        }

        let mut buf = element.value.clone();
        let name = Name::from_tlv(&TlvElement::decode_expecting(&mut buf, tlv::TLV_NAME)?)?;

        let mut can_be_prefix = false;
        let mut must_be_fresh = false;
        let mut nonce = 0u32;
        let mut lifetime_ms = DEFAULT_INTEREST_LIFETIME_MS;
        let mut hop_limit = None;
        let mut parameters = None;
        let mut signature_type = None;
        let mut signature_value = None;

        while buf.has_remaining() {
            let inner = TlvElement::decode(&mut buf.clone())?;
            match inner.tlv_type {
                tlv::TLV_CAN_BE_PREFIX => {
                    can_be_prefix = true;
                    TlvElement::decode(&mut buf)?;
                }
                tlv::TLV_MUST_BE_FRESH => {
                    must_be_fresh = true;
                    TlvElement::decode(&mut buf)?;
                }
                tlv::TLV_NONCE => {
                    let element = TlvElement::decode(&mut buf)?;
                    if element.value.len() != 4 {
                        return Err(Error::UnsupportedFormat("nonce must be 4 bytes".into()));
                    }
                    nonce = u32::from_be_bytes(element.value.as_ref().try_into().unwrap());
                }
                tlv::TLV_INTEREST_LIFETIME => {
                    let element = TlvElement::decode(&mut buf)?;
                    lifetime_ms = tlv::decode_nonnegative_integer(&element.value)? as u32;
                }
                tlv::TLV_HOP_LIMIT => {
                    let element = TlvElement::decode(&mut buf)?;
                    if element.value.len() != 1 {
                        return Err(Error::UnsupportedFormat("hop limit must be 1 byte".into()));
                    }
                    hop_limit = Some(element.value[0]);
                }
                tlv::TLV_APPLICATION_PARAMETERS => {
                    let element = TlvElement::decode(&mut buf)?;
                    if element.value.len() > MAX_PARAMETERS_LEN {
                        return Err(Error::Oversize {
                            what: "interest parameters",
                            actual: element.value.len(),
                            limit: MAX_PARAMETERS_LEN,
                        });
                    }
                    parameters = Some(element.value.clone());
                }
                tlv::TLV_INTEREST_SIGNATURE_INFO => {
                    let element = TlvElement::decode(&mut buf)?;
                    let mut inner_buf = element.value.clone();
                    let type_element =
                        TlvElement::decode_expecting(&mut inner_buf, tlv::TLV_SIGNATURE_TYPE)?;
                    signature_type = Some(SignatureType::from_u64(tlv::decode_nonnegative_integer(
                        &type_element.value,
                    )?)?);
                }
                tlv::TLV_INTEREST_SIGNATURE_VALUE => {
                    let element = TlvElement::decode(&mut buf)?;
                    signature_value = Some(element.value.clone());
                }
                unknown => {
                    return Err(Error::UnsupportedFormat(format!(
                        "unexpected TLV {unknown} in Interest"
                    )))
                }
            }
        }

        let signature = match (signature_type, signature_value) {
            (Some(signature_type), Some(value)) => Some(Signature {
                signature_type,
                key_locator: None,
                value,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidPointer("InterestSignatureInfo/Value"));
            }
        };

        Ok(Self {
            name,
            can_be_prefix,
            must_be_fresh,
            nonce,
            lifetime_ms,
            hop_limit,
            parameters,
            signature,
        })
    }
}

/// A Data packet: a name, content, MetaInfo (freshness period) and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub freshness_period_ms: Option<u32>,
    pub content: Bytes,
    pub signature: Signature,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>, signature: Signature) -> Result<Self, Error> {
        let content = content.into();
        if content.len() > MAX_CONTENT_LEN {
            return Err(Error::Oversize {
                what: "data content",
                actual: content.len(),
                limit: MAX_CONTENT_LEN,
            });
        }
        Ok(Self {
            name,
            freshness_period_ms: None,
            content,
            signature,
        })
    }

    pub fn with_freshness_period(mut self, ms: u32) -> Self {
        self.freshness_period_ms = Some(ms);
        self
    }

    pub fn encode(&self) -> TlvElement {
        let mut body = BytesMut::new();
        self.name.to_tlv().encode(&mut body);

        if let Some(freshness) = self.freshness_period_ms {
            let mut meta = BytesMut::new();
            let mut freshness_buf = BytesMut::new();
            tlv::encode_nonnegative_integer(freshness as u64, &mut freshness_buf);
            TlvElement::new(tlv::TLV_FRESHNESS_PERIOD, freshness_buf.freeze()).encode(&mut meta);
            TlvElement::new(tlv::TLV_META_INFO, meta.freeze()).encode(&mut body);
        }

        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(&mut body);
        self.signature.encode_info(&mut body);
        self.signature.encode_value(&mut body);

        TlvElement::new(tlv::TLV_DATA, body.freeze())
    }

    pub fn decode(element: &TlvElement) -> Result<Self, Error> {
        if element.tlv_type != tlv::TLV_DATA {
            return Err(Error::WrongTlvType {
                expected: tlv::TLV_DATA,
                actual: element.tlv_type,
            });
        }

        let mut buf = element.value.clone();
        let name = Name::from_tlv(&TlvElement::decode_expecting(&mut buf, tlv::TLV_NAME)?)?;

        let mut freshness_period_ms = None;
        let next = TlvElement::decode(&mut buf.clone())?;
        if next.tlv_type == tlv::TLV_META_INFO {
            let meta = TlvElement::decode(&mut buf)?;
            let mut meta_buf = meta.value.clone();
            if meta_buf.has_remaining() {
                let freshness_element =
                    TlvElement::decode_expecting(&mut meta_buf, tlv::TLV_FRESHNESS_PERIOD)?;
                freshness_period_ms =
                    Some(tlv::decode_nonnegative_integer(&freshness_element.value)? as u32);
            }
        }

        let content_element = TlvElement::decode_expecting(&mut buf, tlv::TLV_CONTENT)?;
        if content_element.value.len() > MAX_CONTENT_LEN {
            return Err(Error::Oversize {
                what: "data content",
                actual: content_element.value.len(),
                limit: MAX_CONTENT_LEN,
            });
        }

        let info_element = TlvElement::decode_expecting(&mut buf, tlv::TLV_SIGNATURE_INFO)?;
        let value_element = TlvElement::decode_expecting(&mut buf, tlv::TLV_SIGNATURE_VALUE)?;
        let signature = Signature::decode(&info_element, &value_element)?;

        Ok(Self {
            name,
            freshness_period_ms,
            content: content_element.value,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;

    #[test]
    fn interest_roundtrip() {
        let interest = Interest::new(Name::from_str("/a/b").unwrap(), 42)
            .with_can_be_prefix(true)
            .with_must_be_fresh(true)
            .with_hop_limit(10);
        let tlv = interest.encode();
        let decoded = Interest::decode(&tlv).unwrap();
        assert_eq!(decoded, interest);
    }

    #[test]
    fn data_roundtrip() {
        let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
        let data = Data::new(Name::from_str("/a/b").unwrap(), b"hello".to_vec(), sig)
            .unwrap()
            .with_freshness_period(5000);
        let tlv = data.encode();
        let decoded = Data::decode(&tlv).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn oversize_content_rejected() {
        let sig = Signature::new(SignatureType::DigestSha256, vec![0u8; 32]).unwrap();
        let big = vec![0u8; MAX_CONTENT_LEN + 1];
        assert!(Data::new(Name::from_str("/a").unwrap(), big, sig).is_err());
    }
}
