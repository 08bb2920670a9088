//! Signature verification dispatch.
//!
//! The engine never awaits network I/O itself — when an ECDSA signature
//! names a key the store doesn't have yet, `verify_data`/`verify_interest`
//! return [`VerifyOutcome::NeedsCertificate`] and it is the caller's job
//! (the one that owns both the forwarder and this engine) to express a
//! `CanBePrefix` + `MustBeFresh` Interest for that name and call back in
//! once the certificate Data arrives.
//!
//! The bytes actually hashed/signed are the name plus content (or,
//! for a signed Interest, the name plus application parameters) — this
//! stack doesn't need byte-exact interop with other NDN implementations,
//! only internal consistency between its own signer and verifier.

use bytes::Bytes;
use ndnlt_common::name::Name;
use ndnlt_common::packet::{Data, Interest, Signature, SignatureType};

use crate::crypto::{EcdsaSecp256r1, Hmac, Sha256};
use crate::error::{Error, Result};
use crate::keystore::{key_id_from_keyname, KeyStore};

/// Result of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Failed,
    /// The signature names a key this store doesn't hold; fetch the
    /// certificate at this name and retry.
    NeedsCertificate(Name),
}

/// Dispatches signature verification to the algorithm named in a packet's
/// `SignatureInfo`, using `backend` for the actual crypto.
pub struct SignatureEngine<'a, B> {
    backend: &'a B,
}

impl<'a, B> SignatureEngine<'a, B>
where
    B: Sha256 + Hmac + EcdsaSecp256r1,
{
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn verify_data(&self, data: &Data, keystore: &KeyStore) -> Result<VerifyOutcome> {
        let signed = signed_portion(&data.name, &data.content);
        self.verify(&signed, &data.signature, keystore)
    }

    pub fn verify_interest(&self, interest: &Interest, keystore: &KeyStore) -> Result<VerifyOutcome> {
        let signature = interest
            .signature
            .as_ref()
            .ok_or(Error::UnsupportedSignatureType(0))?;
        let parameters = interest.parameters.as_deref().unwrap_or(&[]);
        let signed = signed_portion(&interest.name, parameters);
        self.verify(&signed, signature, keystore)
    }

    fn verify(&self, signed: &[u8], signature: &Signature, keystore: &KeyStore) -> Result<VerifyOutcome> {
        match signature.signature_type {
            SignatureType::DigestSha256 => {
                let digest = self.backend.digest(signed);
                Ok(if digest.as_ref() == signature.value.as_ref() {
                    VerifyOutcome::Verified
                } else {
                    VerifyOutcome::Failed
                })
            }
            SignatureType::HmacSha256 => {
                let key_name = match &signature.key_locator {
                    Some(locator) => &locator.key_name,
                    None => return Ok(VerifyOutcome::Failed),
                };
                let key_id = key_id_from_keyname(key_name)?;
                let Some(slot) = keystore.find_hmac_key(key_id) else {
                    return Ok(VerifyOutcome::Failed);
                };
                let tag = self.backend.hmac(&slot.key, signed)?;
                Ok(if tag.as_ref() == signature.value.as_ref() {
                    VerifyOutcome::Verified
                } else {
                    VerifyOutcome::Failed
                })
            }
            SignatureType::EcdsaSha256 => {
                let key_name = match &signature.key_locator {
                    Some(locator) => &locator.key_name,
                    None => return Ok(VerifyOutcome::Failed),
                };
                let key_id = key_id_from_keyname(key_name)?;
                if let Some(slot) = keystore.find_trusted_key(key_id) {
                    return Ok(match self.backend.verify(&slot.public_key, signed, &signature.value) {
                        Ok(()) => VerifyOutcome::Verified,
                        Err(_) => VerifyOutcome::Failed,
                    });
                }
                if let Some(slot) = keystore.find_ecc_key(key_id) {
                    return Ok(match self.backend.verify(&slot.public_key, signed, &signature.value) {
                        Ok(()) => VerifyOutcome::Verified,
                        Err(_) => VerifyOutcome::Failed,
                    });
                }
                Ok(VerifyOutcome::NeedsCertificate(key_name.clone()))
            }
        }
    }
}

/// Verifies a just-fetched certificate `cert` against the trust anchor and,
/// on success, installs its key as trusted so a deferred `NeedsCertificate`
/// verification can be retried.
pub fn install_certificate_if_trusted<B>(
    backend: &B,
    cert: &Data,
    keystore: &mut KeyStore,
) -> Result<bool>
where
    B: Sha256 + EcdsaSecp256r1,
{
    let signed = signed_portion(&cert.name, &cert.content);
    let anchor_key = &keystore.trust_anchor_public_key;
    if anchor_key.is_empty() {
        return Ok(false);
    }
    if backend.verify(anchor_key, &signed, &cert.signature.value).is_err() {
        return Ok(false);
    }
    let key_id = key_id_from_keyname(&cert.name)?;
    keystore.add_trusted_certificate(key_id, cert.name.clone(), cert.content.to_vec())?;
    Ok(true)
}

/// Builds the Data this device answers certificate-fetch Interests with
/// under its own identity prefix.
pub fn self_certificate_data(keystore: &KeyStore) -> Result<Data> {
    let name = keystore
        .identity_name
        .clone()
        .ok_or(Error::CryptoBackendFailure("no identity configured".into()))?;
    let signature = Signature::new(SignatureType::DigestSha256, keystore.self_certificate.clone())
        .map_err(Error::Common)?;
    Data::new(name, Bytes::from(keystore.self_certificate.clone()), signature).map_err(Error::Common)
}

fn signed_portion(name: &Name, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(name.encoded_len() + body.len());
    let mut name_tlv = bytes::BytesMut::new();
    name.to_tlv().encode(&mut name_tlv);
    buf.extend_from_slice(&name_tlv);
    buf.extend_from_slice(body);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RingBackend;
    use crate::keystore::KeyStore;
    use ndnlt_common::packet::Signature;

    fn digest_signed_data(name: &str, content: &[u8], backend: &RingBackend) -> Data {
        let name = Name::from_str(name).unwrap();
        let signed = signed_portion(&name, content);
        let digest = backend.digest(&signed);
        let signature = Signature::new(SignatureType::DigestSha256, digest.to_vec()).unwrap();
        Data::new(name, content.to_vec(), signature).unwrap()
    }

    #[test]
    fn digest_signature_verifies() {
        let backend = RingBackend;
        let data = digest_signed_data("/a/b", b"hello", &backend);
        let keystore = KeyStore::new();
        let engine = SignatureEngine::new(&backend);
        assert_eq!(engine.verify_data(&data, &keystore).unwrap(), VerifyOutcome::Verified);
    }

    #[test]
    fn tampered_content_fails_digest_verification() {
        let backend = RingBackend;
        let mut data = digest_signed_data("/a/b", b"hello", &backend);
        data.content = Bytes::from_static(b"tampered");
        let keystore = KeyStore::new();
        let engine = SignatureEngine::new(&backend);
        assert_eq!(engine.verify_data(&data, &keystore).unwrap(), VerifyOutcome::Failed);
    }

    #[test]
    fn hmac_signature_with_missing_key_fails() {
        let backend = RingBackend;
        let name = Name::from_str("/a/b").unwrap();
        let mut key_name = Name::from_str("/device/KEY").unwrap();
        key_name
            .push(ndnlt_common::name::NameComponent::generic(7u32.to_be_bytes().to_vec()).unwrap())
            .unwrap();
        let signature = Signature::new(SignatureType::HmacSha256, vec![0u8; 32])
            .unwrap()
            .with_key_locator(key_name);
        let data = Data::new(name, b"x".to_vec(), signature).unwrap();
        let keystore = KeyStore::new();
        let engine = SignatureEngine::new(&backend);
        assert_eq!(engine.verify_data(&data, &keystore).unwrap(), VerifyOutcome::Failed);
    }
}
