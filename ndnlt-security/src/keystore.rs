//! Fixed-size key storage: identity, trust anchor, and the ECC/HMAC/AES key
//! tables a constrained device keeps resident instead of a general keyring.
//!
//! Every table is a plain array; a slot is empty when its `key_id` equals
//! [`EMPTY_KEY_ID`]. There is no dynamic allocation and no eviction —
//! `insert_empty` fails once a table is full, matching the "no silent grow"
//! discipline of the rest of this stack.

use ndnlt_common::name::Name;

use crate::error::{Error, Result};

/// Sentinel `key_id` marking a slot as unused.
pub const EMPTY_KEY_ID: u32 = 0xFFFF_FFFF;

/// Default number of ECC signing keypairs, HMAC keys, and trusted external
/// public keys the store can hold.
pub const N_SIGN: usize = 4;
/// Default number of AES encryption keys the store can hold.
pub const M_ENCRYPT: usize = 4;

/// An ECC (secp256r1) keypair slot.
#[derive(Debug, Clone)]
pub struct EccKeySlot {
    pub key_id: u32,
    pub public_key: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl EccKeySlot {
    fn empty() -> Self {
        Self {
            key_id: EMPTY_KEY_ID,
            public_key: Vec::new(),
            private_key: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.key_id == EMPTY_KEY_ID
    }
}

/// An HMAC key slot.
#[derive(Debug, Clone)]
pub struct HmacKeySlot {
    pub key_id: u32,
    pub key: Vec<u8>,
}

impl HmacKeySlot {
    fn empty() -> Self {
        Self {
            key_id: EMPTY_KEY_ID,
            key: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.key_id == EMPTY_KEY_ID
    }
}

/// An AES-128 key slot.
#[derive(Debug, Clone)]
pub struct AesKeySlot {
    pub key_id: u32,
    pub key: [u8; 16],
}

impl AesKeySlot {
    fn empty() -> Self {
        Self {
            key_id: EMPTY_KEY_ID,
            key: [0u8; 16],
        }
    }

    fn is_empty(&self) -> bool {
        self.key_id == EMPTY_KEY_ID
    }
}

/// A trusted external public key, installed once a certificate chain to the
/// trust anchor has verified.
#[derive(Debug, Clone)]
pub struct TrustedKeySlot {
    pub key_id: u32,
    pub key_name: Name,
    pub public_key: Vec<u8>,
}

impl TrustedKeySlot {
    fn empty() -> Self {
        Self {
            key_id: EMPTY_KEY_ID,
            key_name: Name::new(),
            public_key: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.key_id == EMPTY_KEY_ID
    }
}

/// This device's own identity, the trust anchor it answers to, and the
/// fixed-size key tables signature verification consults.
pub struct KeyStore {
    pub identity_name: Option<Name>,
    pub identity_private_key: Vec<u8>,
    pub self_certificate: Vec<u8>,

    pub trust_anchor_name: Option<Name>,
    pub trust_anchor_public_key: Vec<u8>,

    ecc_keys: [EccKeySlot; N_SIGN],
    hmac_keys: [HmacKeySlot; N_SIGN],
    aes_keys: [AesKeySlot; M_ENCRYPT],
    trusted_keys: [TrustedKeySlot; N_SIGN],
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            identity_name: None,
            identity_private_key: Vec::new(),
            self_certificate: Vec::new(),
            trust_anchor_name: None,
            trust_anchor_public_key: Vec::new(),
            ecc_keys: std::array::from_fn(|_| EccKeySlot::empty()),
            hmac_keys: std::array::from_fn(|_| HmacKeySlot::empty()),
            aes_keys: std::array::from_fn(|_| AesKeySlot::empty()),
            trusted_keys: std::array::from_fn(|_| TrustedKeySlot::empty()),
        }
    }

    pub fn set_self_identity(&mut self, name: Name, private_key: Vec<u8>, self_certificate: Vec<u8>) {
        self.identity_name = Some(name);
        self.identity_private_key = private_key;
        self.self_certificate = self_certificate;
    }

    pub fn set_trust_anchor(&mut self, name: Name, public_key: Vec<u8>) {
        self.trust_anchor_name = Some(name);
        self.trust_anchor_public_key = public_key;
    }

    pub fn insert_ecc_key(&mut self, key_id: u32, public_key: Vec<u8>, private_key: Vec<u8>) -> Result<()> {
        let slot = self
            .ecc_keys
            .iter_mut()
            .find(|s| s.is_empty())
            .ok_or(Error::KeyStoreFull)?;
        *slot = EccKeySlot {
            key_id,
            public_key,
            private_key,
        };
        Ok(())
    }

    pub fn find_ecc_key(&self, key_id: u32) -> Option<&EccKeySlot> {
        self.ecc_keys.iter().find(|s| !s.is_empty() && s.key_id == key_id)
    }

    pub fn delete_ecc_key(&mut self, key_id: u32) {
        if let Some(slot) = self.ecc_keys.iter_mut().find(|s| s.key_id == key_id) {
            *slot = EccKeySlot::empty();
        }
    }

    pub fn insert_hmac_key(&mut self, key_id: u32, key: Vec<u8>) -> Result<()> {
        let slot = self
            .hmac_keys
            .iter_mut()
            .find(|s| s.is_empty())
            .ok_or(Error::KeyStoreFull)?;
        *slot = HmacKeySlot { key_id, key };
        Ok(())
    }

    pub fn find_hmac_key(&self, key_id: u32) -> Option<&HmacKeySlot> {
        self.hmac_keys.iter().find(|s| !s.is_empty() && s.key_id == key_id)
    }

    pub fn delete_hmac_key(&mut self, key_id: u32) {
        if let Some(slot) = self.hmac_keys.iter_mut().find(|s| s.key_id == key_id) {
            *slot = HmacKeySlot::empty();
        }
    }

    pub fn insert_aes_key(&mut self, key_id: u32, key: [u8; 16]) -> Result<()> {
        let slot = self
            .aes_keys
            .iter_mut()
            .find(|s| s.is_empty())
            .ok_or(Error::KeyStoreFull)?;
        *slot = AesKeySlot { key_id, key };
        Ok(())
    }

    pub fn find_aes_key(&self, key_id: u32) -> Option<&AesKeySlot> {
        self.aes_keys.iter().find(|s| !s.is_empty() && s.key_id == key_id)
    }

    pub fn delete_aes_key(&mut self, key_id: u32) {
        if let Some(slot) = self.aes_keys.iter_mut().find(|s| s.key_id == key_id) {
            *slot = AesKeySlot::empty();
        }
    }

    /// Installs a certificate's public key as trusted, after it has
    /// verified against the trust anchor. Returns `KeyStoreFull` if no slot
    /// remains; the caller is not required to evict.
    pub fn add_trusted_certificate(&mut self, key_id: u32, key_name: Name, public_key: Vec<u8>) -> Result<()> {
        let slot = self
            .trusted_keys
            .iter_mut()
            .find(|s| s.is_empty())
            .ok_or(Error::KeyStoreFull)?;
        *slot = TrustedKeySlot {
            key_id,
            key_name,
            public_key,
        };
        Ok(())
    }

    pub fn find_trusted_key(&self, key_id: u32) -> Option<&TrustedKeySlot> {
        self.trusted_keys.iter().find(|s| !s.is_empty() && s.key_id == key_id)
    }

    pub fn delete_trusted_key(&mut self, key_id: u32) {
        if let Some(slot) = self.trusted_keys.iter_mut().find(|s| s.key_id == key_id) {
            *slot = TrustedKeySlot::empty();
        }
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a key id from the last component of a key name
/// (`/.../KEY/<key-id>`), as a 4-byte big-endian integer.
pub fn key_id_from_keyname(name: &Name) -> Result<u32> {
    component_as_key_id(name, 0)
}

/// Decodes a key id from the third-from-last component of a certificate
/// name (`/.../KEY/<key-id>/<issuer>/<version>`).
pub fn key_id_from_certname(name: &Name) -> Result<u32> {
    component_as_key_id(name, 2)
}

fn component_as_key_id(name: &Name, index_from_back: usize) -> Result<u32> {
    let component = name
        .get_from_back(index_from_back)
        .ok_or(Error::Common(ndnlt_common::Error::InvalidPointer("key id component")))?;
    let value = component.value();
    if value.len() != 4 {
        return Err(Error::WrongKeySize {
            expected: 4,
            actual: value.len(),
        });
    }
    Ok(u32::from_be_bytes(value.as_ref().try_into().unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecc_key_round_trip() {
        let mut store = KeyStore::new();
        store.insert_ecc_key(1, vec![1, 2, 3], vec![4, 5, 6]).unwrap();
        assert!(store.find_ecc_key(1).is_some());
        assert!(store.find_ecc_key(2).is_none());
        store.delete_ecc_key(1);
        assert!(store.find_ecc_key(1).is_none());
    }

    #[test]
    fn full_table_rejects_insert() {
        let mut store = KeyStore::new();
        for i in 0..N_SIGN as u32 {
            store.insert_hmac_key(i, vec![0u8; 32]).unwrap();
        }
        assert!(matches!(store.insert_hmac_key(99, vec![0u8; 32]), Err(Error::KeyStoreFull)));
    }

    #[test]
    fn key_id_from_keyname_decodes_last_component() {
        let mut name = Name::from_str("/device/KEY").unwrap();
        name.push(
            ndnlt_common::name::NameComponent::generic(42u32.to_be_bytes().to_vec()).unwrap(),
        )
        .unwrap();
        assert_eq!(key_id_from_keyname(&name).unwrap(), 42);
    }
}
