//! Narrow trait seams over the cryptographic primitives the signature
//! engine needs. Nothing above this module ever names `ring` directly;
//! a target without hardware-accelerated ECC or AES can swap in its own
//! `CryptoBackend` impl without touching `signer.rs`.

use crate::error::{Error, Result};

pub const SHA256_OUTPUT_LEN: usize = 32;
pub const HMAC_SHA256_OUTPUT_LEN: usize = 32;
pub const AES128_KEY_LEN: usize = 16;
pub const AES_IV_LEN: usize = 16;
pub const ECDSA_P256_SIGNATURE_MAX_LEN: usize = 72;
pub const ECDSA_P256_PUBLIC_KEY_LEN: usize = 65;

pub trait Sha256 {
    fn digest(&self, data: &[u8]) -> [u8; SHA256_OUTPUT_LEN];
}

pub trait Hmac {
    fn hmac(&self, key: &[u8], data: &[u8]) -> Result<[u8; HMAC_SHA256_OUTPUT_LEN]>;
}

pub trait Aes128Cbc {
    fn encrypt(&self, key: &[u8; AES128_KEY_LEN], iv: &[u8; AES_IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, key: &[u8; AES128_KEY_LEN], iv: &[u8; AES_IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

pub trait EcdsaSecp256r1 {
    /// Verifies `signature` (DER-encoded) over `data` against `public_key`
    /// (uncompressed SEC1 point).
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<()>;
}

pub trait EcdhSecp256r1 {
    /// Derives a shared secret from an ephemeral private key and a peer's
    /// uncompressed SEC1 public key.
    fn agree(&self, private_key: &[u8], peer_public_key: &[u8]) -> Result<Vec<u8>>;
}

pub trait Rng {
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Default backend: `ring` for hashing/HMAC/ECDSA and the system RNG for
/// key material, matching the ring-based crypto already pulled in for TLS
/// by the transport layer's certificate handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct RingBackend;

impl Sha256 for RingBackend {
    fn digest(&self, data: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
        let digest = ring::digest::digest(&ring::digest::SHA256, data);
        let mut out = [0u8; SHA256_OUTPUT_LEN];
        out.copy_from_slice(digest.as_ref());
        out
    }
}

impl Hmac for RingBackend {
    fn hmac(&self, key: &[u8], data: &[u8]) -> Result<[u8; HMAC_SHA256_OUTPUT_LEN]> {
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key);
        let tag = ring::hmac::sign(&key, data);
        let mut out = [0u8; HMAC_SHA256_OUTPUT_LEN];
        out.copy_from_slice(tag.as_ref());
        Ok(out)
    }
}

impl EcdsaSecp256r1 for RingBackend {
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<()> {
        let key = ring::signature::UnparsedPublicKey::new(
            &ring::signature::ECDSA_P256_SHA256_ASN1,
            public_key,
        );
        key.verify(data, signature)
            .map_err(|_| Error::VerificationFailed)
    }
}

impl EcdhSecp256r1 for RingBackend {
    fn agree(&self, private_key: &[u8], peer_public_key: &[u8]) -> Result<Vec<u8>> {
        let rng = ring::rand::SystemRandom::new();
        let my_private = ring::agreement::EphemeralPrivateKey::from_private_key_and_rng(
            &ring::agreement::ECDH_P256,
            private_key,
            &rng,
        )
        .map_err(|e| Error::CryptoBackendFailure(e.to_string()))?;
        let peer = ring::agreement::UnparsedPublicKey::new(&ring::agreement::ECDH_P256, peer_public_key);
        ring::agreement::agree_ephemeral(my_private, &peer, Error::VerificationFailed, |secret| {
            Ok(secret.to_vec())
        })
    }
}

impl Rng for RingBackend {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        use ring::rand::SecureRandom;
        ring::rand::SystemRandom::new()
            .fill(dest)
            .map_err(|e| Error::CryptoBackendFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic_and_32_bytes() {
        let backend = RingBackend;
        let a = backend.digest(b"abc");
        let b = backend.digest(b"abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), SHA256_OUTPUT_LEN);
        assert_ne!(a, backend.digest(b"abd"));
    }

    #[test]
    fn hmac_is_deterministic_for_same_key_and_data() {
        let backend = RingBackend;
        let a = backend.hmac(b"secret", b"message").unwrap();
        let b = backend.hmac(b"secret", b"message").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rng_fills_without_error() {
        let backend = RingBackend;
        let mut buf = [0u8; 16];
        backend.fill(&mut buf).unwrap();
    }
}
