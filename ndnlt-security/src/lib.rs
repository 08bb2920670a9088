//! Fixed-size key storage and signature verification.
//!
//! This crate has no notion of a forwarder or a network; `signer` returns a
//! [`signer::VerifyOutcome::NeedsCertificate`] when it can't resolve a key
//! rather than fetching one itself, so the crate stays usable without
//! depending on `ndnlt-forwarder`. The caller that owns both wires the two
//! together (express an Interest, call back into `install_certificate_if_trusted`
//! once the Data arrives).

pub mod crypto;
pub mod error;
pub mod keystore;
pub mod signer;

pub use error::{Error, Result};
pub use keystore::KeyStore;
pub use signer::{SignatureEngine, VerifyOutcome};
