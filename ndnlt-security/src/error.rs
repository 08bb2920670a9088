//! Errors raised by key storage and signature verification.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] ndnlt_common::Error),

    #[error("key storage has no free slot for this key kind")]
    KeyStoreFull,

    #[error("no key with id {0:#010x}")]
    KeyNotFound(u32),

    #[error("wrong key size: expected {expected}, got {actual}")]
    WrongKeySize { expected: usize, actual: usize },

    #[error("wrong signature size: expected {expected}, got {actual}")]
    WrongSignatureSize { expected: usize, actual: usize },

    #[error("unsupported signature type {0}")]
    UnsupportedSignatureType(u8),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("crypto backend failure: {0}")]
    CryptoBackendFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
