//! Errors raised by the forwarder core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] ndnlt_common::Error),

    #[error("face table is full")]
    FaceTableFull,

    #[error("no such face {0}")]
    NoSuchFace(u16),

    #[error("FIB is full")]
    FibFull,

    #[error("PIT is full")]
    PitFull,

    #[error("content store is full")]
    CsFull,

    #[error("face {0} is down")]
    FaceDown(u16),

    #[error("no FIB route for {0}")]
    NoRoute(ndnlt_common::name::Name),

    #[error("interest rejected: {0}")]
    InterestRejected(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
