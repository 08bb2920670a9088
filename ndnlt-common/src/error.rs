//! Error types shared by the TLV codec, name tree and message queue.

use thiserror::Error;

/// All possible errors that can occur within the common wire-format layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A TLV's length field claims more bytes than remain in the buffer.
    #[error("TLV length runs past the end of the buffer")]
    WrongTlvLength,

    /// The outer TLV type differs from the one a decoder expected.
    #[error("expected TLV type {expected}, got {actual}")]
    WrongTlvType { expected: u64, actual: u64 },

    /// A variable-length integer's prefix byte promises more bytes than are available.
    #[error("variable-length integer truncated")]
    OversizeVar,

    /// A buffer is larger than a configured limit (name, component, parameters, content...).
    #[error("{what} is oversize: {actual} > {limit}")]
    Oversize {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    /// A name string did not start with `/` or otherwise failed to parse.
    #[error("invalid name format: {0}")]
    InvalidNameFormat(String),

    /// A required field was missing where the wire format mandates its presence.
    #[error("invalid pointer: missing required field {0}")]
    InvalidPointer(&'static str),

    /// A packet's shape does not match what the caller asked to decode (e.g. a Name passed
    /// where an Interest was expected).
    #[error("unsupported packet format: {0}")]
    UnsupportedFormat(String),

    /// The NameTree's fixed-size entry pool has no free slots left.
    #[error("name tree is full")]
    NameTreeFull,

    /// The message queue ring buffer has no room for this message.
    #[error("message queue is full")]
    MsgQueueFull,

    /// An assembler was fed a fragment after the final one for its identifier.
    #[error("no more fragments expected for fragment id {0}")]
    NoMoreFragments(u16),

    /// A fragment arrived with a sequence number lower than one already seen.
    #[error("out-of-order fragment: expected sequence {expected}, got {actual}")]
    OutOfOrderFragment { expected: u8, actual: u8 },

    /// A fragment's id didn't match the identifier the assembler was reassembling.
    #[error("wrong fragment id: expected {expected}, got {actual}")]
    WrongFragmentId { expected: u16, actual: u16 },

    /// More than 31 fragments would be needed to carry a packet at this MTU.
    #[error("packet needs more than {0} fragments, the format's sequence number cannot address that many")]
    TooManyFragments(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
