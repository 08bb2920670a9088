//! Errors raised by pattern parsing, rule storage and matching.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("rule storage is full")]
    RuleStorageFull,

    #[error("rule name {0:?} is too long")]
    RuleNameTooLong(String),

    #[error("pattern parse error at offset {offset}: {reason}")]
    PatternParseError { offset: usize, reason: String },

    #[error("subpattern index {0} is out of range")]
    SubpatternIndexOutOfRange(u8),

    #[error("pattern uses {found} captures, limit is {limit}")]
    TooManySubpatterns { found: usize, limit: usize },

    #[error("rule {0:?} not found")]
    NoSuchRule(String),

    #[error("rule-to-rule referencing is not implemented")]
    RuleReferencingNotImplemented,
}

pub type Result<T> = std::result::Result<T, Error>;
