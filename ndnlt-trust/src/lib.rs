//! Schematized trust: a small pattern language for expressing which key
//! names are allowed to sign which data names, and the matching engine that
//! evaluates it.
//!
//! This crate has no notion of a forwarder, a keystore or a signature; it
//! answers exactly one question — "does this name authorize that name?" —
//! leaving certificate retrieval and signature verification to
//! `ndnlt-security`.

pub mod error;
pub mod pattern;
pub mod regex;
pub mod rule;

pub use error::{Error, Result};
pub use pattern::{Pattern, PatternElement, PatternKind, MAX_CAPTURES};
pub use rule::{Rule, RuleStore};
