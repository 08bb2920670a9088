//! The pattern component language: literals, wildcards, regex specializers,
//! subpattern back-references and rule references, plus the capture-group
//! bookkeeping that lets a `key_pattern` refer back into a matched
//! `data_pattern`.
//!
//! `subpattern_info` packs into one byte per the wire-level layout: bit 7 is
//! "this component begins a capture", bit 6 is "this component ends one",
//! bits 5-3 hold the begin index, bits 2-0 hold the end index — so at most
//! eight captures per rule.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::regex::Regex;

/// Maximum number of capture groups a single pattern can use.
pub const MAX_CAPTURES: u8 = 8;

const BEGIN_FLAG: u8 = 0x80;
const END_FLAG: u8 = 0x40;

/// What a single pattern component matches against a name component.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    Literal(Bytes),
    /// `<>` — matches exactly one component, any value.
    Single,
    /// `<>*` — matches zero or more components.
    Sequence,
    /// `[regex]` — matches one component whose value satisfies the regex.
    Specializer(Regex),
    /// `\k` — only meaningful in a `key_pattern`: the span captured by
    /// subpattern `k` in the matched `data_pattern`.
    Backref(u8),
    /// `name()` — a reference to another named rule.
    RuleRef(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub kind: PatternKind,
    pub subpattern_info: u8,
}

impl PatternElement {
    pub fn begin_index(&self) -> Option<u8> {
        (self.subpattern_info & BEGIN_FLAG != 0).then_some((self.subpattern_info >> 3) & 0x7)
    }

    pub fn end_index(&self) -> Option<u8> {
        (self.subpattern_info & END_FLAG != 0).then_some(self.subpattern_info & 0x7)
    }
}

/// A parsed pattern: a sequence of components to match against a `Name`,
/// one pattern component per name component (except around a `Sequence`,
/// which can absorb any number).
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub elements: Vec<PatternElement>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self> {
        let bytes = source.as_bytes();
        let mut i = 0;
        let mut elements: Vec<PatternElement> = Vec::new();
        let mut capture_stack: Vec<u8> = Vec::new();
        let mut pending_begin: Option<u8> = None;
        let mut next_capture = 0u8;

        while i < bytes.len() {
            match bytes[i] {
                b'(' => {
                    if next_capture >= MAX_CAPTURES {
                        return Err(Error::TooManySubpatterns {
                            found: next_capture as usize + 1,
                            limit: MAX_CAPTURES as usize,
                        });
                    }
                    pending_begin = Some(next_capture);
                    capture_stack.push(next_capture);
                    next_capture += 1;
                    i += 1;
                }
                b')' => {
                    let idx = capture_stack
                        .pop()
                        .ok_or_else(|| err(i, "unmatched ')'"))?;
                    let last = elements
                        .last_mut()
                        .ok_or_else(|| err(i, "empty capture group"))?;
                    last.subpattern_info |= END_FLAG | idx;
                    i += 1;
                }
                b'<' => {
                    let close = find(bytes, i, b'>').ok_or_else(|| err(i, "unterminated '<'"))?;
                    let inner = &source[i + 1..close];
                    let (kind, next_i) = if inner.is_empty() {
                        if bytes.get(close + 1) == Some(&b'*') {
                            (PatternKind::Sequence, close + 2)
                        } else {
                            (PatternKind::Single, close + 1)
                        }
                    } else {
                        (PatternKind::Literal(Bytes::copy_from_slice(inner.as_bytes())), close + 1)
                    };
                    elements.push(make_element(kind, &mut pending_begin));
                    i = next_i;
                }
                b'[' => {
                    let close = find(bytes, i, b']').ok_or_else(|| err(i, "unterminated '['"))?;
                    let regex = Regex::compile(&source[i + 1..close])?;
                    elements.push(make_element(PatternKind::Specializer(regex), &mut pending_begin));
                    i = close + 1;
                }
                b'\\' => {
                    let digit = *bytes.get(i + 1).ok_or_else(|| err(i, "dangling '\\'"))?;
                    if !digit.is_ascii_digit() {
                        return Err(err(i, "expected a digit after '\\'"));
                    }
                    elements.push(make_element(PatternKind::Backref(digit - b'0'), &mut pending_begin));
                    i += 2;
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    let start = i;
                    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                        i += 1;
                    }
                    if bytes.get(i) == Some(&b'(') && bytes.get(i + 1) == Some(&b')') {
                        let name = source[start..i].to_string();
                        i += 2;
                        elements.push(make_element(PatternKind::RuleRef(name), &mut pending_begin));
                    } else {
                        return Err(err(start, "bare identifier must be a rule reference, e.g. foo()"));
                    }
                }
                _ => return Err(err(i, "unexpected character")),
            }
        }

        if !capture_stack.is_empty() {
            return Err(err(bytes.len(), "unmatched '('"));
        }

        Ok(Self { elements })
    }
}

fn make_element(kind: PatternKind, pending_begin: &mut Option<u8>) -> PatternElement {
    let mut subpattern_info = 0u8;
    if let Some(idx) = pending_begin.take() {
        subpattern_info |= BEGIN_FLAG | (idx << 3);
    }
    PatternElement { kind, subpattern_info }
}

fn find(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn err(offset: usize, reason: &str) -> Error {
    Error::PatternParseError {
        offset,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_wildcard() {
        let pattern = Pattern::parse("<><article>").unwrap();
        assert_eq!(pattern.elements.len(), 2);
        assert_eq!(pattern.elements[0].kind, PatternKind::Single);
        assert_eq!(pattern.elements[1].kind, PatternKind::Literal(Bytes::from_static(b"article")));
    }

    #[test]
    fn parses_capture_group_around_single_wildcard() {
        let pattern = Pattern::parse("(<>)<article>").unwrap();
        assert_eq!(pattern.elements.len(), 2);
        assert_eq!(pattern.elements[0].kind, PatternKind::Single);
        assert_eq!(pattern.elements[0].begin_index(), Some(0));
        assert_eq!(pattern.elements[0].end_index(), Some(0));
        assert_eq!(pattern.elements[1].kind, PatternKind::Literal(Bytes::from_static(b"article")));
    }

    #[test]
    fn parses_backreference_and_literal() {
        let pattern = Pattern::parse(r"\0<author>").unwrap();
        assert_eq!(pattern.elements[0].kind, PatternKind::Backref(0));
        assert_eq!(pattern.elements[1].kind, PatternKind::Literal(Bytes::from_static(b"author")));
    }

    #[test]
    fn parses_sequence_wildcard_and_rule_ref() {
        let pattern = Pattern::parse("<>*anchor()").unwrap();
        assert_eq!(pattern.elements[0].kind, PatternKind::Sequence);
        assert_eq!(pattern.elements[1].kind, PatternKind::RuleRef("anchor".to_string()));
    }

    #[test]
    fn unmatched_paren_is_an_error() {
        assert!(Pattern::parse("(<>").is_err());
        assert!(Pattern::parse("<>)").is_err());
    }

    #[test]
    fn too_many_captures_is_rejected() {
        let source: String = (0..9).map(|_| "(<>)").collect();
        assert!(matches!(Pattern::parse(&source), Err(Error::TooManySubpatterns { .. })));
    }
}
