//! Named rules (a `data_pattern`/`key_pattern` pair) and the matching
//! algorithm that decides whether a key name is authorized to sign a given
//! data name.

use ndnlt_common::name::Name;

use crate::error::{Error, Result};
use crate::pattern::{Pattern, PatternKind, MAX_CAPTURES};

/// A capture recorded while matching a `data_pattern`: the half-open range
/// of name-component indices the capturing element(s) matched.
type Capture = Option<(usize, usize)>;

/// One named trust rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub data_pattern: Pattern,
    pub key_pattern: Pattern,
}

impl Rule {
    pub fn compile(name: impl Into<String>, data_pattern: &str, key_pattern: &str) -> Result<Self> {
        let name = name.into();
        if name.len() > 64 {
            return Err(Error::RuleNameTooLong(name));
        }
        Ok(Self {
            name,
            data_pattern: Pattern::parse(data_pattern)?,
            key_pattern: Pattern::parse(key_pattern)?,
        })
    }

    /// Whether `key_name` is authorized, under this rule, to sign a Data
    /// packet named `data_name`.
    ///
    /// Returns `Ok(false)` for an ordinary non-match, `Err` only when the
    /// rule itself can't be evaluated (e.g. it references another rule).
    pub fn matches(&self, data_name: &Name, key_name: &Name) -> Result<bool> {
        if has_rule_ref(&self.key_pattern) || has_rule_ref(&self.data_pattern) {
            return Err(Error::RuleReferencingNotImplemented);
        }
        let Some(captures) = match_data_pattern(&self.data_pattern, data_name) else {
            return Ok(false);
        };
        Ok(match_key_pattern(&self.key_pattern, key_name, data_name, &captures))
    }
}

fn has_rule_ref(pattern: &Pattern) -> bool {
    pattern.elements.iter().any(|e| matches!(e.kind, PatternKind::RuleRef(_)))
}

/// Matches `pattern` against `name`, returning the per-subpattern capture
/// ranges (indexed by name-component position) on success.
///
/// Supports at most one `<>*` element; patterns with more than one are
/// rejected at the storage layer (see `RuleStore::insert`), not here.
fn match_data_pattern(pattern: &Pattern, name: &Name) -> Option<[Capture; MAX_CAPTURES as usize]> {
    let seq_pos = pattern.elements.iter().position(|e| matches!(e.kind, PatternKind::Sequence));
    let mut begins: [Option<usize>; MAX_CAPTURES as usize] = [None; MAX_CAPTURES as usize];
    let mut ends: [Option<usize>; MAX_CAPTURES as usize] = [None; MAX_CAPTURES as usize];

    match seq_pos {
        None => {
            if pattern.elements.len() != name.len() {
                return None;
            }
            for (i, element) in pattern.elements.iter().enumerate() {
                let component = name.get(i)?;
                if !match_simple(&element.kind, component.value())? {
                    return None;
                }
                record(element, i, &mut begins, &mut ends);
            }
        }
        Some(k) => {
            let prefix = &pattern.elements[..k];
            let suffix = &pattern.elements[k + 1..];
            if prefix.len() + suffix.len() > name.len() {
                return None;
            }
            for (i, element) in prefix.iter().enumerate() {
                let component = name.get(i)?;
                if !match_simple(&element.kind, component.value())? {
                    return None;
                }
                record(element, i, &mut begins, &mut ends);
            }
            let suffix_start = name.len() - suffix.len();
            for (j, element) in suffix.iter().enumerate() {
                let name_index = suffix_start + j;
                let component = name.get(name_index)?;
                if !match_simple(&element.kind, component.value())? {
                    return None;
                }
                record(element, name_index, &mut begins, &mut ends);
            }
            record(&pattern.elements[k], prefix.len(), &mut begins, &mut ends);
            if let Some(idx) = pattern.elements[k].end_index() {
                ends[idx as usize] = Some(suffix_start);
            }
        }
    }

    let mut captures: [Capture; MAX_CAPTURES as usize] = [None; MAX_CAPTURES as usize];
    for i in 0..MAX_CAPTURES as usize {
        if let (Some(b), Some(e)) = (begins[i], ends[i]) {
            captures[i] = Some((b, e));
        }
    }
    Some(captures)
}

fn record(
    element: &crate::pattern::PatternElement,
    name_index: usize,
    begins: &mut [Option<usize>; MAX_CAPTURES as usize],
    ends: &mut [Option<usize>; MAX_CAPTURES as usize],
) {
    if let Some(idx) = element.begin_index() {
        begins[idx as usize] = Some(name_index);
    }
    if let Some(idx) = element.end_index() {
        ends[idx as usize] = Some(name_index + 1);
    }
}

fn match_simple(kind: &PatternKind, value: &[u8]) -> Option<bool> {
    Some(match kind {
        PatternKind::Literal(expected) => expected.as_ref() == value,
        PatternKind::Single => true,
        PatternKind::Specializer(regex) => regex.is_match(value),
        PatternKind::Sequence | PatternKind::Backref(_) | PatternKind::RuleRef(_) => return None,
    })
}

/// Matches a `key_pattern` against `key_name`, with `\k` elements resolved
/// against the capture ranges recorded while matching the `data_pattern`
/// against `data_name`.
fn match_key_pattern(
    pattern: &Pattern,
    key_name: &Name,
    data_name: &Name,
    captures: &[Capture; MAX_CAPTURES as usize],
) -> bool {
    let mut cursor = 0usize;
    for element in &pattern.elements {
        match &element.kind {
            PatternKind::Backref(k) => {
                let Some((begin, end)) = captures.get(*k as usize).copied().flatten() else {
                    return false;
                };
                let span = end - begin;
                if cursor + span > key_name.len() {
                    return false;
                }
                for j in 0..span {
                    let data_value = data_name.get(begin + j).map(|c| c.value());
                    let key_value = key_name.get(cursor + j).map(|c| c.value());
                    if data_value != key_value {
                        return false;
                    }
                }
                cursor += span;
            }
            PatternKind::RuleRef(_) => return false,
            PatternKind::Sequence => return false,
            _ => {
                let Some(component) = key_name.get(cursor) else {
                    return false;
                };
                match match_simple(&element.kind, component.value()) {
                    Some(true) => cursor += 1,
                    _ => return false,
                }
            }
        }
    }
    cursor == key_name.len()
}

/// Fixed-capacity, replace-by-name store for trust rules.
pub struct RuleStore {
    rules: Vec<Rule>,
    capacity: usize,
}

impl RuleStore {
    pub fn new(capacity: usize) -> Self {
        Self { rules: Vec::with_capacity(capacity), capacity }
    }

    /// Inserts `rule`, replacing any existing rule with the same name.
    pub fn insert(&mut self, rule: Rule) -> Result<()> {
        if count_sequences(&rule.data_pattern) > 1 {
            return Err(Error::PatternParseError {
                offset: 0,
                reason: "at most one <>* wildcard is supported per data_pattern".to_string(),
            });
        }
        if let Some(existing) = self.rules.iter_mut().find(|r| r.name == rule.name) {
            *existing = rule;
            return Ok(());
        }
        if self.rules.len() >= self.capacity {
            return Err(Error::RuleStorageFull);
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        let idx = self.rules.iter().position(|r| r.name == name)?;
        Some(self.rules.remove(idx))
    }

    /// Whether `key_name` is authorized to sign `data_name` under any stored
    /// rule whose `data_pattern` matches `data_name`.
    pub fn authorize(&self, data_name: &Name, key_name: &Name) -> Result<bool> {
        for rule in &self.rules {
            if match_data_pattern(&rule.data_pattern, data_name).is_none() {
                continue;
            }
            if rule.matches(data_name, key_name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn count_sequences(pattern: &Pattern) -> usize {
    pattern.elements.iter().filter(|e| matches!(e.kind, PatternKind::Sequence)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn worked_example_matches_same_leading_component() {
        let rule = Rule::compile("article-rule", "(<>)<article>", r"\0<author>").unwrap();
        assert!(rule.matches(&name("/alice/article"), &name("/alice/author")).unwrap());
        assert!(!rule.matches(&name("/alice/article"), &name("/bob/author")).unwrap());
    }

    #[test]
    fn wrong_length_data_name_does_not_match() {
        let rule = Rule::compile("article-rule", "(<>)<article>", r"\0<author>").unwrap();
        assert!(!rule.matches(&name("/alice/extra/article"), &name("/alice/author")).unwrap());
    }

    #[test]
    fn sequence_wildcard_captures_middle_span() {
        let rule = Rule::compile("prefix-rule", "(<org><>*)<data>", r"\0<KEY>").unwrap();
        assert!(rule
            .matches(&name("/org/site/a/data"), &name("/org/site/a/KEY"))
            .unwrap());
        assert!(!rule
            .matches(&name("/org/site/a/data"), &name("/org/site/b/KEY"))
            .unwrap());
    }

    #[test]
    fn rule_store_replaces_by_name() {
        let mut store = RuleStore::new(4);
        store
            .insert(Rule::compile("r", "<a>", "<b>").unwrap())
            .unwrap();
        store
            .insert(Rule::compile("r", "<c>", "<d>").unwrap())
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("r").unwrap().data_pattern.elements.len(), 1);
    }

    #[test]
    fn rule_store_rejects_past_capacity() {
        let mut store = RuleStore::new(1);
        store
            .insert(Rule::compile("r1", "<a>", "<b>").unwrap())
            .unwrap();
        let err = store.insert(Rule::compile("r2", "<a>", "<b>").unwrap()).unwrap_err();
        assert_eq!(err, Error::RuleStorageFull);
    }

    #[test]
    fn rule_referencing_another_rule_is_rejected_at_match_time() {
        let rule = Rule::compile("r", "<a>anchor()", "<b>").unwrap();
        let err = rule.matches(&name("/a/x"), &name("/b")).unwrap_err();
        assert_eq!(err, Error::RuleReferencingNotImplemented);
    }
}
