use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::Error;
use crate::pattern::Pattern;

/// Rule identifier with natural alphanumeric ordering.
///
/// An id ending in a numeric suffix of at most five digits sorts by
/// `(prefix, number)`, so `FOO2` comes before `FOO10`. Anything else,
/// including longer digit runs, sorts by the raw string. Equality is
/// string equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuleId {
    raw: String,
}

impl RuleId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `(prefix, number)` when the id is a non-empty digit-free prefix
    /// followed by one to five digits.
    fn numeric_suffix(&self) -> Option<(&str, u32)> {
        let first_digit = self.raw.find(|c: char| c.is_ascii_digit())?;
        if first_digit == 0 {
            return None;
        }
        let (prefix, digits) = self.raw.split_at(first_digit);
        if digits.len() > 5 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some((prefix, digits.parse().ok()?))
    }

    fn sort_key(&self) -> (&str, Option<u32>) {
        self.numeric_suffix()
            .map_or((self.raw.as_str(), None), |(prefix, number)| {
                (prefix, Some(number))
            })
    }
}

impl Ord for RuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for RuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A named pattern bundle with its descriptive attributes.
///
/// All five patterns are wrapped so group 1 denotes the whole supplied
/// pattern.
#[derive(Clone, Debug)]
pub struct Rule {
    pub category: String,
    pub summary: String,
    pub rationale: String,
    pub workaround: String,
    pub matched_files: Pattern,
    pub ignored_files: Pattern,
    pub matched_text: Pattern,
    pub ignored_text: Pattern,
    pub marked_text: Pattern,
}

#[derive(Deserialize)]
struct RawRule {
    category: String,
    summary: String,
    #[serde(default = "not_available")]
    rationale: String,
    #[serde(default = "not_available")]
    workaround: String,
    #[serde(default = "match_everything")]
    matched_files: String,
    #[serde(default = "match_nothing")]
    ignored_files: String,
    matched_text: String,
    #[serde(default = "match_nothing")]
    ignored_text: String,
    #[serde(default = "match_everything")]
    marked_text: String,
}

fn not_available() -> String {
    "N/A".to_string()
}

fn match_everything() -> String {
    ".*".to_string()
}

fn match_nothing() -> String {
    "^$".to_string()
}

impl Rule {
    fn from_raw(raw: RawRule) -> Result<Self, Error> {
        Ok(Self {
            matched_files: Pattern::capture(&raw.matched_files)?,
            ignored_files: Pattern::capture(&raw.ignored_files)?,
            matched_text: Pattern::capture(&raw.matched_text)?,
            ignored_text: Pattern::capture(&raw.ignored_text)?,
            marked_text: Pattern::capture(&raw.marked_text)?,
            category: raw.category,
            summary: raw.summary,
            rationale: raw.rationale,
            workaround: raw.workaround,
        })
    }
}

/// Ordered catalog of rules keyed by identifier.
///
/// Carries the origin of the rules document, which is quoted in the emitted
/// diagnostics.
#[derive(Clone, Debug)]
pub struct RuleSet {
    origin: String,
    rules: BTreeMap<RuleId, Rule>,
}

impl RuleSet {
    /// Decode a rules document. Per-rule field errors name the offending
    /// rule; pattern errors name the offending pattern.
    pub fn from_json(text: &str, origin: impl Into<String>) -> Result<Self, Error> {
        let entries: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|source| Error::InvalidRules {
                reason: source.to_string(),
            })?;

        let mut rules = BTreeMap::new();
        for (id, value) in entries {
            let raw: RawRule =
                serde_json::from_value(value).map_err(|source| Error::InvalidRule {
                    id: id.clone(),
                    reason: source.to_string(),
                })?;
            rules.insert(RuleId::new(id), Rule::from_raw(raw)?);
        }

        Ok(Self {
            origin: origin.into(),
            rules,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
