use regex::Regex;

use crate::Error;

/// Upper bound on the capture slots a single [`Pattern::captures_into`]
/// call may request.
pub const MAX_CAPTURES: usize = 64;

/// A compiled regex capability.
///
/// Rule patterns are compiled through [`Pattern::capture`], which wraps the
/// supplied pattern in one capturing group so that group 1 always denotes
/// the whole pattern. Standard leftmost-first semantics; no backreferences
/// or lookaround.
#[derive(Clone, Debug)]
pub struct Pattern {
    re: Regex,
}

/// A leftmost hit split into three adjacent sub-slices of the searched text:
/// `skipped`, then `matched`, then `remaining` reassemble the input exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Found<'t> {
    pub skipped: &'t str,
    pub matched: &'t str,
    pub remaining: &'t str,
}

impl Pattern {
    /// Compile `pattern` as-is.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        compile(pattern, pattern)
    }

    /// Compile `pattern` wrapped in a single capturing group.
    pub fn capture(pattern: &str) -> Result<Self, Error> {
        compile(pattern, &format!("({pattern})"))
    }

    /// Unanchored containment test.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Unanchored partial match binding successive capture groups into
    /// `slots`. Slots beyond the pattern's group count are set to `None`;
    /// on a miss the slots are left untouched.
    pub fn captures_into<'t>(
        &self,
        text: &'t str,
        slots: &mut [Option<&'t str>],
    ) -> Result<bool, Error> {
        if slots.len() > MAX_CAPTURES {
            return Err(Error::TooManyCaptures);
        }
        let Some(captures) = self.re.captures(text) else {
            return Ok(false);
        };
        for (index, slot) in slots.iter_mut().enumerate() {
            *slot = captures.get(index + 1).map(|group| group.as_str());
        }
        Ok(true)
    }

    /// Leftmost search. `matched` is the first capture group (the whole
    /// wrapped pattern for rule patterns), `skipped` the prefix before it
    /// and `remaining` the suffix after it.
    pub fn find<'t>(&self, text: &'t str) -> Option<Found<'t>> {
        let captures = self.re.captures(text)?;
        let matched = captures.get(1).or_else(|| captures.get(0))?;
        Some(Found {
            skipped: &text[..matched.start()],
            matched: matched.as_str(),
            remaining: &text[matched.end()..],
        })
    }
}

fn compile(pattern: &str, wrapped: &str) -> Result<Pattern, Error> {
    match Regex::new(wrapped) {
        Ok(re) => Ok(Pattern { re }),
        Err(source) => Err(Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }),
    }
}
