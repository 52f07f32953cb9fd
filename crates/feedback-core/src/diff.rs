use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::interval::IntervalMap;
use crate::pattern::Pattern;
use crate::scan::ForwardSearch;

/// Changed-line classification for one file.
///
/// Line numbers are 1-based; 0 denotes "no line".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineChanges {
    modified: IntervalMap<u32, bool>,
}

impl Default for LineChanges {
    fn default() -> Self {
        Self {
            modified: IntervalMap::new(false),
        }
    }
}

impl LineChanges {
    pub fn is_changed(&self, line: u32) -> bool {
        *self.modified.get(&line)
    }

    /// True when no line is marked changed.
    pub fn is_empty(&self) -> bool {
        self.modified.is_constant() && !self.is_changed(1)
    }

    /// Merge one hunk into the map. The running line counter starts at the
    /// hunk's new-file line; `+` lines are marked changed, `+` and context
    /// lines advance the counter, `-` lines do not.
    fn parse_hunk(&mut self, hunk: &str, patterns: &DiffPatterns) {
        let Some(mut line_number) = parse_starting_line(hunk, patterns) else {
            return;
        };

        let mut search = ForwardSearch::new(hunk);
        while search.next(&patterns.line) {
            if search.matched_text() == "+" {
                self.modified.assign(line_number, line_number + 1, true);
            }
            line_number += 1;
        }
    }
}

/// Per-file changed-line maps parsed from unified-diff output.
#[derive(Clone, Debug, Default)]
pub struct Diff {
    modifications: BTreeMap<PathBuf, LineChanges>,
}

impl Diff {
    /// Parse unified-diff text, merging the sections found into `base`.
    /// Sections that do not look like a diff are skipped.
    pub fn parse(text: &str, base: Self) -> Self {
        let Ok(patterns) = DiffPatterns::new() else {
            return base;
        };

        let mut merged = base;
        let mut search = ForwardSearch::new(text);
        while search.next(&patterns.section) {
            merged.parse_section(search.matched_text(), &patterns);
        }
        merged
    }

    /// The changes of the first stored path that is a component-aligned
    /// suffix of `source`, or the all-false map.
    pub fn changes_for(&self, source: &Path) -> LineChanges {
        for (path, changes) in &self.modifications {
            if source.ends_with(path) {
                return changes.clone();
            }
        }
        LineChanges::default()
    }

    fn parse_section(&mut self, section: &str, patterns: &DiffPatterns) {
        let Some(filename) = parse_filename(section, patterns) else {
            return;
        };

        let changes = self.modifications.entry(filename).or_default();

        let mut search = ForwardSearch::new(section);
        while search.next(&patterns.hunk) {
            changes.parse_hunk(search.matched_text(), patterns);
        }
    }
}

/// The scanner patterns of the unified-diff grammar, compiled once per parse.
struct DiffPatterns {
    /// One or more SCM header lines followed by `--- a/` / `+++ b/` and hunks.
    section: Pattern,
    filename: Pattern,
    hunk: Pattern,
    starting_line: Pattern,
    line: Pattern,
}

impl DiffPatterns {
    fn new() -> Result<Self, crate::Error> {
        Ok(Self {
            section: Pattern::new(
                "(?:^|\n)((?:[a-z].*\n)+[-][-][-] a/.+\n[+][+][+] b/(.+)\n([-+ @].*\n)*)",
            )?,
            filename: Pattern::new("\n[-][-][-] a/.+\n[+][+][+] b/(.+)\n")?,
            hunk: Pattern::new("(@@ [-][,0-9]+ [+][,0-9]+ @@.*\n([-+ ].*\n)*)")?,
            starting_line: Pattern::new("@@ [-][,0-9]+ [+]([0-9]+)[, ].*@@")?,
            line: Pattern::new("\n([+ ])")?,
        })
    }
}

fn parse_filename(section: &str, patterns: &DiffPatterns) -> Option<PathBuf> {
    let mut captures = [None];
    if !patterns
        .filename
        .captures_into(section, &mut captures)
        .unwrap_or(false)
    {
        return None;
    }
    captures[0].map(PathBuf::from)
}

fn parse_starting_line(hunk: &str, patterns: &DiffPatterns) -> Option<u32> {
    let mut captures = [None];
    if !patterns
        .starting_line
        .captures_into(hunk, &mut captures)
        .unwrap_or(false)
    {
        return None;
    }
    captures[0]?.parse().ok()
}
