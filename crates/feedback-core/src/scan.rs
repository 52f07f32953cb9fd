use crate::pattern::Pattern;

/// The text up to (excluding) the first newline, or all of it.
pub fn first_line_of(text: &str) -> &str {
    match text.find('\n') {
        Some(end) => &text[..end],
        None => text,
    }
}

/// The text after the last newline, or all of it.
pub fn last_line_of(text: &str) -> &str {
    match text.rfind('\n') {
        Some(end) => &text[end + 1..],
        None => text,
    }
}

/// Stateful, single-pass scanner over a source text.
///
/// The source is partitioned into three adjacent slices (processed text,
/// the current match, the remaining text) which reassemble the source at
/// every observable state. Newlines are counted incrementally as text is
/// absorbed into the processed region, so [`ForwardSearch::line`] never
/// re-scans the prefix.
#[derive(Clone, Debug)]
pub struct ForwardSearch<'t> {
    source: &'t str,
    /// End of the processed region, i.e. start of the current match.
    processed_end: usize,
    /// End of the current match, i.e. start of the remaining region.
    match_end: usize,
    processed_line_count: usize,
}

impl<'t> ForwardSearch<'t> {
    pub fn new(source: &'t str) -> Self {
        Self {
            source,
            processed_end: 0,
            match_end: 0,
            processed_line_count: 0,
        }
    }

    /// Advance to the next occurrence of `pattern`.
    ///
    /// Returns `false` when no further match exists or the match is empty;
    /// the empty-match case keeps a pattern like `.*` from looping forever
    /// at the end of the text.
    pub fn next(&mut self, pattern: &Pattern) -> bool {
        self.advance_to(self.match_end);

        let Some(found) = pattern.find(self.remaining()) else {
            return false;
        };

        self.advance_to(self.processed_end + found.skipped.len());
        self.match_end = self.processed_end + found.matched.len();

        !found.matched.is_empty()
    }

    /// Advance until a hit is found whose matched lines do not satisfy
    /// `ignored`.
    pub fn next_except(&mut self, pattern: &Pattern, ignored: &Pattern) -> bool {
        while self.next(pattern) {
            if !ignored.is_match(self.matched_lines()) {
                return true;
            }
        }
        false
    }

    pub fn matched_text(&self) -> &'t str {
        &self.source[self.processed_end..self.match_end]
    }

    /// The excerpt from the first line touched by the current match through
    /// the last one.
    pub fn matched_lines(&self) -> &'t str {
        let start = self.processed_end - last_line_of(self.processed()).len();
        let end = self.match_end + first_line_of(self.remaining()).len();
        &self.source[start..end]
    }

    /// 1-based line number of the first line of the current match.
    pub fn line(&self) -> usize {
        self.processed_line_count + 1
    }

    /// 1-based column of the current match within its first line.
    pub fn column(&self) -> usize {
        last_line_of(self.processed()).len() + 1
    }

    /// Excerpt of the matched lines with the first hit of `mark` inside the
    /// matched text highlighted, falling back to the whole match.
    pub fn highlighted(&self, mark: &Pattern) -> Excerpt<'t> {
        let matched = self.matched_text();
        let mut inner = Self::new(matched);
        if inner.next(mark) {
            Excerpt::new(self.matched_lines(), inner.matched_text())
        } else {
            Excerpt::new(self.matched_lines(), matched)
        }
    }

    fn processed(&self) -> &'t str {
        &self.source[..self.processed_end]
    }

    fn remaining(&self) -> &'t str {
        &self.source[self.match_end..]
    }

    fn advance_to(&mut self, position: usize) {
        let absorbed = &self.source[self.processed_end..position];
        self.processed_line_count += absorbed.bytes().filter(|&byte| byte == b'\n').count();
        self.processed_end = position;
    }
}

/// A line-bounded excerpt with a caret annotation marking a sub-range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Excerpt<'t> {
    pub first_line: &'t str,
    pub indentation: String,
    pub annotation: String,
}

impl<'t> Excerpt<'t> {
    /// Build an excerpt for `mark`, which must be a sub-slice of `text`.
    pub fn new(text: &'t str, mark: &str) -> Self {
        let offset = offset_within(text, mark);
        let width = first_line_of(mark).len();
        let annotation = if width == 0 {
            String::new()
        } else {
            format!("^{}", "~".repeat(width - 1))
        };
        Self {
            first_line: first_line_of(text),
            indentation: " ".repeat(offset),
            annotation,
        }
    }
}

fn offset_within(text: &str, part: &str) -> usize {
    let text_start = text.as_ptr() as usize;
    let part_start = part.as_ptr() as usize;
    debug_assert!(part_start >= text_start);
    debug_assert!(part_start + part.len() <= text_start + text.len());
    part_start - text_start
}
