use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::debug;

use crate::Error;
use crate::diff::{Diff, LineChanges};
use crate::render::{Header, MatchBlock, SourceMarker};
use crate::rules::{Rule, RuleId, RuleSet};
use crate::scan::ForwardSearch;
use crate::workflow::{Scope, Severity, Workflow};

/// Counters aggregated over one generator run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Sources scanned.
    pub sources: usize,
    /// Bytes of source text scanned.
    pub bytes: u64,
    /// Match blocks emitted.
    pub matches: usize,
}

impl Stats {
    const fn merge(self, other: Self) -> Self {
        Self {
            sources: self.sources + other.sources,
            bytes: self.bytes + other.bytes,
            matches: self.matches + other.matches,
        }
    }
}

/// Which lines of a relevant file a rule may fire on.
enum LineFilter<'c> {
    All,
    Changed(&'c LineChanges),
}

impl LineFilter<'_> {
    fn allows(&self, line: usize) -> bool {
        match self {
            Self::All => true,
            Self::Changed(changes) => {
                changes.is_changed(u32::try_from(line).unwrap_or(u32::MAX))
            }
        }
    }
}

/// Generate the diagnostic artifact for `sources` into `out`.
///
/// The header is written first; sources are then scanned in parallel, rules
/// in parallel within each source. Each source's output is buffered and
/// committed to `out` in one write, so a source's block is contiguous in
/// the stream while the order of sources is scheduling-dependent.
pub fn generate<W: Write + Send>(
    rules: &RuleSet,
    workflow: &Workflow,
    diff: &Diff,
    sources: &[String],
    mut out: W,
) -> Result<Stats, Error> {
    let header = Header { rules, workflow }.to_string();
    out.write_all(header.as_bytes())
        .map_err(|source| Error::Output { source })?;

    let sink = Mutex::new(out);
    let stats = sources
        .par_iter()
        .map(|path| {
            let (block, stats) = scan_source(path, rules, workflow, diff)?;
            let mut guard = match sink.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .write_all(block.as_bytes())
                .map_err(|source| Error::Output { source })?;
            Ok(stats)
        })
        .try_reduce(Stats::default, |left, right| Ok(left.merge(right)))?;

    let mut out = match sink.into_inner() {
        Ok(out) => out,
        Err(poisoned) => poisoned.into_inner(),
    };
    out.flush().map_err(|source| Error::Output { source })?;
    Ok(stats)
}

/// Scan one source against every rule, returning its contiguous output
/// block and counters.
fn scan_source(
    path: &str,
    rules: &RuleSet,
    workflow: &Workflow,
    diff: &Diff,
) -> Result<(String, Stats), Error> {
    if path.is_empty() {
        return Err(Error::EmptySourcePath);
    }
    let text = fs::read_to_string(path).map_err(|source| Error::SourceRead {
        path: path.to_string(),
        source,
    })?;
    let changes = diff.changes_for(Path::new(path));
    debug!(path, bytes = text.len(), "scanning source");

    let rule_list: Vec<(&RuleId, &Rule)> = rules.iter().collect();
    let sections: Vec<(String, usize)> = rule_list
        .par_iter()
        .filter_map(|&(id, rule)| {
            let filter = relevance(rule, path, &changes, workflow)?;
            Some(rule_matches(id, rule, &text, &filter))
        })
        .collect();

    let mut block = SourceMarker(path).to_string();
    let mut matches = 0;
    for (section, count) in sections {
        block.push_str(&section);
        matches += count;
    }

    let stats = Stats {
        sources: 1,
        bytes: text.len() as u64,
        matches,
    };
    Ok((block, stats))
}

/// Decide whether `rule` applies to this source at all and, if so, which
/// lines it may fire on. `None` means the rule is skipped entirely.
fn relevance<'c>(
    rule: &Rule,
    path: &str,
    changes: &'c LineChanges,
    workflow: &Workflow,
) -> Option<LineFilter<'c>> {
    let mut file_ok = rule.matched_files.is_match(path) && !rule.ignored_files.is_match(path);
    let mut filter = LineFilter::All;

    let handling = workflow.lookup(&rule.category);
    if file_ok {
        match handling.check {
            Scope::NoFiles | Scope::NoLines => file_ok = false,
            Scope::ChangedLines => {
                file_ok = !changes.is_empty();
                filter = LineFilter::Changed(changes);
            }
            Scope::ChangedFiles => file_ok = !changes.is_empty(),
            Scope::AllFiles | Scope::AllLines => {}
        }
    }
    if handling.response == Severity::None {
        file_ok = false;
    }

    file_ok.then_some(filter)
}

/// Run one rule over one source text, emitting match blocks in ascending
/// offset order.
fn rule_matches(id: &RuleId, rule: &Rule, text: &str, filter: &LineFilter<'_>) -> (String, usize) {
    let mut section = String::new();
    let mut count = 0;

    let mut search = ForwardSearch::new(text);
    while search.next_except(&rule.matched_text, &rule.ignored_text) {
        let line = search.line();
        if !filter.allows(line) {
            continue;
        }
        let highlighting = search.highlighted(&rule.marked_text);
        let block = MatchBlock {
            id,
            line,
            highlighting: &highlighting,
        };
        section.push_str(&block.to_string());
        count += 1;
    }

    (section, count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write_source(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn guideline_rules(json: &str) -> RuleSet {
        RuleSet::from_json(json, "rules.json").unwrap()
    }

    fn generate_to_string(
        rules: &RuleSet,
        workflow: &Workflow,
        diff: &Diff,
        sources: &[String],
    ) -> (String, Stats) {
        let mut out = Vec::new();
        let stats = generate(rules, workflow, diff, sources, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn single_rule_single_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "a.txt", "hello foo world\n");
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "no foo", "matched_text": "foo" } }"#,
        );
        let workflow = Workflow::presets();

        let (output, stats) =
            generate_to_string(&rules, &workflow, &Diff::default(), &[path.clone()]);

        let header = Header {
            rules: &rules,
            workflow: &workflow,
        }
        .to_string();
        let expected_block = format!(
            "\n# line 1 \"{path}\"\n# line 1\n      FEEDBACK_MATCH_R1(\"hello foo world\", \"      ^~~\")\n"
        );
        assert_eq!(output, format!("{header}{expected_block}"));
        assert_eq!(stats.sources, 1);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.bytes, 16);
    }

    #[test]
    fn ignored_text_suppresses_matching_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "b.txt", "bad here\n// bad comment\n");
        let rules = guideline_rules(
            r#"{ "R2": { "category": "guideline", "summary": "bad", "matched_text": "bad",
                       "ignored_text": "//.*bad" } }"#,
        );

        let (output, stats) =
            generate_to_string(&rules, &Workflow::presets(), &Diff::default(), &[path]);

        assert_eq!(stats.matches, 1);
        assert!(output.contains("# line 1\nFEEDBACK_MATCH_R2(\"bad here\", \"^~~\")\n"));
        assert!(!output.contains("FEEDBACK_MATCH_R2(\"// bad comment\""));
    }

    #[test]
    fn changed_lines_scope_keeps_only_changed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "x.c", "\tfirst\n\tsecond\n");
        let rules = guideline_rules(
            r#"{ "R3": { "category": "suggestion", "summary": "tab", "matched_text": "\\t" } }"#,
        );
        let diff_text = "\
diff --git a/x.c b/x.c
--- a/x.c
+++ b/x.c
@@ -2,0 +2,1 @@
+\tsecond
";
        let diff = Diff::parse(diff_text, Diff::default());

        let (output, stats) = generate_to_string(&rules, &Workflow::presets(), &diff, &[path]);

        assert_eq!(stats.matches, 1);
        assert!(output.contains("# line 2\n"));
        assert!(!output.contains("# line 1\nFEEDBACK_MATCH_R3"));
    }

    #[test]
    fn changed_scopes_skip_files_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "y.c", "\ttab\n");
        let rules = guideline_rules(
            r#"{ "R3": { "category": "suggestion", "summary": "tab", "matched_text": "\\t" } }"#,
        );

        let (output, stats) =
            generate_to_string(&rules, &Workflow::presets(), &Diff::default(), &[path]);

        assert_eq!(stats.matches, 0);
        assert!(!output.contains("FEEDBACK_MATCH_R3("));
    }

    #[test]
    fn greedy_rule_emits_at_most_one_match_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "c.txt", "abc");
        let rules = guideline_rules(
            r#"{ "R4": { "category": "guideline", "summary": "e", "matched_text": ".*" } }"#,
        );

        let (_, stats) =
            generate_to_string(&rules, &Workflow::presets(), &Diff::default(), &[path]);

        assert_eq!(stats.matches, 1);
    }

    #[test]
    fn severity_none_silences_a_rule_but_keeps_its_define() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "d.txt", "hit\n");
        let rules = guideline_rules(
            r#"{ "R5": { "category": "info", "summary": "fyi", "matched_text": "hit" } }"#,
        );
        let workflow =
            Workflow::from_json(r#"{ "info": { "check": "all_files", "response": "none" } }"#)
                .unwrap();

        let (output, stats) =
            generate_to_string(&rules, &workflow, &Diff::default(), &[path]);

        assert_eq!(stats.matches, 0);
        assert_eq!(output.matches("FEEDBACK_MATCH_R5").count(), 1);
        assert!(output.contains("#define FEEDBACK_MATCH_R5"));
    }

    #[test]
    fn diff_lookup_matches_path_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("project/src")).unwrap();
        let path = write_source(dir.path(), "project/src/x.c", "\ttab\n");
        let rules = guideline_rules(
            r#"{ "R3": { "category": "suggestion", "summary": "tab", "matched_text": "\\t" } }"#,
        );
        let diff_text = "\
diff --git a/src/x.c b/src/x.c
--- a/src/x.c
+++ b/src/x.c
@@ -1,0 +1,1 @@
+\ttab
";
        let diff = Diff::parse(diff_text, Diff::default());

        let (_, stats) = generate_to_string(&rules, &Workflow::presets(), &diff, &[path]);

        assert_eq!(stats.matches, 1);
    }

    #[test]
    fn matched_files_restricts_rules_to_their_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "notes.txt", "foo\n");
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "foo",
                       "matched_files": "\\.c$" } }"#,
        );

        let (_, stats) =
            generate_to_string(&rules, &Workflow::presets(), &Diff::default(), &[path]);

        assert_eq!(stats.matches, 0);
    }

    #[test]
    fn match_lines_are_non_decreasing_within_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "e.txt", "foo\nbar\nfoo\nfoo\n");
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "foo" } }"#,
        );

        let (output, stats) =
            generate_to_string(&rules, &Workflow::presets(), &Diff::default(), &[path]);

        assert_eq!(stats.matches, 3);
        let lines: Vec<usize> = output
            .lines()
            .filter_map(|line| line.strip_prefix("# line "))
            .filter_map(|rest| rest.parse().ok())
            .collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn each_sources_block_is_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_source(dir.path(), "one.txt", "marker one\nmarker one\n");
        let second = write_source(dir.path(), "two.txt", "marker two\n");
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "marker" } }"#,
        );

        let (output, stats) = generate_to_string(
            &rules,
            &Workflow::presets(),
            &Diff::default(),
            &[first.clone(), second.clone()],
        );

        assert_eq!(stats.sources, 2);
        assert_eq!(stats.matches, 3);

        for (path, own, other) in [
            (&first, "marker one", "marker two"),
            (&second, "marker two", "marker one"),
        ] {
            let start = output.find(&format!("# line 1 \"{path}\"")).unwrap();
            let tail = &output[start..];
            let end = tail[1..]
                .find("# line 1 \"")
                .map_or(tail.len(), |offset| offset + 1);
            let segment = &tail[..end];
            assert!(segment.contains(own));
            assert!(!segment.contains(other));
        }
    }

    #[test]
    fn blank_source_paths_fail_the_run() {
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "x" } }"#,
        );
        let mut out = Vec::new();
        let error = generate(
            &rules,
            &Workflow::presets(),
            &Diff::default(),
            &[String::new()],
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(error, Error::EmptySourcePath));
    }

    #[test]
    fn unreadable_sources_fail_the_run_with_their_path() {
        let rules = guideline_rules(
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "x" } }"#,
        );
        let mut out = Vec::new();
        let error = generate(
            &rules,
            &Workflow::presets(),
            &Diff::default(),
            &["no/such/file.c".to_string()],
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(error, Error::SourceRead { path, .. } if path == "no/such/file.c"));
    }
}
