use std::fs;
use std::path::Path;

use anyhow::Context;

use feedback_core::{Diff, RuleSet, Workflow};

/// The four input documents of a run, loaded and decoded.
#[derive(Debug)]
pub struct Inputs {
    pub rules: RuleSet,
    pub workflow: Workflow,
    pub diff: Diff,
    pub sources: Vec<String>,
}

/// Load rules, sources list, workflow and diff concurrently.
///
/// The optional inputs default to empty contributions: no diff means no
/// changed-line information, no workflow means the built-in presets.
pub fn load(
    rules: &Path,
    sources: &Path,
    diff: Option<&Path>,
    workflow: Option<&Path>,
) -> anyhow::Result<Inputs> {
    let ((rules, workflow), (diff, sources)) = rayon::join(
        || rayon::join(|| load_rules(rules), || load_workflow(workflow)),
        || rayon::join(|| load_diff(diff), || load_sources(sources)),
    );

    Ok(Inputs {
        rules: rules?,
        workflow: workflow?,
        diff: diff?,
        sources: sources?,
    })
}

fn load_rules(path: &Path) -> anyhow::Result<RuleSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read rules file {}", path.display()))?;
    let origin = path.display().to_string();
    RuleSet::from_json(&text, origin)
        .with_context(|| format!("cannot parse rules file {}", path.display()))
}

fn load_workflow(path: Option<&Path>) -> anyhow::Result<Workflow> {
    let Some(path) = path else {
        return Ok(Workflow::presets());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read workflow file {}", path.display()))?;
    Workflow::from_json(&text)
        .with_context(|| format!("cannot parse workflow file {}", path.display()))
}

fn load_diff(path: Option<&Path>) -> anyhow::Result<Diff> {
    let Some(path) = path else {
        return Ok(Diff::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read diff file {}", path.display()))?;
    Ok(Diff::parse(&text, Diff::default()))
}

fn load_sources(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read sources list {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_all_four_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(
            &rules,
            r#"{ "R1": { "category": "guideline", "summary": "s", "matched_text": "x" } }"#,
        )
        .unwrap();
        let sources = dir.path().join("sources.txt");
        fs::write(&sources, "a.c\nb.c\n").unwrap();
        let workflow = dir.path().join("workflow.json");
        fs::write(&workflow, r#"{ "guideline": { "response": "error" } }"#).unwrap();
        let diff = dir.path().join("changes.diff");
        fs::write(
            &diff,
            "diff --git a/a.c b/a.c\n--- a/a.c\n+++ b/a.c\n@@ -1,0 +1,1 @@\n+new\n",
        )
        .unwrap();

        let inputs = load(&rules, &sources, Some(&diff), Some(&workflow)).unwrap();

        assert_eq!(inputs.rules.len(), 1);
        assert_eq!(inputs.sources, ["a.c", "b.c"]);
        assert_eq!(
            inputs.workflow.lookup("guideline").response,
            feedback_core::Severity::Error
        );
        assert!(inputs.diff.changes_for(Path::new("a.c")).is_changed(1));
    }

    #[test]
    fn absent_optional_inputs_contribute_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(&rules, "{}").unwrap();
        let sources = dir.path().join("sources.txt");
        fs::write(&sources, "").unwrap();

        let inputs = load(&rules, &sources, None, None).unwrap();

        assert!(inputs.rules.is_empty());
        assert!(inputs.sources.is_empty());
        assert!(inputs.diff.changes_for(Path::new("any.c")).is_empty());
        assert_eq!(
            inputs.workflow.lookup("guideline").response,
            feedback_core::Severity::Warning
        );
    }

    #[test]
    fn blank_lines_in_the_sources_list_are_kept_as_invalid_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.txt");
        fs::write(&sources, "a.c\n\nb.c\n").unwrap();

        let listed = load_sources(&sources).unwrap();
        assert_eq!(listed, ["a.c", "", "b.c"]);
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.txt");
        fs::write(&sources, "").unwrap();

        let error = load(&dir.path().join("absent.json"), &sources, None, None).unwrap_err();
        assert!(error.to_string().contains("cannot read rules file"));
    }
}
