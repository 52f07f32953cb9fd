use std::collections::HashMap;

use serde::Deserialize;

use crate::Error;

/// Compiler-visible strength of an emitted diagnostic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    #[default]
    Message,
    Warning,
    Error,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Message => "message",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Which files and lines a rule category is allowed to fire on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    AllFiles,
    AllLines,
    ChangedFiles,
    ChangedLines,
    NoFiles,
    NoLines,
}

/// How a rule category is handled: where it may fire and how strongly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Handling {
    #[serde(default)]
    pub check: Scope,
    #[serde(default)]
    pub response: Severity,
}

/// Mapping from rule category to handling, with a `default` entry consulted
/// for categories that have no entry of their own.
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    handlings: HashMap<String, Handling>,
}

impl Workflow {
    /// The built-in category presets, used when no workflow document is
    /// given.
    pub fn presets() -> Self {
        let handlings = [
            ("requirement", Scope::AllFiles, Severity::Error),
            ("guideline", Scope::AllFiles, Severity::Warning),
            ("improvement", Scope::ChangedFiles, Severity::Warning),
            ("suggestion", Scope::ChangedLines, Severity::Warning),
        ]
        .into_iter()
        .map(|(category, check, response)| (category.to_string(), Handling { check, response }))
        .collect();
        Self { handlings }
    }

    /// Decode a workflow document, installing the built-in presets for
    /// categories the document does not override.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let handlings: HashMap<String, Handling> =
            serde_json::from_str(text).map_err(|source| Error::InvalidWorkflow {
                reason: source.to_string(),
            })?;

        let mut workflow = Self { handlings };
        for (category, handling) in Self::presets().handlings {
            workflow.handlings.entry(category).or_insert(handling);
        }
        Ok(workflow)
    }

    /// The handling for `category`, its `default` entry, or the built-in
    /// default.
    pub fn lookup(&self, category: &str) -> Handling {
        if let Some(handling) = self.handlings.get(category) {
            return *handling;
        }
        if let Some(handling) = self.handlings.get("default") {
            return *handling;
        }
        Handling::default()
    }
}
