pub mod diff;
pub mod engine;
pub mod interval;
pub mod pattern;
pub mod render;
pub mod rules;
pub mod scan;
pub mod workflow;

pub use diff::{Diff, LineChanges};
pub use engine::{Stats, generate};
pub use pattern::{Found, Pattern};
pub use rules::{Rule, RuleId, RuleSet};
pub use scan::{Excerpt, ForwardSearch};
pub use workflow::{Handling, Scope, Severity, Workflow};

/// Errors that abort a generator run.
///
/// Malformed diff sections are not represented here; they are skipped
/// during parsing and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A regex string in a rule or internal scanner failed to compile.
    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A rule entry is missing a mandatory field or has a wrong field type.
    #[error("invalid rule `{id}`: {reason}")]
    InvalidRule { id: String, reason: String },

    /// The rules document is not a map of rule entries.
    #[error("invalid rules document: {reason}")]
    InvalidRules { reason: String },

    /// The workflow document could not be decoded.
    #[error("invalid workflow document: {reason}")]
    InvalidWorkflow { reason: String },

    /// More capture slots were requested than the engine supports.
    #[error("more than {} captures requested", pattern::MAX_CAPTURES)]
    TooManyCaptures,

    /// The sources list contains a blank line.
    #[error("empty source path in sources list")]
    EmptySourcePath,

    /// A listed source file could not be read.
    #[error("cannot read source `{path}`")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The output sink rejected a write.
    #[error("cannot write output")]
    Output {
        #[source]
        source: std::io::Error,
    },
}
