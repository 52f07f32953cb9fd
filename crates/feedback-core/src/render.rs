use std::fmt::{self, Write};

use crate::rules::{RuleId, RuleSet};
use crate::scan::Excerpt;
use crate::workflow::Workflow;

/// Escapes text into the body of a C string literal: newlines become `\n`,
/// carriage returns are dropped, quotes and backslashes are escaped, every
/// other character passes through.
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '\n' => f.write_str("\\n")?,
                '\r' => {}
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                other => f.write_char(other)?,
            }
        }
        Ok(())
    }
}

/// Byte-wise ASCII upper-casing; non-ASCII characters pass through.
pub struct Uppercase<'a>(pub &'a str);

impl fmt::Display for Uppercase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            f.write_char(ch.to_ascii_uppercase())?;
        }
        Ok(())
    }
}

const PREAMBLE: &str = r##"// DO NOT EDIT: this file is generated automatically

namespace { using dummy = int; }

#define __STRINGIFY(x) #x
#define STRINGIFY(x)   __STRINGIFY(x)
#define PRAGMA(x)      _Pragma(#x)

#if defined __GNUC__
#define FEEDBACK_RESPONSE_ERROR(id, msg)   PRAGMA(GCC error "feedback " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_WARNING(id, msg) PRAGMA(GCC warning "feedback " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_MESSAGE(id, msg) PRAGMA(message "feedback " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_NONE(id, msg)    /* no feedback response for id */
#elif defined _MSC_VER
#define FEEDBACK_MESSAGE(msg)              PRAGMA(message(__FILE__ "(" STRINGIFY(__LINE__) "): " msg))
#define FEEDBACK_RESPONSE_ERROR(id, msg)   FEEDBACK_MESSAGE("feedback error " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_WARNING(id, msg) FEEDBACK_MESSAGE("feedback warning " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_MESSAGE(id, msg) FEEDBACK_MESSAGE("feedback message " STRINGIFY(id) ": " msg)
#define FEEDBACK_RESPONSE_NONE(id, msg)    /* no feedback response for id */
#else
#error "Unsupported compiler"
#endif

"##;

/// The artifact preamble: the severity dispatch macros followed by one
/// `FEEDBACK_MATCH_*` definition per rule. Severity decisions are expanded
/// here so a later severity change is a header-only change.
pub struct Header<'a> {
    pub rules: &'a RuleSet,
    pub workflow: &'a Workflow,
}

impl fmt::Display for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(PREAMBLE)?;
        for (id, rule) in self.rules.iter() {
            let response = self.workflow.lookup(&rule.category).response;
            writeln!(
                f,
                "#define FEEDBACK_MATCH_{uppercase_id}(match, highlighting) \
                 FEEDBACK_RESPONSE_{response}({id}, \"{summary} [{category} from \
                 file://{origin}]\\n |\\n | \" match \"\\n | \" highlighting \"\\n |\\n | \
                 RATIONALE : {rationale}\\n | WORKAROUND: {workaround}\\n |\")",
                uppercase_id = Uppercase(id.as_str()),
                response = Uppercase(response.as_str()),
                id = id,
                summary = Escaped(&rule.summary),
                category = Escaped(&rule.category),
                origin = Escaped(self.rules.origin()),
                rationale = Escaped(&rule.rationale),
                workaround = Escaped(&rule.workaround),
            )?;
        }
        Ok(())
    }
}

/// The per-source marker that resets the line counter to the source's path.
pub struct SourceMarker<'a>(pub &'a str);

impl fmt::Display for SourceMarker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n# line 1 \"{}\"\n", self.0)
    }
}

/// One match emission: a `# line` directive pointing at the match line
/// followed by the indented macro invocation carrying the excerpt.
pub struct MatchBlock<'a> {
    pub id: &'a RuleId,
    pub line: usize,
    pub highlighting: &'a Excerpt<'a>,
}

impl fmt::Display for MatchBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# line {line}\n{indentation}FEEDBACK_MATCH_{uppercase_id}(\"{first_line}\", \"{indentation}{annotation}\")\n",
            line = self.line,
            indentation = self.highlighting.indentation,
            uppercase_id = Uppercase(self.id.as_str()),
            first_line = Escaped(self.highlighting.first_line),
            annotation = self.highlighting.annotation,
        )
    }
}
