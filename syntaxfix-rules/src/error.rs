use camino::Utf8PathBuf;
use thiserror::Error;

/// A rule (or rule set) that cannot be trusted to run.
///
/// Raised at construction time, before any file is touched.
#[derive(Debug, Error)]
pub enum RuleApplicationError {
    #[error("rule `{rule}`: invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule `{rule}`: replacement references capture `{reference}` which the pattern does not define")]
    UnknownCapture { rule: String, reference: String },

    #[error("rule `{rule}`: literal replacement `{replacement}` is matched by the rule's own pattern")]
    SelfMatchingReplacement { rule: String, replacement: String },

    #[error("rule `{rule}`: example {index} produced {actual:?}, expected {expected:?}")]
    ExampleMismatch {
        rule: String,
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("rule `{rule}`: output of example {index} is rewritten again by the same rule ({actual:?})")]
    NotIdempotent {
        rule: String,
        index: usize,
        actual: String,
    },

    #[error("rule `{rule}` is declared twice with different definitions")]
    DuplicateRule { rule: String },

    #[error("unknown rule `{rule}` referenced by {context}")]
    UnknownRule { rule: String, context: String },

    #[error("rule `{rule}`: invalid override path glob `{glob}`: {source}")]
    InvalidGlob {
        rule: String,
        glob: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("rules re-enable each other: {}", .cycle.join(" -> "))]
    CyclicTrigger { cycle: Vec<String> },

    #[error("read rules {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse rules {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

impl RuleApplicationError {
    /// Id of the offending rule, when the error concerns a single rule.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            RuleApplicationError::InvalidPattern { rule, .. }
            | RuleApplicationError::UnknownCapture { rule, .. }
            | RuleApplicationError::SelfMatchingReplacement { rule, .. }
            | RuleApplicationError::ExampleMismatch { rule, .. }
            | RuleApplicationError::NotIdempotent { rule, .. }
            | RuleApplicationError::DuplicateRule { rule }
            | RuleApplicationError::UnknownRule { rule, .. }
            | RuleApplicationError::InvalidGlob { rule, .. } => Some(rule),
            RuleApplicationError::CyclicTrigger { .. }
            | RuleApplicationError::Io { .. }
            | RuleApplicationError::Parse { .. } => None,
        }
    }
}
