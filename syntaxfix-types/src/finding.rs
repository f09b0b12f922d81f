use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Why a forbidden pattern is still present after repair.
///
/// - fix_failed: the rule set targets this match but did not remove it
///   (non-convergence, or a guard that kept the rule from firing)
/// - residual: the match is outside every rule's repair scope, or belongs
///   to a detect-only rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingClass {
    FixFailed,
    Residual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FindingLocation {
    /// 1-based line.
    pub line: u64,
    /// 1-based column, in characters.
    pub col: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub path: String,
    pub rule_id: String,
    pub category: String,
    pub class: FindingClass,
    pub severity: Severity,
    pub location: FindingLocation,

    /// The offending text, truncated for display.
    pub excerpt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationFinding {
    pub fn is_fix_failed(&self) -> bool {
        matches!(self.class, FindingClass::FixFailed)
    }

    /// Stable identity used to de-duplicate findings across reruns.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}/{}:{}:{}",
            self.rule_id, self.path, self.location.line, self.location.col
        )
    }
}
