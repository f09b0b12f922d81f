use crate::finding::{FindingClass, Severity, ValidationFinding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The aggregate product of one syntaxfix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub verdict: Verdict,
    pub summary: RunSummary,

    #[serde(default)]
    pub fires_by_category: BTreeMap<String, u64>,

    #[serde(default)]
    pub fires_by_rule: BTreeMap<String, u64>,

    #[serde(default)]
    pub files: Vec<FileOutcome>,

    #[serde(default)]
    pub findings: Vec<ValidationFinding>,

    /// Paths whose pass sequence did not reach a fixed point.
    #[serde(default)]
    pub non_converged: Vec<String>,

    #[serde(default)]
    pub skipped: Vec<SkippedPath>,
}

impl RunReport {
    pub fn new(tool: ToolInfo, run: RunInfo) -> Self {
        Self {
            schema: crate::schema::SYNTAXFIX_REPORT_V1.to_string(),
            tool,
            run,
            verdict: Verdict::default(),
            summary: RunSummary::default(),
            fires_by_category: BTreeMap::new(),
            fires_by_rule: BTreeMap::new(),
            files: vec![],
            findings: vec![],
            non_converged: vec![],
            skipped: vec![],
        }
    }

    /// True when no file failed, stalled, or kept a pattern the rules should have removed.
    pub fn is_clean(&self) -> bool {
        self.summary.files_failed == 0
            && self.summary.files_non_converged == 0
            && self.summary.findings_fix_failed == 0
    }

    pub fn modified_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Modified)
            .map(|f| f.path.as_str())
    }

    /// Recompute summary counts, verdict and aggregate fire counts from `files` and `findings`.
    pub fn finalize(&mut self) {
        let mut summary = RunSummary {
            files_scanned: self.files.len() as u64,
            files_skipped: self.skipped.len() as u64,
            ..RunSummary::default()
        };

        self.fires_by_rule.clear();
        self.non_converged.clear();
        for file in &self.files {
            match file.status {
                FileStatus::Modified => summary.files_modified += 1,
                FileStatus::Unchanged => summary.files_unchanged += 1,
                FileStatus::Held => summary.files_held += 1,
                FileStatus::Failed => summary.files_failed += 1,
                FileStatus::Cancelled => summary.files_cancelled += 1,
            }
            if file.convergence.is_stalled() {
                summary.files_non_converged += 1;
                self.non_converged.push(file.path.clone());
            }
            for (rule, n) in &file.fires {
                *self.fires_by_rule.entry(rule.clone()).or_insert(0) += n;
            }
        }

        let mut warning_residuals = 0u64;
        for finding in &self.findings {
            match finding.class {
                FindingClass::FixFailed => summary.findings_fix_failed += 1,
                FindingClass::Residual => {
                    summary.findings_residual += 1;
                    if finding.severity >= Severity::Warn {
                        warning_residuals += 1;
                    }
                }
            }
        }

        let mut reasons = Vec::new();
        if summary.files_failed > 0 {
            reasons.push("file_errors".to_string());
        }
        if summary.files_non_converged > 0 {
            reasons.push("non_converged".to_string());
        }
        if summary.findings_fix_failed > 0 {
            reasons.push("fix_failed".to_string());
        }
        if summary.files_cancelled > 0 {
            reasons.push("deadline".to_string());
        }

        let status = if summary.files_failed > 0
            || summary.files_non_converged > 0
            || summary.findings_fix_failed > 0
        {
            VerdictStatus::Fail
        } else if warning_residuals > 0 || summary.files_cancelled > 0 {
            VerdictStatus::Warn
        } else {
            VerdictStatus::Pass
        };

        self.summary = summary;
        self.verdict = Verdict { status, reasons };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub dry_run: bool,

    pub max_passes: u32,

    /// Version of the rule set data the run was executed with.
    pub ruleset_version: u32,

    pub rules_loaded: u64,
}

impl RunInfo {
    pub fn start(dry_run: bool, max_passes: u32, ruleset_version: u32, rules_loaded: u64) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            ended_at: None,
            duration_ms: None,
            dry_run,
            max_passes,
            ruleset_version,
            rules_loaded,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    #[default]
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_scanned: u64,
    pub files_modified: u64,
    pub files_unchanged: u64,
    pub files_failed: u64,

    /// Non-converged files left untouched on disk.
    #[serde(default)]
    pub files_held: u64,

    #[serde(default)]
    pub files_non_converged: u64,

    #[serde(default)]
    pub files_skipped: u64,

    #[serde(default)]
    pub files_cancelled: u64,

    #[serde(default)]
    pub findings_fix_failed: u64,

    #[serde(default)]
    pub findings_residual: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Content changed (written to disk, or would be under dry-run).
    Modified,
    Unchanged,
    /// Repair did not converge and the file was left as it was.
    Held,
    Failed,
    /// Not started before the run deadline.
    Cancelled,
}

/// How a file's pass sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Convergence {
    Converged,
    /// Content returned to a state seen `period` passes earlier.
    Oscillating { period: u32 },
    /// `max_passes` ran out while content was still changing.
    Exhausted,
    NotRun,
}

impl Convergence {
    pub fn is_converged(self) -> bool {
        matches!(self, Convergence::Converged)
    }

    pub fn is_stalled(self) -> bool {
        matches!(
            self,
            Convergence::Oscillating { .. } | Convergence::Exhausted
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: String,
    pub status: FileStatus,
    pub convergence: Convergence,
    pub passes_used: u32,
    pub passes_executed: u32,

    /// Whether the new content reached disk.
    #[serde(default)]
    pub written: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fires: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Unified diff of the change (dry-run only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl FileOutcome {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            convergence: Convergence::NotRun,
            passes_used: 0,
            passes_executed: 0,
            written: false,
            fires: BTreeMap::new(),
            sha256_before: None,
            sha256_after: None,
            error: None,
            patch: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPath {
    pub path: String,
    pub reason: String,
}
