//! Rendering helpers (plain text and markdown) for run reports and rule sets.

use syntaxfix_rules::RuleSet;
use syntaxfix_types::finding::{FindingClass, ValidationFinding};
use syntaxfix_types::report::{Convergence, FileOutcome, FileStatus, RunReport, VerdictStatus};

/// Console output: one line per changed or problematic file, the summary,
/// then every finding. Skipped paths are listed only when `verbose`.
pub fn render_report_text(report: &RunReport, verbose: bool) -> String {
    let mut out = String::new();
    let dry_run = report.run.dry_run;

    for file in &report.files {
        match file.status {
            FileStatus::Modified => {
                let verb = if dry_run { "would modify" } else { "modified" };
                out.push_str(&format!(
                    "{} {} ({})\n",
                    verb,
                    file.path,
                    passes_label(file.passes_used)
                ));
            }
            FileStatus::Held | FileStatus::Failed => {
                out.push_str(&format!(
                    "{} {}: {}\n",
                    status_label(file.status),
                    file.path,
                    file.error.as_deref().unwrap_or("-")
                ));
            }
            FileStatus::Cancelled if verbose => {
                out.push_str(&format!("cancelled {}\n", file.path));
            }
            FileStatus::Unchanged | FileStatus::Cancelled => {}
        }
        if dry_run && let Some(patch) = &file.patch {
            out.push_str(patch);
        }
    }

    let s = &report.summary;
    if !report.files.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!(
        "scanned {}, modified {}, unchanged {}, failed {}, held {}, skipped {}, cancelled {}\n",
        s.files_scanned,
        s.files_modified,
        s.files_unchanged,
        s.files_failed,
        s.files_held,
        s.files_skipped,
        s.files_cancelled
    ));
    out.push_str(&format!(
        "findings: {} fix_failed, {} residual\n",
        s.findings_fix_failed, s.findings_residual
    ));
    out.push_str(&format!("verdict: {}\n", verdict_label(report.verdict.status)));

    if !report.findings.is_empty() {
        out.push_str("\nfindings:\n");
        for (i, f) in report.findings.iter().enumerate() {
            out.push_str(&format!("{:>4}. {}\n", i + 1, finding_line(f)));
        }
    }

    if verbose && !report.skipped.is_empty() {
        out.push_str("\nskipped:\n");
        for skip in &report.skipped {
            out.push_str(&format!("  {}: {}\n", skip.path, skip.reason));
        }
    }

    out
}

pub fn render_report_md(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str("# syntaxfix report\n\n");
    out.push_str(&format!(
        "- Verdict: `{}`\n",
        verdict_label(report.verdict.status)
    ));
    if !report.verdict.reasons.is_empty() {
        out.push_str(&format!("- Reasons: {}\n", report.verdict.reasons.join(", ")));
    }
    out.push_str(&format!(
        "- Rule set: version {} ({} rules)\n",
        report.run.ruleset_version, report.run.rules_loaded
    ));
    out.push_str(&format!("- Max passes: {}\n", report.run.max_passes));
    if report.run.dry_run {
        out.push_str("- Dry run: nothing was written\n");
    }
    let s = &report.summary;
    out.push_str(&format!(
        "- Files: {} scanned, {} modified, {} unchanged, {} failed, {} held, {} skipped, {} cancelled\n\n",
        s.files_scanned,
        s.files_modified,
        s.files_unchanged,
        s.files_failed,
        s.files_held,
        s.files_skipped,
        s.files_cancelled
    ));

    if !report.fires_by_category.is_empty() {
        out.push_str("## Rewrites by category\n\n");
        out.push_str("| Category | Rewrites |\n|---|---|\n");
        for (category, n) in &report.fires_by_category {
            out.push_str(&format!("| `{}` | {} |\n", category, n));
        }
        out.push('\n');
    }

    out.push_str("## Files\n\n");
    let touched: Vec<&FileOutcome> = report
        .files
        .iter()
        .filter(|f| f.status != FileStatus::Unchanged)
        .collect();
    if touched.is_empty() {
        out.push_str("_No files changed._\n\n");
    } else {
        out.push_str("| File | Status | Passes | Convergence |\n|---|---|---|---|\n");
        for f in touched {
            out.push_str(&format!(
                "| `{}` | {} | {}/{} | {} |\n",
                f.path,
                status_label(f.status),
                f.passes_used,
                f.passes_executed,
                convergence_label(f.convergence)
            ));
        }
        out.push('\n');
    }

    out.push_str("## Findings\n\n");
    if report.findings.is_empty() {
        out.push_str("_No findings._\n");
    } else {
        for f in &report.findings {
            out.push_str(&format!(
                "- `{}:{}:{}` **{}** `{}` `{}`\n",
                f.path,
                f.location.line,
                f.location.col,
                class_label(f.class),
                f.rule_id,
                f.excerpt
            ));
            if let Some(msg) = &f.message {
                out.push_str(&format!("  - {}\n", msg));
            }
        }
    }

    if !report.non_converged.is_empty() {
        out.push_str("\n## Non-converged\n\n");
        for path in &report.non_converged {
            out.push_str(&format!("- `{}`\n", path));
        }
    }

    if !report.skipped.is_empty() {
        out.push_str("\n## Skipped\n\n");
        for skip in &report.skipped {
            out.push_str(&format!("- `{}`: {}\n", skip.path, skip.reason));
        }
    }

    out
}

/// Rules grouped by category, in application order.
pub fn render_rule_list(rules: &RuleSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "rule set version {} ({} rules)\n",
        rules.version(),
        rules.len()
    ));
    for category in rules.categories() {
        out.push_str(&format!("\n[{}]\n", category));
        for rule in rules.rules().iter().filter(|r| r.category() == category) {
            let kind = if rule.is_fix() { "fix" } else { "detect" };
            out.push_str(&format!(
                "  {:<36} {:<7} {:<10} {}\n",
                rule.id(),
                kind,
                rule.guard().as_str(),
                rule.description().unwrap_or("")
            ));
        }
    }
    out
}

fn finding_line(f: &ValidationFinding) -> String {
    format!(
        "{}:{}:{} {} {} {} `{}`",
        f.path,
        f.location.line,
        f.location.col,
        f.severity.as_str(),
        class_label(f.class),
        f.rule_id,
        f.excerpt
    )
}

fn passes_label(n: u32) -> String {
    if n == 1 {
        "1 pass".to_string()
    } else {
        format!("{n} passes")
    }
}

fn status_label(s: FileStatus) -> &'static str {
    match s {
        FileStatus::Modified => "modified",
        FileStatus::Unchanged => "unchanged",
        FileStatus::Held => "held",
        FileStatus::Failed => "failed",
        FileStatus::Cancelled => "cancelled",
    }
}

fn class_label(c: FindingClass) -> &'static str {
    match c {
        FindingClass::FixFailed => "fix_failed",
        FindingClass::Residual => "residual",
    }
}

fn convergence_label(c: Convergence) -> String {
    match c {
        Convergence::Converged => "converged".to_string(),
        Convergence::Oscillating { period } => format!("oscillating (period {period})"),
        Convergence::Exhausted => "exhausted".to_string(),
        Convergence::NotRun => "-".to_string(),
    }
}

fn verdict_label(v: VerdictStatus) -> &'static str {
    match v {
        VerdictStatus::Pass => "pass",
        VerdictStatus::Warn => "warn",
        VerdictStatus::Fail => "fail",
    }
}
