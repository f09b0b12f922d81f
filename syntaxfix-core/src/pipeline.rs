//! The repair pipeline, extracted from the CLI.
//!
//! Walk, then for every source file (in parallel, independently):
//! read, run passes to a fixed point, commit, validate. Results are
//! aggregated in walk order. All file I/O goes through the port traits.

use crate::cancel::RunCancellation;
use crate::error::RepairError;
use crate::ports::{CommitPort, SourceReader, WritePort};
use crate::runner::PassRunner;
use crate::settings::{NonConvergedPolicy, RuleSources, RunSettings};
use crate::validate::Validator;
use crate::walker::{included, ExclusionPolicy, FileWalker, SourceFile, WalkEntry, WalkError};
use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use rayon::prelude::*;
use std::time::Instant;
use syntaxfix_edit::render_patch;
use syntaxfix_hash::sha256_hex;
use syntaxfix_render::render_report_md;
use syntaxfix_rules::{
    builtin_rule_file, ApplyContext, RuleApplicationError, RuleFile, RuleSet,
};
use syntaxfix_types::finding::ValidationFinding;
use syntaxfix_types::report::{FileOutcome, FileStatus, RunInfo, RunReport, ToolInfo};
use tracing::{debug, info, warn};

/// Errors that stop a run before any file is touched. Exit code 2.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid rule set: {0}")]
    Rules(#[from] RuleApplicationError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Outcome of `run_repair`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
}

impl RunOutcome {
    /// 0 when the run is clean, 1 when any file failed, stalled, or kept a
    /// pattern its rules target.
    pub fn exit_code(&self) -> i32 {
        if self.report.is_clean() { 0 } else { 1 }
    }
}

/// Assemble the rule set: built-in catalog, extra rule files, enablement, overrides.
pub fn build_rule_set(sources: &RuleSources) -> Result<RuleSet, RunError> {
    let mut builder = RuleSet::builder();
    if sources.builtin {
        builder = builder.rule_file(&builtin_rule_file()?)?;
    }
    for path in &sources.files {
        let file = RuleFile::load(path)?;
        debug!(path = %path, rules = file.rules.len(), "loaded rule file");
        builder = builder.rule_file(&file)?;
    }
    for id in &sources.enable {
        builder = builder.enable(id.clone());
    }
    for id in &sources.disable {
        builder = builder.disable(id.clone());
    }
    for setting in &sources.overrides {
        let ov = setting.spec.compile(&setting.rule)?;
        builder = builder.override_rule(setting.rule.clone(), ov);
    }
    Ok(builder.build()?)
}

/// Run the repair pipeline without a cancellation handle (deadline from settings only).
pub fn run_repair(
    settings: &RunSettings,
    rules: &RuleSet,
    reader: &dyn SourceReader,
    committer: &dyn CommitPort,
    tool: ToolInfo,
) -> Result<RunOutcome, RunError> {
    let cancel = match settings.timeout {
        Some(timeout) => RunCancellation::with_timeout(timeout),
        None => RunCancellation::new(),
    };
    run_repair_with_cancellation(settings, rules, reader, committer, tool, &cancel)
}

/// Run the repair pipeline. Files not yet started when `cancel` fires are
/// reported as cancelled; files already in progress finish normally.
pub fn run_repair_with_cancellation(
    settings: &RunSettings,
    rules: &RuleSet,
    reader: &dyn SourceReader,
    committer: &dyn CommitPort,
    tool: ToolInfo,
    cancel: &RunCancellation,
) -> Result<RunOutcome, RunError> {
    let started = Instant::now();

    if settings.max_passes == 0 {
        return Err(RunError::Settings("max_passes must be at least 1".to_string()));
    }
    if settings.roots.is_empty() {
        return Err(RunError::Settings("no roots to scan".to_string()));
    }
    if settings.jobs == Some(0) {
        return Err(RunError::Settings("jobs must be at least 1".to_string()));
    }

    let mut exclusions = if settings.default_excludes {
        ExclusionPolicy::standard()
    } else {
        ExclusionPolicy::empty()
    };
    for pattern in &settings.exclude {
        exclusions = exclusions.with_pattern(pattern)?;
    }

    let walker = FileWalker::new(
        settings.roots.clone(),
        settings.extensions.clone(),
        exclusions,
    );
    let entries = walker.walk()?;

    let mut report = RunReport::new(
        tool,
        RunInfo::start(
            settings.dry_run,
            settings.max_passes,
            rules.version(),
            rules.len() as u64,
        ),
    );
    report.skipped = entries
        .iter()
        .filter_map(|e| match e {
            WalkEntry::Skipped(s) => Some(s.clone()),
            WalkEntry::Source(_) => None,
        })
        .collect();

    let sources: Vec<&SourceFile> = included(&entries).collect();
    debug!(
        files = sources.len(),
        skipped = report.skipped.len(),
        "walk complete"
    );

    let job = FileJob {
        runner: PassRunner::new(rules, settings.max_passes),
        validator: Validator::new(rules),
        settings,
        reader,
        committer,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs.unwrap_or(0))
        .build()
        .context("build worker pool")?;

    let results: Vec<(FileOutcome, Vec<ValidationFinding>)> = pool.install(|| {
        sources
            .par_iter()
            .map(|src| {
                if cancel.is_cancelled() {
                    debug!(path = %src.display, "cancelled before start");
                    return (FileOutcome::new(&src.display, FileStatus::Cancelled), Vec::new());
                }
                job.process(src)
            })
            .collect()
    });

    for (outcome, findings) in results {
        report.files.push(outcome);
        report.findings.extend(findings);
    }

    report.finalize();
    report.fires_by_category.clear();
    for (rule, n) in &report.fires_by_rule {
        let category = rules.category_of(rule).unwrap_or("unknown").to_string();
        *report.fires_by_category.entry(category).or_insert(0) += n;
    }

    report.run.ended_at = Some(Utc::now().to_rfc3339());
    report.run.duration_ms = Some(started.elapsed().as_millis() as u64);

    info!(
        scanned = report.summary.files_scanned,
        modified = report.summary.files_modified,
        failed = report.summary.files_failed,
        non_converged = report.summary.files_non_converged,
        "run complete"
    );

    Ok(RunOutcome { report })
}

struct FileJob<'a> {
    runner: PassRunner<'a>,
    validator: Validator<'a>,
    settings: &'a RunSettings,
    reader: &'a dyn SourceReader,
    committer: &'a dyn CommitPort,
}

impl FileJob<'_> {
    fn process(&self, src: &SourceFile) -> (FileOutcome, Vec<ValidationFinding>) {
        let mut outcome = FileOutcome::new(&src.display, FileStatus::Unchanged);

        let record = match self.reader.read(&src.path) {
            Ok(record) => record,
            Err(source) => {
                let err = RepairError::FileAccess {
                    path: src.path.clone(),
                    source,
                };
                warn!(path = %src.display, error = %err, "file not processed");
                outcome.status = FileStatus::Failed;
                outcome.error = Some(err.to_string());
                return (outcome, Vec::new());
            }
        };

        let ctx = ApplyContext::for_path(&src.display);
        let repair = self.runner.repair(&record.original, &ctx);
        outcome.convergence = repair.convergence;
        outcome.passes_used = repair.passes_used;
        outcome.passes_executed = repair.passes_executed;
        outcome.fires = repair.fires.clone();
        outcome.sha256_before = Some(record.original_sha256.clone());

        let stalled = repair.convergence.is_stalled();
        if stalled {
            let err = RepairError::Convergence {
                path: src.path.clone(),
                state: repair.convergence,
                passes: repair.passes_executed,
            };
            warn!(path = %src.display, error = %err, "no fixed point");
            outcome.error = Some(err.to_string());
        }

        let hold = stalled && self.settings.non_converged == NonConvergedPolicy::Discard;
        let changed = repair.changed_from(&record.original);
        let final_content: &str = if hold || !changed {
            &record.original
        } else {
            &repair.content
        };

        outcome.status = if hold {
            FileStatus::Held
        } else if changed {
            FileStatus::Modified
        } else {
            FileStatus::Unchanged
        };

        if outcome.status == FileStatus::Modified {
            if self.settings.dry_run || self.settings.include_patches {
                outcome.patch = Some(render_patch(
                    &src.display,
                    &record.original,
                    final_content,
                ));
            }
            if self.settings.dry_run {
                outcome.sha256_after = Some(sha256_hex(final_content.as_bytes()));
            } else {
                match self.committer.commit(&record, final_content) {
                    Ok(receipt) => {
                        debug!(path = %src.display, bytes = receipt.bytes_written, "written");
                        outcome.written = true;
                        outcome.sha256_after = Some(receipt.sha256_after);
                    }
                    Err(err) => {
                        let err = RepairError::from(err);
                        warn!(path = %src.display, error = %err, "commit failed");
                        outcome.status = FileStatus::Failed;
                        outcome.error = Some(err.to_string());
                        return (outcome, Vec::new());
                    }
                }
            }
        } else {
            outcome.sha256_after = outcome.sha256_before.clone();
        }

        let findings = self
            .validator
            .scan(&src.display, final_content, ctx.dialect);
        (outcome, findings)
    }
}

/// Write the JSON and/or markdown report.
pub fn write_report_artifacts(
    report: &RunReport,
    json: Option<&Utf8Path>,
    markdown: Option<&Utf8Path>,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    if let Some(path) = json {
        let body = serde_json::to_string_pretty(report).context("serialize report")?;
        writer.write_file(path, body.as_bytes())?;
    }
    if let Some(path) = markdown {
        writer.write_file(path, render_report_md(report).as_bytes())?;
    }
    Ok(())
}
