use pretty_assertions::assert_eq;
use syntaxfix_types::finding::{FindingClass, FindingLocation, Severity, ValidationFinding};
use syntaxfix_types::report::{
    Convergence, FileOutcome, FileStatus, RunInfo, RunReport, SkippedPath, ToolInfo,
    VerdictStatus,
};

fn tool() -> ToolInfo {
    ToolInfo {
        name: "syntaxfix".to_string(),
        version: Some("0.0.0".to_string()),
        commit: None,
    }
}

fn finding(class: FindingClass) -> ValidationFinding {
    ValidationFinding {
        path: "src/a.ts".to_string(),
        rule_id: "array.bare-suffix".to_string(),
        category: "array".to_string(),
        class,
        severity: Severity::Error,
        location: FindingLocation { line: 3, col: 5 },
        excerpt: "items[];".to_string(),
        message: None,
    }
}

#[test]
fn file_status_and_verdict_serialize_snake_case() {
    assert_eq!(
        serde_json::to_value(FileStatus::Modified).expect("serialize"),
        serde_json::json!("modified")
    );
    assert_eq!(
        serde_json::to_value(FileStatus::Held).expect("serialize"),
        serde_json::json!("held")
    );
    assert_eq!(
        serde_json::to_value(VerdictStatus::Fail).expect("serialize"),
        serde_json::json!("fail")
    );
    assert_eq!(
        serde_json::to_value(FindingClass::FixFailed).expect("serialize"),
        serde_json::json!("fix_failed")
    );
}

#[test]
fn convergence_is_internally_tagged() {
    let v = serde_json::to_value(Convergence::Oscillating { period: 2 }).expect("serialize");
    assert_eq!(v, serde_json::json!({ "state": "oscillating", "period": 2 }));

    let back: Convergence =
        serde_json::from_value(serde_json::json!({ "state": "exhausted" })).expect("parse");
    assert_eq!(back, Convergence::Exhausted);
}

#[test]
fn file_outcome_omits_empty_optionals() {
    let outcome = FileOutcome::new("src/a.ts", FileStatus::Unchanged);
    let v = serde_json::to_value(&outcome).expect("serialize");
    assert!(v.get("fires").is_none());
    assert!(v.get("patch").is_none());
    assert!(v.get("error").is_none());
    assert_eq!(v["convergence"]["state"], "not_run");
}

#[test]
fn finalize_counts_statuses_and_sets_failing_verdict() {
    let mut report = RunReport::new(tool(), RunInfo::start(false, 5, 1, 3));

    let mut modified = FileOutcome::new("src/a.ts", FileStatus::Modified);
    modified.convergence = Convergence::Converged;
    modified.fires.insert("array.bare-suffix".to_string(), 2);

    let mut held = FileOutcome::new("src/b.ts", FileStatus::Held);
    held.convergence = Convergence::Oscillating { period: 2 };
    held.fires.insert("array.bare-suffix".to_string(), 1);

    report.files = vec![modified, held, FileOutcome::new("src/c.ts", FileStatus::Unchanged)];
    report.skipped.push(SkippedPath {
        path: "node_modules/x/index.ts".to_string(),
        reason: "excluded segment `node_modules`".to_string(),
    });
    report.findings.push(finding(FindingClass::Residual));
    report.finalize();

    assert_eq!(report.summary.files_scanned, 3);
    assert_eq!(report.summary.files_modified, 1);
    assert_eq!(report.summary.files_unchanged, 1);
    assert_eq!(report.summary.files_held, 1);
    assert_eq!(report.summary.files_non_converged, 1);
    assert_eq!(report.summary.files_skipped, 1);
    assert_eq!(report.summary.findings_residual, 1);
    assert_eq!(report.non_converged, vec!["src/b.ts".to_string()]);
    assert_eq!(report.fires_by_rule.get("array.bare-suffix"), Some(&3));
    assert_eq!(report.verdict.status, VerdictStatus::Fail);
    assert!(report.verdict.reasons.contains(&"non_converged".to_string()));
    assert!(!report.is_clean());
    assert_eq!(report.modified_paths().collect::<Vec<_>>(), vec!["src/a.ts"]);
}

#[test]
fn residual_findings_alone_warn_but_stay_clean() {
    let mut report = RunReport::new(tool(), RunInfo::start(true, 5, 1, 3));
    let mut ok = FileOutcome::new("src/a.ts", FileStatus::Unchanged);
    ok.convergence = Convergence::Converged;
    report.files.push(ok);
    report.findings.push(finding(FindingClass::Residual));
    report.finalize();

    assert_eq!(report.verdict.status, VerdictStatus::Warn);
    assert!(report.is_clean());
}

#[test]
fn fix_failed_finding_makes_report_unclean() {
    let mut report = RunReport::new(tool(), RunInfo::start(false, 5, 1, 3));
    report.findings.push(finding(FindingClass::FixFailed));
    report.finalize();

    assert_eq!(report.summary.findings_fix_failed, 1);
    assert!(!report.is_clean());
}

#[test]
fn report_roundtrips_through_json() {
    let mut report = RunReport::new(tool(), RunInfo::start(false, 5, 1, 3));
    report.files.push(FileOutcome::new("src/a.ts", FileStatus::Unchanged));
    report.finalize();

    let json = serde_json::to_string_pretty(&report).expect("serialize");
    let back: RunReport = serde_json::from_str(&json).expect("parse");
    assert_eq!(back.schema, "syntaxfix.report.v1");
    assert_eq!(back.summary, report.summary);
    assert_eq!(back.run.run_id, report.run.run_id);
}

#[test]
fn fingerprint_is_stable() {
    let f = finding(FindingClass::FixFailed);
    assert_eq!(f.fingerprint(), "array.bare-suffix/src/a.ts:3:5");
    assert!(f.is_fix_failed());
}

#[test]
fn info_residuals_do_not_downgrade_the_verdict() {
    let mut report = RunReport::new(tool(), RunInfo::start(false, 5, 1, 3));
    let mut info = finding(FindingClass::Residual);
    info.severity = Severity::Info;
    report.findings.push(info);
    report.finalize();

    assert_eq!(report.summary.findings_residual, 1);
    assert_eq!(report.verdict.status, VerdictStatus::Pass);
}
