//! Embeddable core library for syntaxfix.
//!
//! Provides a clap-free, I/O-abstracted repair pipeline: walk a tree, run
//! each file's content through a rule set until it reaches a fixed point,
//! commit atomically, validate what is left, and aggregate a report.
//!
//! # Port traits
//!
//! All file I/O is abstracted behind port traits in [`ports`]:
//! - [`SourceReader`](ports::SourceReader): read a source file
//! - [`CommitPort`](ports::CommitPort): publish repaired content
//! - [`WritePort`](ports::WritePort): write report artifacts
//!
//! The [`adapters`] module provides default filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`build_rule_set`](pipeline::build_rule_set): assemble and validate rules
//! - [`run_repair`](pipeline::run_repair): repair a tree and produce a report

pub mod adapters;
pub mod cancel;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod runner;
pub mod settings;
pub mod validate;
pub mod walker;

pub use cancel::RunCancellation;
pub use error::RepairError;
pub use pipeline::{
    build_rule_set, run_repair, run_repair_with_cancellation, write_report_artifacts, RunError,
    RunOutcome,
};
pub use runner::{PassRunner, RepairOutcome, DEFAULT_MAX_PASSES};
pub use settings::{NonConvergedPolicy, RuleOverrideSetting, RuleSources, RunSettings};
pub use validate::Validator;
pub use walker::{ExclusionPolicy, FileWalker, SourceFile, WalkEntry, WalkError};

// Re-export the rule model so embedders don't need syntaxfix-rules directly.
pub use syntaxfix_rules::{RuleSet, builtin_rule_set};
