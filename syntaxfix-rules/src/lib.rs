//! Rule model for syntaxfix: pattern rules, scope guards, ordered rule sets
//! and the built-in catalog.
//!
//! This crate owns *what* a rewrite is and *where* it may apply. Running
//! rules to a fixed point and touching the filesystem belong to
//! `syntaxfix-core` and `syntaxfix-edit`.

mod catalog;
mod error;
mod rule;
mod ruleset;
pub mod scope;
mod spec;

pub use catalog::{builtin_rule_file, builtin_rule_set, TYPESCRIPT_CATALOG, TYPESCRIPT_ORIGIN};
pub use error::RuleApplicationError;
pub use rule::{
    ApplyContext, CaptureRef, MatchSite, PatternRule, Placement, RuleExample, RuleId,
    RuleOutcome, RuleOverride, ScopeGuard, ANCHOR_GROUP,
};
pub use ruleset::{PassOutcome, RuleSet, RuleSetBuilder};
pub use scope::{Dialect, ScopeMap};
pub use spec::{ExampleSpec, OverrideSpec, RuleFile, RuleSpec};
