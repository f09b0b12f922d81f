//! Shared DTOs (schemas-as-code) for the syntaxfix workspace.
//!
//! # Design constraints
//! - These types are serialized to disk as the run report.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod finding;
pub mod report;

/// Schema identifiers.
pub mod schema {
    pub const SYNTAXFIX_REPORT_V1: &str = "syntaxfix.report.v1";
    pub const SYNTAXFIX_RULES_V1: &str = "syntaxfix.rules.v1";
}
