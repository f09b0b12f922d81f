//! Clap-free settings for the repair pipeline.

use crate::runner::DEFAULT_MAX_PASSES;
use crate::walker::DEFAULT_EXTENSIONS;
use camino::Utf8PathBuf;
use std::time::Duration;
use syntaxfix_rules::OverrideSpec;

/// What happens to a file whose passes never reached a fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonConvergedPolicy {
    /// Leave the file untouched.
    #[default]
    Discard,
    /// Commit the output of the last pass.
    CommitLastPass,
}

/// Settings for one repair run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub roots: Vec<Utf8PathBuf>,
    pub extensions: Vec<String>,

    // Exclusions
    pub exclude: Vec<String>,
    pub default_excludes: bool,

    // Passes
    pub max_passes: u32,
    pub non_converged: NonConvergedPolicy,

    // Output
    pub dry_run: bool,
    pub include_patches: bool,

    // Scheduling
    pub jobs: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            roots: vec![Utf8PathBuf::from(".")],
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude: Vec::new(),
            default_excludes: true,
            max_passes: DEFAULT_MAX_PASSES,
            non_converged: NonConvergedPolicy::default(),
            dry_run: false,
            include_patches: false,
            jobs: None,
            timeout: None,
        }
    }
}

/// An override attached to a rule by id, from configuration.
#[derive(Debug, Clone)]
pub struct RuleOverrideSetting {
    pub rule: String,
    pub spec: OverrideSpec,
}

/// Where the rule set comes from.
#[derive(Debug, Clone)]
pub struct RuleSources {
    pub builtin: bool,
    pub files: Vec<Utf8PathBuf>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub overrides: Vec<RuleOverrideSetting>,
}

impl Default for RuleSources {
    fn default() -> Self {
        Self {
            builtin: true,
            files: Vec::new(),
            enable: Vec::new(),
            disable: Vec::new(),
            overrides: Vec::new(),
        }
    }
}
