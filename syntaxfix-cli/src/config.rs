//! Configuration file loading for syntaxfix.
//!
//! Discovers and loads `syntaxfix.toml` next to the first root (or from
//! `--config`). Merges config file settings with CLI arguments: CLI lists
//! extend the file's lists, CLI scalars win.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::time::Duration;
use syntaxfix_core::{
    NonConvergedPolicy, RuleOverrideSetting, RuleSources, RunSettings, DEFAULT_MAX_PASSES,
};
use syntaxfix_core::walker::DEFAULT_EXTENSIONS;
use syntaxfix_rules::OverrideSpec;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "syntaxfix.toml";

/// Top-level configuration from syntaxfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxfixConfig {
    pub run: RunConfig,
    pub rules: RulesConfig,

    /// Per-rule replacement overrides.
    #[serde(rename = "override")]
    pub overrides: Vec<OverrideConfig>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub max_passes: Option<u32>,
    pub extensions: Vec<String>,

    /// Extra exclusions: directory names, path prefixes, suffixes or globs.
    pub exclude: Vec<String>,

    /// Keep the standard exclusions (`node_modules`, `.git`, ...). Default true.
    pub default_excludes: Option<bool>,

    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub commit_non_converged: Option<bool>,
}

/// `[rules]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Load the built-in catalog. Default true.
    pub builtin: Option<bool>,

    /// Extra rule files, relative to the config file.
    pub files: Vec<Utf8PathBuf>,

    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

/// One `[[override]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideConfig {
    pub rule: String,
    pub path: Option<String>,
    pub capture: Option<String>,
    pub equals: Option<String>,
    pub replacement: String,
}

impl OverrideConfig {
    fn to_setting(&self) -> RuleOverrideSetting {
        RuleOverrideSetting {
            rule: self.rule.clone(),
            spec: OverrideSpec {
                path: self.path.clone(),
                capture: self.capture.clone(),
                equals: self.equals.clone(),
                replacement: self.replacement.clone(),
            },
        }
    }
}

/// Where to look for a config file when `--config` is not given.
pub fn discover_config(first_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let dir = if first_root.is_file() {
        first_root.parent().unwrap_or(Utf8Path::new("."))
    } else {
        first_root
    };
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a syntaxfix.toml config file. Relative rule file paths are
/// resolved against the config file's directory.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<SyntaxfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    let mut config =
        parse_config(&contents).with_context(|| format!("parse config file {}", path))?;
    if let Some(base) = path.parent().filter(|p| !p.as_str().is_empty()) {
        for file in &mut config.rules.files {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }
    Ok(config)
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<SyntaxfixConfig> {
    let config: SyntaxfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config, or the discovered one, or defaults.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    first_root: &Utf8Path,
) -> anyhow::Result<SyntaxfixConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match discover_config(first_root) {
            Some(path) => load_config(&path),
            None => Ok(SyntaxfixConfig::default()),
        },
    }
}

/// Run-related CLI arguments, as parsed.
#[derive(Debug, Clone, Default)]
pub struct CliRunArgs {
    pub roots: Vec<Utf8PathBuf>,
    pub max_passes: Option<u32>,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub no_default_excludes: bool,
    pub dry_run: bool,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub commit_non_converged: bool,
    pub rule_files: Vec<Utf8PathBuf>,
    pub no_builtin_rules: bool,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: RunSettings,
    pub sources: RuleSources,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: SyntaxfixConfig,
}

impl ConfigMerger {
    pub fn new(config: SyntaxfixConfig) -> Self {
        Self { config }
    }

    pub fn merge_run_args(self, cli: &CliRunArgs) -> MergedConfig {
        let run = self.config.run;
        let rules = self.config.rules;

        let extensions = if !cli.extensions.is_empty() {
            cli.extensions.clone()
        } else if !run.extensions.is_empty() {
            run.extensions
        } else {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        };

        let commit_non_converged =
            cli.commit_non_converged || run.commit_non_converged.unwrap_or(false);

        let settings = RunSettings {
            roots: cli.roots.clone(),
            extensions,
            exclude: extend(run.exclude, &cli.exclude),
            default_excludes: !cli.no_default_excludes && run.default_excludes.unwrap_or(true),
            max_passes: cli
                .max_passes
                .or(run.max_passes)
                .unwrap_or(DEFAULT_MAX_PASSES),
            non_converged: if commit_non_converged {
                NonConvergedPolicy::CommitLastPass
            } else {
                NonConvergedPolicy::Discard
            },
            dry_run: cli.dry_run,
            include_patches: cli.dry_run,
            jobs: cli.jobs.or(run.jobs),
            timeout: cli
                .timeout_secs
                .or(run.timeout_secs)
                .map(Duration::from_secs),
        };

        let sources = RuleSources {
            builtin: !cli.no_builtin_rules && rules.builtin.unwrap_or(true),
            files: extend(rules.files, &cli.rule_files),
            enable: extend(rules.enable, &cli.enable),
            disable: extend(rules.disable, &cli.disable),
            overrides: self
                .config
                .overrides
                .iter()
                .map(OverrideConfig::to_setting)
                .collect(),
        };

        MergedConfig { settings, sources }
    }
}

fn extend<T: Clone + PartialEq>(mut base: Vec<T>, extra: &[T]) -> Vec<T> {
    for item in extra {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[run]
max_passes = 8
extensions = ["ts"]
exclude = ["generated", "src/legacy/"]
jobs = 2
timeout_secs = 30
commit_non_converged = true

[rules]
builtin = true
files = ["rules/extra.toml"]
enable = ["implicit-any.callback-param"]
disable = ["colon-chain.cast"]

[[override]]
rule = "array.bare-suffix"
capture = "at"
equals = "tags"
replacement = "${lead}${ws}${at}: string[]${term}"
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.run.max_passes, Some(8));
        assert_eq!(config.run.exclude.len(), 2);
        assert_eq!(config.run.jobs, Some(2));
        assert_eq!(config.rules.files, vec![Utf8PathBuf::from("rules/extra.toml")]);
        assert_eq!(config.overrides.len(), 1);
        assert_eq!(config.overrides[0].equals.as_deref(), Some("tags"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.run.max_passes.is_none());
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("[run]\nmax_pass = 3\n").is_err());
    }

    #[test]
    fn test_merge_defaults() {
        let cli = CliRunArgs {
            roots: vec![Utf8PathBuf::from(".")],
            ..CliRunArgs::default()
        };
        let merged = ConfigMerger::new(SyntaxfixConfig::default()).merge_run_args(&cli);
        assert_eq!(merged.settings.max_passes, DEFAULT_MAX_PASSES);
        assert_eq!(merged.settings.extensions, vec!["ts", "tsx"]);
        assert!(merged.settings.default_excludes);
        assert_eq!(merged.settings.non_converged, NonConvergedPolicy::Discard);
        assert!(merged.sources.builtin);
    }

    #[test]
    fn test_merge_cli_extends_lists_and_overrides_scalars() {
        let config = SyntaxfixConfig {
            run: RunConfig {
                max_passes: Some(8),
                exclude: vec!["generated".to_string()],
                jobs: Some(2),
                ..Default::default()
            },
            rules: RulesConfig {
                disable: vec!["colon-chain.cast".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = CliRunArgs {
            roots: vec![Utf8PathBuf::from("src")],
            max_passes: Some(3),
            exclude: vec!["vendor".to_string(), "generated".to_string()],
            disable: vec!["colon-chain.union-member".to_string()],
            ..CliRunArgs::default()
        };

        let merged = ConfigMerger::new(config).merge_run_args(&cli);
        assert_eq!(merged.settings.max_passes, 3);
        assert_eq!(merged.settings.jobs, Some(2));
        assert_eq!(merged.settings.exclude, vec!["generated", "vendor"]);
        assert_eq!(merged.sources.disable.len(), 2);
    }

    #[test]
    fn test_config_flags_apply_when_cli_is_silent() {
        let config = SyntaxfixConfig {
            run: RunConfig {
                commit_non_converged: Some(true),
                default_excludes: Some(false),
                timeout_secs: Some(10),
                ..Default::default()
            },
            rules: RulesConfig {
                builtin: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = ConfigMerger::new(config).merge_run_args(&CliRunArgs::default());
        assert_eq!(
            merged.settings.non_converged,
            NonConvergedPolicy::CommitLastPass
        );
        assert!(!merged.settings.default_excludes);
        assert_eq!(merged.settings.timeout, Some(Duration::from_secs(10)));
        assert!(!merged.sources.builtin);
    }

    #[test]
    fn test_rule_files_resolve_against_config_dir() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        std::fs::write(
            root.join(CONFIG_FILE_NAME),
            "[rules]\nfiles = [\"rules/extra.toml\"]\n",
        )
        .expect("write config");

        let config = load_or_default(None, &root).expect("load");
        assert_eq!(config.rules.files, vec![root.join("rules/extra.toml")]);
    }

    #[test]
    fn test_discover_config_some_and_none() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "").expect("write config");
        assert!(discover_config(&root).is_some());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let err = load_or_default(Some(Utf8Path::new("/no/such/syntaxfix.toml")), Utf8Path::new("."))
            .unwrap_err();
        assert!(format!("{err:#}").contains("read config file"));
    }
}
