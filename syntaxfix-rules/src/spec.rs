//! On-disk rule file format (TOML).
//!
//! ```toml
//! schema = "syntaxfix.rules.v1"
//! version = 2
//!
//! [[rule]]
//! id = "array.bare-suffix"
//! category = "array"
//! pattern = '(?m)^(?P<indent>[ \t]*)(?P<at>\w+)\[\];'
//! replacement = '${indent}${at}: any[];'
//! guard = "type-body"
//!
//! [[rule.example]]
//! input = "interface A {\n  items[];\n}"
//! expected = "interface A {\n  items: any[];\n}"
//! ```

use crate::error::RuleApplicationError;
use crate::rule::{CaptureRef, PatternRule, RuleOverride, ScopeGuard};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use syntaxfix_types::finding::Severity;

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub id: String,
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub pattern: String,

    /// Absent for detect-only rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    #[serde(default)]
    pub guard: ScopeGuard,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub idempotent: bool,

    #[serde(default, rename = "example", skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleSpec>,

    #[serde(default, rename = "override", skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleSpec {
    pub input: String,
    pub expected: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Capture group name or index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,

    pub replacement: String,
}

impl OverrideSpec {
    pub fn compile(&self, rule: &str) -> Result<RuleOverride, RuleApplicationError> {
        let mut ov = RuleOverride::new(self.replacement.clone());
        if let Some(glob) = &self.path {
            ov = ov
                .for_paths(glob)
                .map_err(|source| RuleApplicationError::InvalidGlob {
                    rule: rule.to_string(),
                    glob: glob.clone(),
                    source,
                })?;
        }
        ov.capture = self.capture.as_deref().map(CaptureRef::parse);
        ov.equals = self.equals.clone();
        Ok(ov)
    }
}

impl RuleSpec {
    pub fn compile(&self) -> Result<PatternRule, RuleApplicationError> {
        let mut rule = match &self.replacement {
            Some(replacement) => PatternRule::fix(
                self.id.clone(),
                self.category.clone(),
                &self.pattern,
                replacement.clone(),
            )?,
            None => PatternRule::detect(self.id.clone(), self.category.clone(), &self.pattern)?,
        }
        .with_guard(self.guard)
        .enabled(self.enabled)
        .idempotent(self.idempotent);

        if let Some(description) = &self.description {
            rule = rule.with_description(description.clone());
        }
        if let Some(severity) = self.severity {
            rule = rule.with_severity(severity);
        }
        for example in &self.examples {
            rule = rule.with_example(example.input.clone(), example.expected.clone());
        }
        for ov in &self.overrides {
            rule = rule.with_override(ov.compile(&self.id)?)?;
        }
        Ok(rule)
    }
}

impl RuleFile {
    pub fn parse(contents: &str, origin: &str) -> Result<Self, RuleApplicationError> {
        toml::from_str(contents).map_err(|source| RuleApplicationError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Utf8Path) -> Result<Self, RuleApplicationError> {
        let contents =
            fs_err::read_to_string(path).map_err(|source| RuleApplicationError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents, path.as_str())
    }

    pub fn compile(&self) -> Result<Vec<PatternRule>, RuleApplicationError> {
        self.rules.iter().map(RuleSpec::compile).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 4

[[rule]]
id = "demo.swap"
category = "demo"
pattern = 'foo(?P<at>\d)'
replacement = 'bar${at}'
guard = "code"

[[rule.example]]
input = "foo1"
expected = "bar1"

[[rule.override]]
capture = "at"
equals = "7"
replacement = 'lucky${at}'

[[rule]]
id = "demo.notice"
category = "demo"
pattern = 'bar\d'
severity = "info"
"#;

    #[test]
    fn parses_and_compiles_rules() {
        let file = RuleFile::parse(SAMPLE, "sample").expect("parse");
        assert_eq!(file.version, 4);
        let rules = file.compile().expect("compile");
        assert_eq!(rules.len(), 2);
        assert!(rules[0].is_fix());
        assert_eq!(rules[0].overrides().len(), 1);
        assert!(!rules[1].is_fix());
        assert_eq!(rules[1].severity(), Severity::Info);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RuleFile::parse("[[rule]]\nid = 'a'\ncategory = 'b'\npattern = 'c'\nbogus = 1\n", "x")
            .unwrap_err();
        assert!(matches!(err, RuleApplicationError::Parse { .. }));
    }

    #[test]
    fn unknown_guard_is_rejected() {
        let err = RuleFile::parse(
            "[[rule]]\nid = 'a'\ncategory = 'b'\npattern = 'c'\nguard = 'everywhere'\n",
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, RuleApplicationError::Parse { .. }));
    }

    #[test]
    fn bad_override_glob_is_reported() {
        let spec = OverrideSpec {
            path: Some("src/[".to_string()),
            replacement: "x".to_string(),
            ..OverrideSpec::default()
        };
        let err = spec.compile("r").unwrap_err();
        assert!(matches!(err, RuleApplicationError::InvalidGlob { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RuleFile::load(Utf8Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, RuleApplicationError::Io { .. }));
    }

    #[test]
    fn load_reads_rule_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("extra.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let file = RuleFile::load(&path).unwrap();
        assert_eq!(file.version, 4);
        assert_eq!(file.compile().unwrap().len(), 2);
    }
}
