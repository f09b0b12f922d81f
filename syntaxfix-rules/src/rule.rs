use crate::error::RuleApplicationError;
use crate::scope::{Dialect, FrameKind, ScopeMap};
use regex::{Captures, Match, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use syntaxfix_types::finding::Severity;

/// Name of the optional capture group whose start decides the guard's scope.
///
/// Patterns that need leading context (a delimiter, an indent) put the
/// interesting token in `(?P<at>...)` so the guard looks at the token, not
/// at the context.
pub const ANCHOR_GROUP: &str = "at";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural scope a rule is confined to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeGuard {
    /// Anywhere in code (literals are always excluded).
    #[default]
    Code,
    /// Directly inside an interface, type literal, enum or class body.
    TypeBody,
    /// Directly inside a function or method parameter list.
    ParamList,
    /// Either of the above.
    Signature,
}

impl ScopeGuard {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeGuard::Code => "code",
            ScopeGuard::TypeBody => "type-body",
            ScopeGuard::ParamList => "param-list",
            ScopeGuard::Signature => "signature",
        }
    }

    pub fn admits(self, frame: Option<FrameKind>) -> bool {
        match self {
            ScopeGuard::Code => true,
            ScopeGuard::TypeBody => matches!(frame, Some(k) if k.is_declaration_body()),
            ScopeGuard::ParamList => frame == Some(FrameKind::ParamList),
            ScopeGuard::Signature => matches!(
                frame,
                Some(FrameKind::TypeBody | FrameKind::ClassBody | FrameKind::ParamList)
            ),
        }
    }
}

/// Reference to a capture group, by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaptureRef {
    Index(usize),
    Name(String),
}

impl CaptureRef {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(idx) => CaptureRef::Index(idx),
            Err(_) => CaptureRef::Name(raw.to_string()),
        }
    }

    fn get<'t>(&self, caps: &Captures<'t>) -> Option<&'t str> {
        match self {
            CaptureRef::Index(idx) => caps.get(*idx),
            CaptureRef::Name(name) => caps.name(name),
        }
        .map(|m| m.as_str())
    }

    fn exists_in(&self, pattern: &Regex) -> bool {
        match self {
            CaptureRef::Index(idx) => *idx < pattern.captures_len(),
            CaptureRef::Name(name) => pattern.capture_names().flatten().any(|n| n == name),
        }
    }
}

impl fmt::Display for CaptureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureRef::Index(idx) => write!(f, "{idx}"),
            CaptureRef::Name(name) => f.write_str(name),
        }
    }
}

/// Context-specific replacement that wins over the rule's generic template.
#[derive(Debug, Clone)]
pub struct RuleOverride {
    pub path: Option<glob::Pattern>,
    pub capture: Option<CaptureRef>,
    pub equals: Option<String>,
    pub replacement: String,
}

impl RuleOverride {
    pub fn new(replacement: impl Into<String>) -> Self {
        Self {
            path: None,
            capture: None,
            equals: None,
            replacement: replacement.into(),
        }
    }

    pub fn for_paths(mut self, glob: &str) -> Result<Self, glob::PatternError> {
        self.path = Some(glob::Pattern::new(glob)?);
        Ok(self)
    }

    pub fn when_capture(mut self, capture: CaptureRef, equals: impl Into<String>) -> Self {
        self.capture = Some(capture);
        self.equals = Some(equals.into());
        self
    }

    fn holds(&self, path: &str, caps: &Captures<'_>) -> bool {
        if let Some(glob) = &self.path
            && !glob.matches(path)
        {
            return false;
        }
        let value = match &self.capture {
            Some(capture) => capture.get(caps),
            None => caps.get(0).map(|m| m.as_str()),
        };
        match (&self.equals, value) {
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
            (None, value) => value.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExample {
    pub input: String,
    pub expected: String,
}

/// Where a match landed relative to its rule's guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Admitted,
    /// Code, but outside the structural scope the guard requires.
    OutOfScope,
    /// Overlaps a string, comment, regex literal or markup.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSite {
    pub start: usize,
    pub end: usize,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    /// Root-relative path, matched against override globs.
    pub path: &'a str,
    pub dialect: Dialect,
}

impl<'a> ApplyContext<'a> {
    pub fn for_path(path: &'a str) -> Self {
        Self {
            path,
            dialect: Dialect::for_path(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub text: String,
    pub fired: u64,
    pub changed: bool,
}

impl RuleOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fired: 0,
            changed: false,
        }
    }
}

/// A declarative rewrite: pattern, replacement template, scope guard.
///
/// A rule without a replacement is detect-only; it never rewrites and only
/// contributes residual findings during validation.
#[derive(Debug, Clone)]
pub struct PatternRule {
    id: RuleId,
    category: String,
    description: Option<String>,
    pattern: Regex,
    replacement: Option<String>,
    guard: ScopeGuard,
    severity: Severity,
    idempotent: bool,
    enabled: bool,
    examples: Vec<RuleExample>,
    overrides: Vec<RuleOverride>,
    anchor: Option<usize>,
}

impl PatternRule {
    pub fn fix(
        id: impl Into<String>,
        category: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleApplicationError> {
        Self::new(id.into(), category.into(), pattern, Some(replacement.into()))
    }

    pub fn detect(
        id: impl Into<String>,
        category: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, RuleApplicationError> {
        Self::new(id.into(), category.into(), pattern, None)
    }

    fn new(
        id: String,
        category: String,
        pattern: &str,
        replacement: Option<String>,
    ) -> Result<Self, RuleApplicationError> {
        let pattern = Regex::new(pattern).map_err(|source| RuleApplicationError::InvalidPattern {
            rule: id.clone(),
            source,
        })?;

        if let Some(template) = &replacement {
            check_template(&id, &pattern, template)?;
        }

        let anchor = pattern
            .capture_names()
            .position(|name| name == Some(ANCHOR_GROUP));

        Ok(Self {
            id: RuleId(id),
            category,
            description: None,
            pattern,
            replacement,
            guard: ScopeGuard::Code,
            severity: Severity::Warn,
            idempotent: true,
            enabled: true,
            examples: Vec::new(),
            overrides: Vec::new(),
            anchor,
        })
    }

    pub fn with_guard(mut self, guard: ScopeGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_example(mut self, input: impl Into<String>, expected: impl Into<String>) -> Self {
        self.examples.push(RuleExample {
            input: input.into(),
            expected: expected.into(),
        });
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Attach an override. Its template is checked like the rule's own.
    pub fn with_override(mut self, ov: RuleOverride) -> Result<Self, RuleApplicationError> {
        if let Some(capture) = &ov.capture
            && !capture.exists_in(&self.pattern)
        {
            return Err(RuleApplicationError::UnknownCapture {
                rule: self.id.0.clone(),
                reference: capture.to_string(),
            });
        }
        check_template(&self.id.0, &self.pattern, &ov.replacement)?;
        self.overrides.push(ov);
        Ok(self)
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    pub fn guard(&self) -> ScopeGuard {
        self.guard
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_fix(&self) -> bool {
        self.replacement.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub fn examples(&self) -> &[RuleExample] {
        &self.examples
    }

    pub fn overrides(&self) -> &[RuleOverride] {
        &self.overrides
    }

    /// Replacement templates that reference no capture group, as the text
    /// they insert.
    pub fn literal_outputs(&self) -> Vec<String> {
        self.replacement
            .iter()
            .chain(self.overrides.iter().map(|ov| &ov.replacement))
            .filter(|template| template_refs(template).is_empty())
            .map(|template| template.replace("$$", "$"))
            .collect()
    }

    /// Same id, same behaviour. Used to fold exact duplicates.
    pub fn same_definition(&self, other: &PatternRule) -> bool {
        self.id == other.id
            && self.category == other.category
            && self.pattern.as_str() == other.pattern.as_str()
            && self.replacement == other.replacement
            && self.guard == other.guard
            && self.severity == other.severity
            && self.enabled == other.enabled
    }

    /// Rewrite every admitted match in `text`.
    pub fn apply(&self, text: &str, ctx: &ApplyContext<'_>) -> RuleOutcome {
        if !self.is_fix() || !self.pattern.is_match(text) {
            return RuleOutcome::unchanged(text);
        }
        let scope = ScopeMap::scan(text, ctx.dialect);
        self.apply_scoped(text, &scope, ctx)
    }

    pub(crate) fn apply_scoped(
        &self,
        text: &str,
        scope: &ScopeMap,
        ctx: &ApplyContext<'_>,
    ) -> RuleOutcome {
        let Some(template) = self.replacement.as_deref() else {
            return RuleOutcome::unchanged(text);
        };

        let mut out = String::with_capacity(text.len() + 16);
        let mut copied = 0;
        let mut fired = 0;
        let mut at = 0;

        while at <= text.len() {
            let Some(caps) = self.pattern.captures_at(text, at) else {
                break;
            };
            let Some(m) = caps.get(0) else {
                break;
            };
            if m.is_empty() {
                at = next_char(text, m.end());
                continue;
            }
            if self.placement(&caps, m, scope) != Placement::Admitted {
                at = next_char(text, m.start());
                continue;
            }

            out.push_str(&text[copied..m.start()]);
            caps.expand(self.template_for(ctx.path, &caps, template), &mut out);
            copied = m.end();
            fired += 1;
            at = m.end();
        }

        if fired == 0 {
            return RuleOutcome::unchanged(text);
        }
        out.push_str(&text[copied..]);
        let changed = out != text;
        RuleOutcome {
            text: out,
            fired,
            changed,
        }
    }

    /// Every non-empty match of the pattern, classified against the guard.
    ///
    /// Overlapping rejected matches are reported once.
    pub fn match_sites(&self, text: &str, scope: &ScopeMap) -> Vec<MatchSite> {
        let mut sites = Vec::new();
        let mut reported_end = 0;
        let mut at = 0;

        while at <= text.len() {
            let Some(caps) = self.pattern.captures_at(text, at) else {
                break;
            };
            let Some(m) = caps.get(0) else {
                break;
            };
            if m.is_empty() {
                at = next_char(text, m.end());
                continue;
            }

            let placement = self.placement(&caps, m, scope);
            if placement == Placement::Admitted || m.start() >= reported_end {
                sites.push(MatchSite {
                    start: m.start(),
                    end: m.end(),
                    placement,
                });
                reported_end = reported_end.max(m.end());
            }
            at = match placement {
                Placement::Admitted => m.end(),
                _ => next_char(text, m.start()),
            };
        }
        sites
    }

    fn placement(&self, caps: &Captures<'_>, m: Match<'_>, scope: &ScopeMap) -> Placement {
        if !scope.is_code(m.start(), m.end()) {
            return Placement::Literal;
        }
        let anchor = self
            .anchor
            .and_then(|idx| caps.get(idx))
            .map(|g| g.start())
            .unwrap_or(m.start());
        if self.guard.admits(scope.frame_at(anchor)) {
            Placement::Admitted
        } else {
            Placement::OutOfScope
        }
    }

    fn template_for<'s>(&'s self, path: &str, caps: &Captures<'_>, fallback: &'s str) -> &'s str {
        self.overrides
            .iter()
            .find(|ov| ov.holds(path, caps))
            .map(|ov| ov.replacement.as_str())
            .unwrap_or(fallback)
    }

    /// Check the rule against its own examples.
    pub fn verify_examples(&self) -> Result<(), RuleApplicationError> {
        if !self.is_fix() {
            return Ok(());
        }
        let ctx = ApplyContext {
            path: "",
            dialect: Dialect::Script,
        };
        for (index, example) in self.examples.iter().enumerate() {
            let out = self.apply(&example.input, &ctx);
            if out.text != example.expected {
                return Err(RuleApplicationError::ExampleMismatch {
                    rule: self.id.0.clone(),
                    index,
                    expected: example.expected.clone(),
                    actual: out.text,
                });
            }
            if self.idempotent {
                let again = self.apply(&example.expected, &ctx);
                if again.changed {
                    return Err(RuleApplicationError::NotIdempotent {
                        rule: self.id.0.clone(),
                        index,
                        actual: again.text,
                    });
                }
            }
        }
        Ok(())
    }
}

fn next_char(text: &str, at: usize) -> usize {
    text.get(at..)
        .and_then(|rest| rest.chars().next())
        .map(|c| at + c.len_utf8())
        .unwrap_or(text.len() + 1)
}

/// Capture references used by a replacement template (`$1`, `${name}`, `$name`).
pub(crate) fn template_refs(template: &str) -> Vec<CaptureRef> {
    let bytes = template.as_bytes();
    let mut refs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'$') => i += 2,
            Some(b'{') => match template[i + 2..].find('}') {
                Some(close) => {
                    refs.push(CaptureRef::parse(&template[i + 2..i + 2 + close]));
                    i += close + 3;
                }
                None => i += 1,
            },
            _ => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start {
                    refs.push(CaptureRef::parse(&template[start..end]));
                }
                i = end.max(i + 1);
            }
        }
    }
    refs
}

fn check_template(rule: &str, pattern: &Regex, template: &str) -> Result<(), RuleApplicationError> {
    let refs = template_refs(template);
    if let Some(missing) = refs.iter().find(|r| !r.exists_in(pattern)) {
        return Err(RuleApplicationError::UnknownCapture {
            rule: rule.to_string(),
            reference: missing.to_string(),
        });
    }
    if refs.is_empty() {
        let literal = template.replace("$$", "$");
        if pattern.is_match(&literal) {
            return Err(RuleApplicationError::SelfMatchingReplacement {
                rule: rule.to_string(),
                replacement: literal,
            });
        }
    }
    Ok(())
}
