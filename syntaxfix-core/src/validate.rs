//! Post-repair scan for patterns that should no longer be present.

use syntaxfix_rules::{Dialect, PatternRule, Placement, RuleSet, ScopeMap};
use syntaxfix_types::finding::{FindingClass, FindingLocation, Severity, ValidationFinding};

const EXCERPT_CHARS: usize = 80;

/// Re-runs every rule's pattern (no replacement) over final content.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    rules: &'a RuleSet,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Findings for one file, ordered by location then rule id.
    ///
    /// - fix rule, match admitted by its guard: `fix_failed`, error
    /// - fix rule, match in code outside the guard: `residual`
    /// - detect-only rule, admitted match: `residual` at the rule's severity
    ///
    /// Matches inside strings, comments and markup are ignored.
    pub fn scan(&self, path: &str, content: &str, dialect: Dialect) -> Vec<ValidationFinding> {
        let mut scope: Option<ScopeMap> = None;
        let mut findings = Vec::new();

        for rule in self.rules.rules() {
            if !rule.pattern().is_match(content) {
                continue;
            }
            let map = scope.get_or_insert_with(|| ScopeMap::scan(content, dialect));
            for site in rule.match_sites(content, map) {
                let Some((class, severity)) = classify(rule, site.placement) else {
                    continue;
                };
                findings.push(ValidationFinding {
                    path: path.to_string(),
                    rule_id: rule.id().to_string(),
                    category: rule.category().to_string(),
                    class,
                    severity,
                    location: locate(content, site.start),
                    excerpt: excerpt(&content[site.start..site.end]),
                    message: message(rule, class),
                });
            }
        }

        findings.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        findings
    }
}

fn classify(rule: &PatternRule, placement: Placement) -> Option<(FindingClass, Severity)> {
    match (rule.is_fix(), placement) {
        (_, Placement::Literal) => None,
        (true, Placement::Admitted) => Some((FindingClass::FixFailed, Severity::Error)),
        (true, Placement::OutOfScope) => Some((FindingClass::Residual, rule.severity())),
        (false, Placement::Admitted) => Some((FindingClass::Residual, rule.severity())),
        (false, Placement::OutOfScope) => None,
    }
}

fn message(rule: &PatternRule, class: FindingClass) -> Option<String> {
    match class {
        FindingClass::FixFailed => Some(format!(
            "`{}` still matches inside its {} scope",
            rule.id(),
            rule.guard().as_str()
        )),
        FindingClass::Residual => rule.description().map(str::to_string),
    }
}

fn locate(content: &str, offset: usize) -> FindingLocation {
    let before = &content[..offset];
    let line = before.matches('\n').count() as u64 + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() as u64 + 1;
    FindingLocation { line, col }
}

fn excerpt(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= EXCERPT_CHARS && first_line.len() == text.len() {
        return first_line.to_string();
    }
    let mut out: String = first_line.chars().take(EXCERPT_CHARS).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use syntaxfix_rules::ScopeGuard;

    fn rules() -> RuleSet {
        RuleSet::builder()
            .rule(
                PatternRule::fix("bare", "array", r"(?P<at>\w+)\[\];", "${at}: any[];")
                    .expect("rule")
                    .with_guard(ScopeGuard::TypeBody),
            )
            .rule(
                PatternRule::detect("todo", "notes", r"TODO")
                    .expect("rule")
                    .with_severity(Severity::Info),
            )
            .build()
            .expect("rule set")
    }

    #[test]
    fn admitted_match_of_fix_rule_is_fix_failed() {
        let set = rules();
        let findings = Validator::new(&set).scan(
            "src/a.ts",
            "interface A {\n  items[];\n}",
            Dialect::Script,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].class, FindingClass::FixFailed);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].location, FindingLocation { line: 2, col: 3 });
        assert_eq!(findings[0].excerpt, "items[];");
    }

    #[test]
    fn out_of_scope_match_is_residual() {
        let set = rules();
        let findings =
            Validator::new(&set).scan("src/a.ts", "function f() {\n  x[];\n}", Dialect::Script);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].class, FindingClass::Residual);
        assert_eq!(findings[0].severity, Severity::Warn);
    }

    #[test]
    fn literal_matches_are_ignored() {
        let set = rules();
        let findings = Validator::new(&set).scan(
            "src/a.ts",
            "const s = \"items[];\"; // TODO later\n",
            Dialect::Script,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn detect_only_rule_uses_declared_severity() {
        let set = rules();
        let findings = Validator::new(&set).scan("src/a.ts", "let TODO = 1;", Dialect::Script);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].class, FindingClass::Residual);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn columns_count_characters() {
        assert_eq!(locate("é x", 3), FindingLocation { line: 1, col: 3 });
        assert_eq!(locate("a\nbc", 3), FindingLocation { line: 2, col: 2 });
    }

    #[test]
    fn long_excerpts_are_truncated() {
        let long = "x".repeat(200);
        let out = excerpt(&long);
        assert_eq!(out.chars().count(), EXCERPT_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
