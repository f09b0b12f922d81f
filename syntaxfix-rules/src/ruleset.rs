use crate::error::RuleApplicationError;
use crate::rule::{ApplyContext, PatternRule, RuleOverride};
use crate::scope::{Dialect, ScopeMap};
use crate::spec::RuleFile;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ordered, validated collection of rules.
///
/// Order is significant: within one pass every rule sees the output of the
/// rules before it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    version: u32,
    rules: Vec<PatternRule>,
}

/// Result of applying every fix rule once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub text: String,
    pub changed: bool,
    /// Rule id -> number of rewrites in this pass.
    pub fires: BTreeMap<String, u64>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    pub fn category_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|r| r.category())
    }

    /// Categories in first-declared order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.rules
            .iter()
            .map(|r| r.category())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn fix_rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter().filter(|r| r.is_fix())
    }

    /// Apply every fix rule once, in order.
    pub fn apply_pass(&self, text: &str, ctx: &ApplyContext<'_>) -> PassOutcome {
        let mut current = text.to_string();
        let mut scope: Option<ScopeMap> = None;
        let mut fires = BTreeMap::new();

        for rule in self.fix_rules() {
            if !rule.pattern().is_match(&current) {
                continue;
            }
            let map = scope.get_or_insert_with(|| ScopeMap::scan(&current, ctx.dialect));
            let out = rule.apply_scoped(&current, map, ctx);
            if out.fired > 0 {
                *fires.entry(rule.id().to_string()).or_insert(0) += out.fired;
            }
            if out.changed {
                current = out.text;
                scope = None;
            }
        }

        let changed = current != text;
        PassOutcome {
            text: current,
            changed,
            fires,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    version: Option<u32>,
    rules: Vec<PatternRule>,
    enable: BTreeSet<String>,
    disable: BTreeSet<String>,
    overrides: Vec<(String, RuleOverride)>,
}

impl RuleSetBuilder {
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = PatternRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Add every rule of a rule file. The highest file version wins.
    pub fn rule_file(mut self, file: &RuleFile) -> Result<Self, RuleApplicationError> {
        self.version = Some(self.version.map_or(file.version, |v| v.max(file.version)));
        self.rules.extend(file.compile()?);
        Ok(self)
    }

    /// Turn on a rule that is off by default.
    pub fn enable(mut self, id: impl Into<String>) -> Self {
        self.enable.insert(id.into());
        self
    }

    pub fn disable(mut self, id: impl Into<String>) -> Self {
        self.disable.insert(id.into());
        self
    }

    pub fn override_rule(mut self, id: impl Into<String>, ov: RuleOverride) -> Self {
        self.overrides.push((id.into(), ov));
        self
    }

    pub fn build(self) -> Result<RuleSet, RuleApplicationError> {
        let mut rules: Vec<PatternRule> = Vec::with_capacity(self.rules.len());
        for rule in self.rules {
            match rules.iter().find(|r| r.id() == rule.id()) {
                Some(existing) if existing.same_definition(&rule) => {
                    debug!(rule = rule.id(), "dropping duplicate rule definition");
                }
                Some(_) => {
                    return Err(RuleApplicationError::DuplicateRule {
                        rule: rule.id().to_string(),
                    });
                }
                None => rules.push(rule),
            }
        }

        for (ids, context) in [(&self.enable, "rules.enable"), (&self.disable, "rules.disable")] {
            if let Some(unknown) = ids.iter().find(|id| !rules.iter().any(|r| r.id() == id.as_str())) {
                return Err(RuleApplicationError::UnknownRule {
                    rule: unknown.clone(),
                    context: context.to_string(),
                });
            }
        }

        let (mut active, inactive): (Vec<PatternRule>, Vec<PatternRule>) =
            rules.into_iter().partition(|r| {
                (r.is_enabled() || self.enable.contains(r.id())) && !self.disable.contains(r.id())
            });
        for rule in &inactive {
            debug!(rule = rule.id(), "rule not active");
        }

        for rule in &active {
            rule.verify_examples()?;
        }

        for (id, ov) in self.overrides {
            match active.iter().position(|r| r.id() == id) {
                Some(idx) => {
                    let rule = active.remove(idx);
                    active.insert(idx, rule.with_override(ov)?);
                }
                None if inactive.iter().any(|r| r.id() == id) => {
                    debug!(rule = %id, "override targets an inactive rule");
                }
                None => {
                    return Err(RuleApplicationError::UnknownRule {
                        rule: id,
                        context: "override".to_string(),
                    });
                }
            }
        }

        detect_cycles(&active)?;

        Ok(RuleSet {
            version: self.version.unwrap_or(1),
            rules: active,
        })
    }
}

/// Reject rule sets where a rule's output, after passing through other
/// rules, is rewritten by the same rule again.
///
/// Each example output, and each literal replacement, is driven to
/// quiescence through the whole set; if the originating rule fires along the
/// way, the chain is a cycle.
fn detect_cycles(rules: &[PatternRule]) -> Result<(), RuleApplicationError> {
    let fixers: Vec<&PatternRule> = rules.iter().filter(|r| r.is_fix()).collect();
    let ctx = ApplyContext {
        path: "",
        dialect: Dialect::Script,
    };
    let limit = fixers.len() * 2 + 2;

    for origin in &fixers {
        let seeds = origin
            .examples()
            .iter()
            .map(|example| example.expected.clone())
            .chain(origin.literal_outputs());
        for seed in seeds {
            let mut text = seed;
            let mut trail = vec![origin.id().to_string()];

            let mut quiet = false;
            for _ in 0..limit {
                let mut progressed = false;
                for rule in &fixers {
                    let out = rule.apply(&text, &ctx);
                    if !out.changed {
                        continue;
                    }
                    trail.push(rule.id().to_string());
                    if rule.id() == origin.id() {
                        return Err(RuleApplicationError::CyclicTrigger { cycle: trail });
                    }
                    text = out.text;
                    progressed = true;
                }
                if !progressed {
                    quiet = true;
                    break;
                }
            }
            if !quiet {
                return Err(RuleApplicationError::CyclicTrigger { cycle: trail });
            }
        }
    }
    Ok(())
}
