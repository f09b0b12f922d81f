//! Fixed-point iteration of a rule set over one file's content.

use std::collections::BTreeMap;
use syntaxfix_hash::ContentHash;
use syntaxfix_rules::{ApplyContext, RuleSet};
use syntaxfix_types::report::Convergence;
use tracing::debug;

pub const DEFAULT_MAX_PASSES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Content after the last executed pass.
    pub content: String,
    pub convergence: Convergence,
    /// Passes that changed the content, at least 1.
    pub passes_used: u32,
    /// Every pass run, including the one that confirmed the fixed point.
    pub passes_executed: u32,
    /// Rule id -> rewrites, summed over all passes.
    pub fires: BTreeMap<String, u64>,
}

impl RepairOutcome {
    pub fn converged(&self) -> bool {
        self.convergence.is_converged()
    }

    pub fn changed_from(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Applies a [`RuleSet`] until the content stops changing.
///
/// Every state is hashed. A pass that reproduces the previous state is a
/// fixed point; one that reproduces an older state is an oscillation.
#[derive(Debug, Clone, Copy)]
pub struct PassRunner<'a> {
    rules: &'a RuleSet,
    max_passes: u32,
}

impl<'a> PassRunner<'a> {
    pub fn new(rules: &'a RuleSet, max_passes: u32) -> Self {
        Self {
            rules,
            max_passes: max_passes.max(1),
        }
    }

    pub fn max_passes(&self) -> u32 {
        self.max_passes
    }

    pub fn repair(&self, content: &str, ctx: &ApplyContext<'_>) -> RepairOutcome {
        let mut history = vec![ContentHash::of_str(content)];
        let mut current = content.to_string();
        let mut fires: BTreeMap<String, u64> = BTreeMap::new();
        let mut changing = 0u32;
        let mut convergence = Convergence::Exhausted;
        let mut executed = 0u32;

        while executed < self.max_passes {
            executed += 1;
            let pass = self.rules.apply_pass(&current, ctx);
            for (rule, n) in pass.fires {
                *fires.entry(rule).or_insert(0) += n;
            }

            let hash = ContentHash::of_str(&pass.text);
            if history.last() == Some(&hash) {
                convergence = Convergence::Converged;
                break;
            }
            changing += 1;
            current = pass.text;

            if let Some(pos) = history.iter().position(|h| *h == hash) {
                let period = (history.len() - pos) as u32;
                debug!(path = ctx.path, period, pass = executed, hash = %hash.short(), "oscillation");
                convergence = Convergence::Oscillating { period };
                break;
            }
            history.push(hash);
        }

        if convergence == Convergence::Exhausted {
            debug!(path = ctx.path, passes = executed, "pass budget exhausted");
        }

        RepairOutcome {
            content: current,
            convergence,
            passes_used: changing.max(1),
            passes_executed: executed,
            fires,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syntaxfix_rules::PatternRule;

    fn ctx() -> ApplyContext<'static> {
        ApplyContext::for_path("src/a.ts")
    }

    fn set(rules: Vec<PatternRule>) -> RuleSet {
        RuleSet::builder().rules(rules).build().expect("rule set")
    }

    #[test]
    fn clean_input_converges_in_one_pass() {
        let rules = set(vec![PatternRule::fix("x", "demo", "foo", "bar").expect("rule")]);
        let out = PassRunner::new(&rules, 5).repair("nothing here", &ctx());
        assert_eq!(out.convergence, Convergence::Converged);
        assert_eq!(out.passes_used, 1);
        assert_eq!(out.passes_executed, 1);
        assert!(out.fires.is_empty());
    }

    #[test]
    fn single_change_needs_a_confirming_pass() {
        let rules = set(vec![PatternRule::fix("x", "demo", "foo", "bar").expect("rule")]);
        let out = PassRunner::new(&rules, 5).repair("foo foo", &ctx());
        assert_eq!(out.content, "bar bar");
        assert_eq!(out.convergence, Convergence::Converged);
        assert_eq!(out.passes_used, 1);
        assert_eq!(out.passes_executed, 2);
        assert_eq!(out.fires.get("x"), Some(&2));
    }

    #[test]
    fn swap_is_detected_as_oscillation() {
        let rules = set(vec![
            PatternRule::fix("swap", "demo", r"(?P<x>[AB]) (?P<y>[AB])", "${y} ${x}")
                .expect("rule")
                .idempotent(false),
        ]);
        let out = PassRunner::new(&rules, 5).repair("A B", &ctx());
        assert_eq!(out.convergence, Convergence::Oscillating { period: 2 });
        assert_eq!(out.passes_executed, 2);
        assert_eq!(out.content, "A B");
    }

    #[test]
    fn growth_exhausts_the_budget() {
        let rules = set(vec![
            PatternRule::fix("grow", "demo", r"(?P<n>a+)", "${n}a")
                .expect("rule")
                .idempotent(false),
        ]);
        let out = PassRunner::new(&rules, 3).repair("a", &ctx());
        assert_eq!(out.convergence, Convergence::Exhausted);
        assert_eq!(out.passes_executed, 3);
        assert_eq!(out.passes_used, 3);
        assert_eq!(out.content, "aaaa");
    }

    #[test]
    fn zero_budget_is_raised_to_one() {
        let rules = set(vec![]);
        assert_eq!(PassRunner::new(&rules, 0).max_passes(), 1);
    }
}
