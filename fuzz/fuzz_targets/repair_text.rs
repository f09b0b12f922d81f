#![no_main]

//! Fuzz target for repairing arbitrary text with the built-in catalog.
//!
//! A converged result must be a fixed point of the rule set.

use libfuzzer_sys::fuzz_target;
use syntaxfix_core::{DEFAULT_MAX_PASSES, PassRunner};
use syntaxfix_rules::{ApplyContext, builtin_rule_set};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(rules) = builtin_rule_set() else {
        return;
    };

    for path in ["fuzz.ts", "fuzz.tsx"] {
        let ctx = ApplyContext::for_path(path);
        let outcome = PassRunner::new(&rules, DEFAULT_MAX_PASSES).repair(s, &ctx);
        assert!(outcome.passes_used <= outcome.passes_executed.max(1));
        if outcome.converged() {
            let again = rules.apply_pass(&outcome.content, &ctx);
            assert!(!again.changed, "converged output changed on another pass");
        }
    }
});
