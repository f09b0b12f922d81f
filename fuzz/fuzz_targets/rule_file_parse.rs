#![no_main]

//! Fuzz target for rule file parsing and compilation.

use libfuzzer_sys::fuzz_target;
use syntaxfix_rules::{RuleFile, RuleSet};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(file) = RuleFile::parse(s, "fuzz") else {
        return;
    };
    // Compilation, example checks and cycle detection must fail cleanly.
    if let Ok(builder) = RuleSet::builder().rule_file(&file) {
        let _ = builder.build();
    }
});
