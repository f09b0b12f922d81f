#![no_main]

//! Fuzz target for the lexical scope scanner.
//!
//! Spans must tile the input and lookups must work at every char boundary.

use libfuzzer_sys::fuzz_target;
use syntaxfix_rules::{Dialect, ScopeMap};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    for dialect in [Dialect::Script, Dialect::Markup] {
        let map = ScopeMap::scan(s, dialect);
        for (offset, _) in s.char_indices() {
            let _ = map.kind_at(offset);
            let _ = map.frame_at(offset);
        }
        let _ = map.is_code(0, s.len());
    }
});
