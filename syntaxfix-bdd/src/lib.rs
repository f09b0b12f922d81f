//! BDD harness (cucumber-rs).
//!
//! This crate keeps scenario tests isolated from the production crates. The
//! helpers here turn Gherkin doc strings into file bodies.

/// File body for a doc string: Gherkin drops the final newline, sources keep one.
pub fn docstring_body(raw: &str) -> String {
    let mut body = raw.trim_end_matches('\n').to_string();
    body.push('\n');
    body
}

#[cfg(test)]
mod tests {
    use super::docstring_body;

    #[test]
    fn appends_single_trailing_newline() {
        assert_eq!(docstring_body("interface A {\n}"), "interface A {\n}\n");
        assert_eq!(docstring_body("let a = 1;\n\n"), "let a = 1;\n");
    }
}
