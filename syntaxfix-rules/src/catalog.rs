//! Built-in rule catalog, embedded at compile time.

use crate::error::RuleApplicationError;
use crate::ruleset::RuleSet;
use crate::spec::RuleFile;

pub const TYPESCRIPT_CATALOG: &str = include_str!("../catalog/typescript.toml");

pub const TYPESCRIPT_ORIGIN: &str = "builtin:typescript";

pub fn builtin_rule_file() -> Result<RuleFile, RuleApplicationError> {
    RuleFile::parse(TYPESCRIPT_CATALOG, TYPESCRIPT_ORIGIN)
}

/// The built-in catalog with its default enablement.
pub fn builtin_rule_set() -> Result<RuleSet, RuleApplicationError> {
    RuleSet::builder().rule_file(&builtin_rule_file()?)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ApplyContext;

    #[test]
    fn catalog_builds() {
        let set = builtin_rule_set().expect("builtin catalog is valid");
        assert!(set.version() >= 1);
        assert!(set.get("array.bare-suffix").is_some());
        assert!(set.get("implicit-any.callback-param").is_none());
    }

    #[test]
    fn catalog_builds_with_opt_in_rules() {
        let file = builtin_rule_file().expect("parse");
        let mut builder = RuleSet::builder().rule_file(&file).expect("compile");
        for spec in file.rules.iter().filter(|r| !r.enabled) {
            builder = builder.enable(spec.id.clone());
        }
        let set = builder.build().expect("all rules together are valid");
        assert_eq!(set.len(), file.rules.len());
    }

    #[test]
    fn every_fix_rule_has_an_example() {
        let file = builtin_rule_file().expect("parse");
        for spec in &file.rules {
            if spec.replacement.is_some() {
                assert!(!spec.examples.is_empty(), "{} has no example", spec.id);
            }
        }
    }

    #[test]
    fn rule_ids_are_prefixed_by_category() {
        let file = builtin_rule_file().expect("parse");
        for spec in &file.rules {
            assert!(
                spec.id.starts_with(&format!("{}.", spec.category)),
                "{} is not in category {}",
                spec.id,
                spec.category
            );
        }
    }

    #[test]
    fn one_pass_repairs_a_typical_interface() {
        let set = builtin_rule_set().expect("catalog");
        let text = "export interface Props {\n  items[];\n  tags: string: any[];\n  [key: string];\n}\n";
        let out = set.apply_pass(text, &ApplyContext::for_path("src/props.ts"));
        assert_eq!(
            out.text,
            "export interface Props {\n  items: any[];\n  tags: string[];\n  [key: string]: any;\n}\n"
        );
        assert_eq!(out.fires.get("array.bare-suffix"), Some(&1));
        assert_eq!(out.fires.get("colon-chain.collapse"), Some(&1));
        assert_eq!(out.fires.get("index-signature.missing-value-type"), Some(&1));
    }
}
