// src/validator/validator_test.rs

use super::*;
use crate::config::ValidatorConfig;
use corruption::CorruptionPattern;

#[test]
fn identical_code_is_accepted_without_checks() {
    // Unbalanced on purpose: no check may run for a no-op.
    let code = "function broken( {";
    let v = Validator::default().validate(code, code);
    assert!(v.accept);
    assert_eq!(v.reason.as_deref(), Some("no changes"));
    assert!(v.check.is_none());
}

#[test]
fn removed_critical_import_is_reverted() {
    let before = "import { useState } from 'react';\nfunction X(){ useState(0); }";
    let after = "function X(){ useState(0); }";
    let v = Validator::default().validate(before, after);
    assert!(!v.accept);
    assert_eq!(v.check, Some(Check::Integrity));
    let reason = v.reason.unwrap_or_default();
    assert!(reason.contains("missing import"), "{reason}");
    assert!(reason.contains("useState"), "{reason}");
}

#[test]
fn all_declarations_removed_is_reverted() {
    let before = "function A() { return 1; }\nconst x = 1;";
    let after = "const x = 1;\nconst y = 2;\nconst z = 3;";
    let v = Validator::default().validate(before, after);
    assert_eq!(v.check, Some(Check::Integrity));
}

#[test]
fn harmless_edit_is_accepted() {
    let before = "const message = \"Hello &amp; Welcome\";\nconsole.log(message);";
    let after = "const message = \"Hello & Welcome\";\nconsole.log(message);";
    let v = Validator::default().validate(before, after);
    assert!(v.accept, "{:?}", v.reason);
    assert!(v.reason.is_none());
}

#[test]
fn syntax_runs_before_corruption() {
    // Both an imbalance and a massive shrink: syntax must be reported.
    let before = "function a() { return [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]; }";
    let after = "f(";
    let v = Validator::default().validate(before, after);
    assert_eq!(v.check, Some(Check::Syntax));
    assert!(v.reason.unwrap_or_default().starts_with("syntax check failed"));
}

#[test]
fn configured_patterns_extend_defaults() -> Result<(), ConfigError> {
    let config = ValidatorConfig {
        corruption_patterns: vec![CorruptionPattern::new("todo marker", r"/\*\s*TODO-FIX\s*\*/")],
        ..ValidatorConfig::default()
    };
    let validator = Validator::new(&config)?;
    assert!(validator.pattern_names().contains(&"todo marker"));

    let v = validator.validate("const a = 1;", "const a = 1; /* TODO-FIX */");
    assert_eq!(v.check, Some(Check::Corruption));
    Ok(())
}

#[test]
fn custom_critical_identifiers_are_honoured() -> Result<(), ConfigError> {
    let config = ValidatorConfig {
        critical_identifiers: vec!["clsx".to_string()],
        ..ValidatorConfig::default()
    };
    let validator = Validator::new(&config)?;
    let before = "import clsx from 'clsx';\nexport function A() { return clsx('a'); }";
    let after = "export function A() { return clsx('a'); }";
    assert!(!validator.validate(before, after).accept);
    Ok(())
}
