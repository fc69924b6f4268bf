//! Named signatures of bad rewrites.
//!
//! The list is data: built-in defaults plus whatever `layerfix.toml` adds
//! under `[[validator.corruption_patterns]]`. A pattern only counts against a
//! candidate when it matches more often than it did in the input, so
//! legitimate pre-existing occurrences survive.

use super::count_matches;
use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionPattern {
    pub name: String,
    pub pattern: String,
}

impl CorruptionPattern {
    #[must_use]
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("duplicated function keyword", r"\bfunction\s+function\b"),
    ("duplicated import keyword", r"\bimport\s*\{\s*import\b"),
    ("empty double parens", r"\(\s*\)\s*\(\s*\)"),
    ("empty event handler call", r"\bon[A-Z]\w*=\{\s*\(\s*\)\s*\}"),
    ("double-brace event handler", r"\bon[A-Z]\w*=\{\{"),
    ("duplicated 'use client'", r#"(?s)['"]use client['"].*?['"]use client['"]"#),
    ("duplicated key attribute", r"\bkey=\{[^}]*\}\s+key="),
    (
        "nested window guard",
        r#"typeof window !== ['"]undefined['"]\s*\?\s*\(?\s*typeof window"#,
    ),
];

#[must_use]
pub fn default_patterns() -> Vec<CorruptionPattern> {
    DEFAULT_PATTERNS
        .iter()
        .map(|(name, pat)| CorruptionPattern::new(name, pat))
        .collect()
}

#[derive(Debug, Clone)]
pub(super) struct CompiledPattern {
    pub name: String,
    pub re: Regex,
}

/// Compiles `patterns`, failing on the first invalid regex.
pub(super) fn compile(patterns: &[CorruptionPattern]) -> Result<Vec<CompiledPattern>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&p.pattern)
                .map(|re| CompiledPattern {
                    name: p.name.clone(),
                    re,
                })
                .map_err(|source| ConfigError::Pattern {
                    name: p.name.clone(),
                    source,
                })
        })
        .collect()
}

/// Returns a failure description, or `None` if `after` passes.
pub(super) fn check(
    patterns: &[CompiledPattern],
    max_shrink_ratio: f64,
    before: &str,
    after: &str,
) -> Option<String> {
    if let Some(reason) = check_content_loss(max_shrink_ratio, before, after) {
        return Some(reason);
    }

    for p in patterns {
        let was = count_matches(&p.re, before);
        let now = count_matches(&p.re, after);
        if now > was {
            return Some(format!("pattern '{}' increased ({was} -> {now})", p.name));
        }
    }
    None
}

#[allow(clippy::cast_precision_loss)]
fn check_content_loss(max_shrink_ratio: f64, before: &str, after: &str) -> Option<String> {
    if before.is_empty() {
        return None;
    }
    let kept = after.len() as f64 / before.len() as f64;
    if kept < 1.0 - max_shrink_ratio {
        return Some(format!(
            "catastrophic content loss ({} -> {} bytes)",
            before.len(),
            after.len()
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<CompiledPattern> {
        compile(&default_patterns()).unwrap_or_default()
    }

    #[test]
    fn defaults_compile() {
        assert_eq!(defaults().len(), DEFAULT_PATTERNS.len());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let bad = vec![CorruptionPattern::new("broken", "(")];
        assert!(matches!(compile(&bad), Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn new_occurrence_fails() {
        let reason = check(
            &defaults(),
            0.8,
            "<button onClick={go}>x</button>",
            "<button onClick={()}>x</button>",
        )
        .unwrap_or_default();
        assert!(reason.contains("empty event handler call"), "{reason}");
    }

    #[test]
    fn preexisting_occurrence_survives() {
        let before = "run()();\nconst a = 1;";
        let after = "run()();\nconst a = 2;";
        assert!(check(&defaults(), 0.8, before, after).is_none());
    }

    #[test]
    fn shrink_beyond_ratio_fails() {
        let before = "x".repeat(100);
        let reason = check(&defaults(), 0.8, &before, "x").unwrap_or_default();
        assert!(reason.contains("catastrophic"), "{reason}");
        assert!(check(&defaults(), 0.8, &before, &"x".repeat(30)).is_none());
    }

    #[test]
    fn duplicated_use_client_fails() {
        let before = "'use client';\nexport default function A() {}";
        let after = "'use client';\n'use client';\nexport default function A() {}";
        assert!(check(&defaults(), 0.8, before, after).is_some());
    }
}
