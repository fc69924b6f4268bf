// src/validator/mod.rs
//! Accept/revert decisions for (before, after) code pairs.
//!
//! Three independent checks run in order and stop at the first failure:
//! syntax, corruption patterns, logical integrity. The validator never
//! panics on input and treats its own internal failures as a revert.

pub mod balance;
pub mod corruption;
pub mod integrity;
mod syntax;

use crate::config::ValidatorConfig;
use crate::error::ConfigError;
use crate::lang::{self, Lang};
use corruption::CompiledPattern;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;

/// Which check produced a revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Syntax,
    Corruption,
    Integrity,
    Internal,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Syntax => "syntax",
            Self::Corruption => "corruption",
            Self::Integrity => "integrity",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub accept: bool,
    pub reason: Option<String>,
    pub check: Option<Check>,
}

impl Verdict {
    fn unchanged() -> Self {
        Self {
            accept: true,
            reason: Some("no changes".to_string()),
            check: None,
        }
    }

    fn accepted() -> Self {
        Self {
            accept: true,
            reason: None,
            check: None,
        }
    }

    fn revert(check: Check, detail: String) -> Self {
        Self {
            accept: false,
            reason: Some(format!("{check} check failed: {detail}")),
            check: Some(check),
        }
    }
}

/// Internal failure while inspecting code. Never escapes `validate`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("could not extract {what}")]
    Extraction { what: &'static str },
}

#[derive(Debug, Clone)]
pub struct Validator {
    patterns: Vec<CompiledPattern>,
    critical_identifiers: Vec<String>,
    max_shrink_ratio: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            patterns: corruption::compile(&corruption::default_patterns()).unwrap_or_default(),
            critical_identifiers: integrity::DEFAULT_CRITICAL_IDENTIFIERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_shrink_ratio: crate::config::DEFAULT_MAX_SHRINK_RATIO,
        }
    }
}

impl Validator {
    /// Builds a validator from config: default patterns plus the configured
    /// extras.
    ///
    /// # Errors
    /// Returns an error if a configured corruption pattern is not a valid regex.
    pub fn new(config: &ValidatorConfig) -> Result<Self, ConfigError> {
        let mut all = corruption::default_patterns();
        all.extend(config.corruption_patterns.iter().cloned());
        Ok(Self {
            patterns: corruption::compile(&all)?,
            critical_identifiers: config.critical_identifiers.clone(),
            max_shrink_ratio: config.max_shrink_ratio.clamp(0.0, 1.0),
        })
    }

    #[must_use]
    pub fn pattern_names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    /// Decides whether `after` may replace `before`.
    #[must_use]
    pub fn validate(&self, before: &str, after: &str) -> Verdict {
        self.validate_at(before, after, None)
    }

    /// Like [`Validator::validate`], adding a full parse when `path` names a
    /// script file.
    #[must_use]
    pub fn validate_at(&self, before: &str, after: &str, path: Option<&Path>) -> Verdict {
        if before.len() == after.len() && before == after {
            return Verdict::unchanged();
        }

        let grammar = path
            .filter(|p| lang::is_script_path(p))
            .map(|p| Lang::for_path(Some(p)));
        match self.run_checks(before, after, grammar) {
            Ok(None) => Verdict::accepted(),
            Ok(Some((check, detail))) => Verdict::revert(check, detail),
            Err(e) => Verdict::revert(Check::Internal, e.to_string()),
        }
    }

    fn run_checks(
        &self,
        before: &str,
        after: &str,
        grammar: Option<Lang>,
    ) -> Result<Option<(Check, String)>, ValidationError> {
        if let Some(detail) = syntax::check(before, after) {
            return Ok(Some((Check::Syntax, detail)));
        }
        if let Some(detail) = grammar.and_then(|g| syntax::check_tree(g, before, after)) {
            return Ok(Some((Check::Syntax, detail)));
        }
        if let Some(detail) = corruption::check(&self.patterns, self.max_shrink_ratio, before, after)
        {
            return Ok(Some((Check::Corruption, detail)));
        }
        if let Some(detail) = integrity::check(&self.critical_identifiers, before, after)? {
            return Ok(Some((Check::Integrity, detail)));
        }
        Ok(None)
    }
}

pub(crate) fn count_matches(re: &Regex, text: &str) -> usize {
    re.find_iter(text).count()
}
