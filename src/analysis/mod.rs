// src/analysis/mod.rs
//! Issue detection and layer recommendation.
//!
//! The report is advisory. It never gates execution: the engine runs what it
//! is asked to run, and the CLI only consults `recommended_layers` when the
//! user did not name any layers.

pub mod detectors;

use crate::layers::{LayerId, TransformContext};
use crate::resolver;
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Configuration,
    Patterns,
    Components,
    Hydration,
    Routing,
    Testing,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Patterns => "patterns",
            Self::Components => "components",
            Self::Hydration => "hydration",
            Self::Routing => "routing",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedIssue {
    pub category: Category,
    pub severity: Severity,
    pub description: String,
    pub occurrence_count: usize,
    pub fixed_by_layer: LayerId,
}

impl DetectedIssue {
    #[must_use]
    pub fn new(
        category: Category,
        severity: Severity,
        description: impl Into<String>,
        occurrence_count: usize,
    ) -> Self {
        Self {
            category,
            severity,
            description: description.into(),
            occurrence_count,
            fixed_by_layer: resolver::layer_for_category(category.as_str()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Impact {
    pub level: ImpactLevel,
    pub description: String,
    pub estimated_fix_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub issues: Vec<DetectedIssue>,
    pub recommended_layers: Vec<LayerId>,
    pub confidence: f64,
    pub estimated_impact: Impact,
}

/// Runs every detector over `code`. A detector that errors contributes no
/// issues.
#[must_use]
pub fn analyze(code: &str, file_path: Option<&Path>) -> AnalysisReport {
    let ctx = TransformContext { file_path };

    let mut issues = Vec::new();
    for (category, detect) in detectors::DETECTORS {
        match detect(code, &ctx) {
            Ok(found) => issues.extend(found),
            Err(e) => tracing::debug!(%category, "detector gave up: {e}"),
        }
    }

    let categories: Vec<&str> = {
        let mut seen: Vec<Category> = issues.iter().map(|i| i.category).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.into_iter().map(Category::as_str).collect()
    };
    let recommended_layers = resolver::minimal_set_for(categories);

    let critical = issues.iter().filter(|i| i.severity == Severity::Critical).count();
    let occurrences = issues.iter().map(|i| i.occurrence_count).sum();

    AnalysisReport {
        confidence: confidence(critical, issues.len()),
        estimated_impact: impact(critical, issues.len(), occurrences),
        recommended_layers,
        issues,
    }
}

/// `0.6` with no issues, otherwise rising with the critical share and the
/// issue count, capped at `0.95`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(critical: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.6;
    }
    let critical_share = critical as f64 / total as f64;
    let volume = (total as f64 / 50.0).min(0.1);
    (0.6 + 0.3 * critical_share + volume).min(0.95)
}

#[must_use]
pub fn impact(critical: usize, total: usize, occurrences: usize) -> Impact {
    let (level, description) = if critical >= 5 {
        (
            ImpactLevel::High,
            format!("{critical} critical issues; fixing is strongly recommended"),
        )
    } else if critical >= 1 || total >= 3 {
        (
            ImpactLevel::Medium,
            format!("{total} issues found, {critical} critical"),
        )
    } else if total == 0 {
        (ImpactLevel::Low, "No issues found".to_string())
    } else {
        (ImpactLevel::Low, format!("{total} minor issues"))
    };

    let minutes = (2 * occurrences).max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    Impact {
        level,
        description,
        estimated_fix_time: format!("{minutes} {unit}"),
    }
}
