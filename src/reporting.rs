//! Console output for fix runs, analysis and the layer table.

use crate::analysis::{AnalysisReport, ImpactLevel, Severity};
use crate::layers::{descriptor, LayerDescriptor, LayerId};
use crate::pipeline::{LayerResult, Outcome, PipelineResult};
use colored::Colorize;
use serde::Serialize;

/// What happened to one file in a `fix` run.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub requested: Vec<LayerId>,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub invalid_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResult>,
}

impl FileReport {
    #[must_use]
    pub fn new(path: String) -> Self {
        Self {
            path,
            requested: Vec::new(),
            written: false,
            backup: None,
            error: None,
            invalid_input: false,
            result: None,
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.result.as_ref().is_some_and(PipelineResult::has_failures)
    }

    #[must_use]
    pub fn reverted(&self) -> bool {
        self.result.as_ref().is_some_and(PipelineResult::has_reverts)
    }

    #[must_use]
    pub fn changed(&self) -> bool {
        self.result.as_ref().is_some_and(PipelineResult::changed)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
}

fn layer_name(id: LayerId) -> &'static str {
    descriptor(id).map_or("Unknown", |d| d.name)
}

pub fn print_fix_report(reports: &[FileReport], dry_run: bool) {
    for report in reports {
        print_file(report);
    }
    print_fix_summary(reports, dry_run);
}

fn print_file(report: &FileReport) {
    if let Some(err) = &report.error {
        println!("{} {}", report.path.bold(), "ERROR".red().bold());
        println!("  {}", err.red());
        return;
    }
    let Some(result) = &report.result else {
        println!("{} {}", report.path.bold(), "no issues detected".dimmed());
        return;
    };

    let status = if report.written {
        "written".green()
    } else if result.changed() {
        "would change".cyan()
    } else {
        "unchanged".dimmed()
    };
    println!("{} {status}", report.path.bold());

    if let Some(resolution) = &result.resolution {
        for warning in &resolution.warnings {
            println!("  {} {}", "note:".blue(), warning.dimmed());
        }
    }
    for layer in &result.layer_results {
        print_layer(layer);
    }
    if let Some(backup) = &report.backup {
        println!("  {} {backup}", "backup:".blue());
    }
}

fn print_layer(r: &LayerResult) {
    let label = format!("{} {}", r.layer_id, layer_name(r.layer_id));
    match r.outcome() {
        Outcome::Accepted => {
            println!(
                "  {} {label} ({} changes, {}, {}ms)",
                "[OK]".green(),
                r.change_count,
                r.method_used,
                r.execution_time_ms
            );
            for imp in &r.improvements {
                println!("       {}", imp.dimmed());
            }
        }
        Outcome::Skipped => println!("  {} {label} (cached no-op)", "[SKIP]".dimmed()),
        Outcome::Reverted => println!(
            "  {} {label}: {}",
            "[REVERT]".yellow().bold(),
            r.revert_reason.as_deref().unwrap_or("validation failed")
        ),
        Outcome::Failed => println!(
            "  {} {label}: {}",
            "[FAIL]".red().bold(),
            r.error.as_deref().unwrap_or("unknown error")
        ),
    }
    for warning in &r.warnings {
        println!("       {} {}", "warn:".yellow(), warning);
    }
}

fn print_fix_summary(reports: &[FileReport], dry_run: bool) {
    let changed = reports.iter().filter(|r| r.changed()).count();
    let written = reports.iter().filter(|r| r.written).count();
    let errors = reports.iter().filter(|r| r.error.is_some()).count();
    let failed = reports.iter().filter(|r| r.failed()).count();
    let reverted = reports.iter().filter(|r| r.reverted()).count();
    let changes: usize = reports
        .iter()
        .filter_map(|r| r.result.as_ref())
        .map(|r| r.summary.total_changes)
        .sum();

    println!();
    let verb = if dry_run { "would change" } else { "changed" };
    let headline = format!(
        "{} files, {changed} {verb} ({changes} changes)",
        reports.len()
    );
    if failed + errors > 0 {
        println!("{}", headline.red().bold());
    } else if reverted > 0 {
        println!("{}", headline.yellow().bold());
    } else {
        println!("{}", headline.green().bold());
    }
    if !dry_run {
        println!("  {written} written");
    }
    if reverted > 0 {
        println!("  {} files with reverted layers", reverted.to_string().yellow());
    }
    if failed > 0 {
        println!("  {} files with failed layers", failed.to_string().red());
    }
    if errors > 0 {
        println!("  {} files could not be processed", errors.to_string().red());
    }
}

pub fn print_analysis(entries: &[AnalysisEntry]) {
    for entry in entries {
        if let Some(err) = &entry.error {
            println!("{} {}", entry.path.bold(), err.red());
            continue;
        }
        let Some(report) = &entry.report else {
            continue;
        };
        if report.issues.is_empty() {
            println!("{} {}", entry.path.bold(), "clean".green());
            continue;
        }

        let impact = match report.estimated_impact.level {
            ImpactLevel::High => "high impact".red().bold(),
            ImpactLevel::Medium => "medium impact".yellow(),
            ImpactLevel::Low => "low impact".normal(),
        };
        println!(
            "{} {impact} (confidence {:.2}, ~{})",
            entry.path.bold(),
            report.confidence,
            report.estimated_impact.estimated_fix_time
        );
        for issue in &report.issues {
            let severity = match issue.severity {
                Severity::Critical => "critical".red().bold(),
                Severity::High => "high".red(),
                Severity::Medium => "medium".yellow(),
                Severity::Low => "low".dimmed(),
            };
            println!(
                "  [{severity}] {} (x{}, layer {})",
                issue.description, issue.occurrence_count, issue.fixed_by_layer
            );
        }
        let layers: Vec<String> = report
            .recommended_layers
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("  {} {}", "recommended layers:".blue(), layers.join(","));
    }
}

pub fn print_layers(layers: &[LayerDescriptor]) {
    for layer in layers {
        let deps: Vec<String> = layer.dependencies.iter().map(ToString::to_string).collect();
        let deps = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(",")
        };
        let ast = if layer.supports_ast { "ast+regex" } else { "regex" };
        println!(
            "{} {:<14} deps {:<9} {:<10} {}",
            layer.id.to_string().bold(),
            layer.name,
            deps,
            ast,
            layer.description.dimmed()
        );
    }
}
