// src/analysis/detectors.rs
//! One textual detector per issue category.
//!
//! Detectors only read the code. They must cope with code that does not
//! parse, and a detector that cannot make sense of its input reports an
//! error instead of guessing.

use super::{Category, DetectedIssue, Severity};
use crate::layers::{components, config_files, hydration, patterns, router, testing};
use crate::layers::TransformContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{file} is not valid JSON: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type DetectResult = Result<Vec<DetectedIssue>, DetectorError>;

pub type Detector = fn(&str, &TransformContext<'_>) -> DetectResult;

/// The fixed battery, in category order.
pub const DETECTORS: &[(Category, Detector)] = &[
    (Category::Configuration, configuration),
    (Category::Patterns, legacy_patterns),
    (Category::Components, component_structure),
    (Category::Hydration, ssr_safety),
    (Category::Routing, routing),
    (Category::Testing, test_scaffolding),
];

fn issue(category: Category, severity: Severity, description: impl Into<String>, count: usize) -> DetectedIssue {
    DetectedIssue::new(category, severity, description, count)
}

pub fn configuration(code: &str, ctx: &TransformContext<'_>) -> DetectResult {
    let name = ctx.file_name();
    let mut found = Vec::new();
    match name {
        "tsconfig.json" => {
            let doc = parse_json(code, name)?;
            let options = &doc["compilerOptions"];
            if let Some(target) = options["target"].as_str() {
                if config_files::is_legacy_target(target) {
                    found.push(issue(
                        Category::Configuration,
                        Severity::High,
                        format!("Outdated TypeScript target \"{target}\""),
                        1,
                    ));
                }
            }
            if options.get("strict").is_none() {
                found.push(issue(
                    Category::Configuration,
                    Severity::Medium,
                    "TypeScript strict mode is not configured",
                    1,
                ));
            }
        }
        "package.json" => {
            let doc = parse_json(code, name)?;
            let missing = config_files::missing_next_scripts(&doc);
            if !missing.is_empty() {
                found.push(issue(
                    Category::Configuration,
                    Severity::Low,
                    format!("Missing Next.js scripts: {}", missing.join(", ")),
                    missing.len(),
                ));
            }
        }
        n if n.starts_with("next.config.") => {
            let flags = config_files::app_dir_flags(code);
            if flags > 0 {
                found.push(issue(
                    Category::Configuration,
                    Severity::Medium,
                    "Obsolete experimental.appDir flag in Next.js config",
                    flags,
                ));
            }
        }
        _ => {}
    }
    Ok(found)
}

fn parse_json(code: &str, file: &str) -> Result<serde_json::Value, DetectorError> {
    serde_json::from_str(code).map_err(|source| DetectorError::Json {
        file: file.to_string(),
        source,
    })
}

pub fn legacy_patterns(code: &str, ctx: &TransformContext<'_>) -> DetectResult {
    if ctx.file_name().ends_with(".json") {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    let entities = patterns::entity_count(code, ctx);
    if entities > 0 {
        found.push(issue(
            Category::Patterns,
            Severity::Low,
            "HTML entities inside string literals",
            entities,
        ));
    }
    let semis = patterns::doubled_semicolons(code);
    if semis > 0 {
        found.push(issue(Category::Patterns, Severity::Low, "Doubled semicolons", semis));
    }
    Ok(found)
}

pub fn component_structure(code: &str, _ctx: &TransformContext<'_>) -> DetectResult {
    let mut found = Vec::new();
    let unkeyed = components::unkeyed_maps(code).len();
    if unkeyed > 0 {
        found.push(issue(
            Category::Components,
            Severity::High,
            "Elements rendered from .map() without a key prop",
            unkeyed,
        ));
    }
    let hooks = components::missing_hooks(code);
    if !hooks.is_empty() {
        found.push(issue(
            Category::Components,
            Severity::Critical,
            format!("Hooks used without import: {}", hooks.join(", ")),
            hooks.len(),
        ));
    }
    Ok(found)
}

pub fn ssr_safety(code: &str, _ctx: &TransformContext<'_>) -> DetectResult {
    let unguarded = hydration::unguarded_accesses(code);
    if unguarded == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![issue(
        Category::Hydration,
        Severity::High,
        "Browser storage accessed without a typeof window guard",
        unguarded,
    )])
}

pub fn routing(code: &str, ctx: &TransformContext<'_>) -> DetectResult {
    if !router::applies_to(ctx) {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    if router::has_misplaced_directive(code) {
        found.push(issue(
            Category::Routing,
            Severity::Critical,
            "'use client' directive is not the first statement",
            1,
        ));
    } else if router::needs_directive(code) {
        found.push(issue(
            Category::Routing,
            Severity::High,
            "Client-side hooks or event handlers without 'use client'",
            1,
        ));
    }
    let legacy = router::legacy_router_imports(code, ctx);
    if legacy > 0 {
        found.push(issue(
            Category::Routing,
            Severity::Medium,
            "next/router imported inside the app directory",
            legacy,
        ));
    }
    Ok(found)
}

pub fn test_scaffolding(code: &str, ctx: &TransformContext<'_>) -> DetectResult {
    Ok(testing::missing_test_imports(code, ctx)
        .into_iter()
        .map(|module| {
            issue(
                Category::Testing,
                Severity::Medium,
                format!("Test uses {module} without importing it"),
                1,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ctx(path: &str) -> TransformContext<'_> {
        TransformContext {
            file_path: Some(Path::new(path)),
        }
    }

    #[test]
    fn broken_json_is_an_error_not_a_guess() {
        let out = configuration("{ not json", &ctx("tsconfig.json"));
        assert!(matches!(out, Err(DetectorError::Json { .. })));
    }

    #[test]
    fn legacy_target_is_high_severity() -> Result<(), DetectorError> {
        let found = configuration(r#"{"compilerOptions":{"target":"es5","strict":true}}"#, &ctx("tsconfig.json"))?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].fixed_by_layer, 1);
        Ok(())
    }

    #[test]
    fn entities_are_counted() -> Result<(), DetectorError> {
        let found = legacy_patterns("const a = \"x &amp; y &lt; z\";", &ctx("a.ts"))?;
        assert_eq!(found[0].occurrence_count, 2);
        Ok(())
    }

    #[test]
    fn detectors_tolerate_broken_code() {
        let code = "function ( { items.map(i => <li>{i}</li> localStorage.getItem(";
        for (_, detect) in DETECTORS {
            assert!(detect(code, &ctx("broken.jsx")).is_ok());
        }
    }

    #[test]
    fn missing_hook_import_is_critical() -> Result<(), DetectorError> {
        let found = component_structure("const [a] = useState(0);", &ctx("a.jsx"))?;
        assert!(found.iter().any(|i| i.severity == Severity::Critical));
        Ok(())
    }
}
