// src/layers/config_files.rs
//! Layer 1: project configuration files.
//!
//! Only `tsconfig.json`, `package.json` and `next.config.*` are touched. Any
//! other file passes through unchanged, as does a JSON file that does not
//! parse (the validator would refuse to judge it anyway).

use super::{LayerPlugin, PluginOutput, PluginResult, TransformContext};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const MODERN_TARGET: &str = "ES2020";
const LEGACY_TARGETS: &[&str] = &["es3", "es5", "es6", "es2015"];
const NEXT_SCRIPTS: &[(&str, &str)] = &[
    ("dev", "next dev"),
    ("build", "next build"),
    ("lint", "next lint"),
];

static APP_DIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*appDir\s*:\s*true\s*,?[ \t]*\r?\n")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static EMPTY_EXPERIMENTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*experimental\s*:\s*\{\s*\}\s*,?[ \t]*\r?\n")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

pub struct ConfigLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKind {
    TsConfig,
    PackageJson,
    NextConfig,
}

impl ConfigKind {
    fn detect(file_name: &str) -> Option<Self> {
        match file_name {
            "tsconfig.json" => Some(Self::TsConfig),
            "package.json" => Some(Self::PackageJson),
            n if n.starts_with("next.config.") => Some(Self::NextConfig),
            _ => None,
        }
    }
}

impl LayerPlugin for ConfigLayer {
    fn regex_transform(&self, code: &str, ctx: &TransformContext<'_>) -> Option<PluginResult> {
        let unchanged = || PluginOutput::new(code.to_string()).with_changes(0);
        let out = match ConfigKind::detect(ctx.file_name()) {
            Some(ConfigKind::TsConfig) => fix_json(code, fix_tsconfig).unwrap_or_else(|| {
                unchanged().with_warning("tsconfig.json is not strict JSON; left unchanged")
            }),
            Some(ConfigKind::PackageJson) => fix_json(code, fix_package_json).unwrap_or_else(|| {
                unchanged().with_warning("package.json did not parse; left unchanged")
            }),
            Some(ConfigKind::NextConfig) => fix_next_config(code),
            None => unchanged(),
        };
        Some(Ok(out))
    }
}

/// Parses `code`, lets `fix` mutate the document and re-serialises only if
/// something changed. `None` if the input is not valid JSON.
fn fix_json(code: &str, fix: fn(&mut Map<String, Value>) -> Vec<String>) -> Option<PluginOutput> {
    let mut doc: Value = serde_json::from_str(code).ok()?;
    let Some(root) = doc.as_object_mut() else {
        return Some(PluginOutput::new(code.to_string()).with_changes(0));
    };

    let improvements = fix(root);
    if improvements.is_empty() {
        return Some(PluginOutput::new(code.to_string()).with_changes(0));
    }

    let mut text = serde_json::to_string_pretty(&doc).ok()?;
    if code.ends_with('\n') {
        text.push('\n');
    }
    let mut out = PluginOutput::new(text).with_changes(improvements.len());
    for imp in improvements {
        out = out.with_improvement(imp);
    }
    Some(out)
}

fn fix_tsconfig(root: &mut Map<String, Value>) -> Vec<String> {
    let mut done = Vec::new();
    let options = root
        .entry("compilerOptions")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(options) = options.as_object_mut() else {
        return done;
    };

    let legacy = options
        .get("target")
        .and_then(Value::as_str)
        .is_some_and(is_legacy_target);
    if legacy {
        options.insert("target".into(), Value::String(MODERN_TARGET.into()));
        done.push(format!("Upgraded compilerOptions.target to {MODERN_TARGET}"));
    }
    if !options.contains_key("strict") {
        options.insert("strict".into(), Value::Bool(true));
        done.push("Enabled compilerOptions.strict".to_string());
    }
    if !options.contains_key("skipLibCheck") {
        options.insert("skipLibCheck".into(), Value::Bool(true));
        done.push("Enabled compilerOptions.skipLibCheck".to_string());
    }
    done
}

pub(crate) fn is_legacy_target(target: &str) -> bool {
    LEGACY_TARGETS.contains(&target.to_ascii_lowercase().as_str())
}

/// Standard Next.js scripts absent from a `package.json` that depends on
/// `next`. Empty for other projects.
pub(crate) fn missing_next_scripts(doc: &Value) -> Vec<&'static str> {
    let uses_next = ["dependencies", "devDependencies"].iter().any(|section| {
        doc.get(*section)
            .and_then(Value::as_object)
            .is_some_and(|deps| deps.contains_key("next"))
    });
    if !uses_next {
        return Vec::new();
    }
    let scripts = doc.get("scripts").and_then(Value::as_object);
    NEXT_SCRIPTS
        .iter()
        .filter(|(name, _)| !scripts.is_some_and(|s| s.contains_key(*name)))
        .map(|(name, _)| *name)
        .collect()
}

pub(crate) fn app_dir_flags(code: &str) -> usize {
    APP_DIR_RE.find_iter(code).count()
}

fn fix_package_json(root: &mut Map<String, Value>) -> Vec<String> {
    let missing = missing_next_scripts(&Value::Object(root.clone()));
    if missing.is_empty() {
        return Vec::new();
    }

    let scripts = root
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(scripts) = scripts.as_object_mut() else {
        return Vec::new();
    };
    let mut done = Vec::new();
    for (name, command) in NEXT_SCRIPTS.iter().filter(|(n, _)| missing.contains(n)) {
        scripts.insert((*name).into(), Value::String((*command).into()));
        done.push(format!("Added \"{name}\" script"));
    }
    done
}

fn fix_next_config(code: &str) -> PluginOutput {
    let removed = app_dir_flags(code);
    if removed == 0 {
        return PluginOutput::new(code.to_string()).with_changes(0);
    }
    let without = APP_DIR_RE.replace_all(code, "");
    let cleaned = EMPTY_EXPERIMENTAL_RE.replace_all(&without, "").into_owned();
    PluginOutput::new(cleaned)
        .with_changes(removed)
        .with_improvement("Removed obsolete experimental.appDir flag")
}
