// src/layers/testing.rs
//! Layer 6: Testing Library scaffolding for test files.

use super::edits::insert_import;
use super::{LayerPlugin, PluginOutput, PluginResult, TransformContext};
use regex::Regex;
use std::sync::LazyLock;

const RTL_MODULE: &str = "@testing-library/react";
const JEST_DOM_MODULE: &str = "@testing-library/jest-dom";

static TEST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:test|spec)\.[cm]?[jt]sx?$").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static TEST_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:describe|it|test)\s*\(").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static RTL_USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])(render|screen|fireEvent|waitFor)\b\s*[.(]")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static JEST_DOM_USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:toBeInTheDocument|toHaveTextContent|toBeVisible|toHaveAttribute|toHaveClass)\(")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

pub struct TestingLayer;

/// Test files by name (`*.test.tsx`, `__tests__/`), or by content when no
/// path is known.
#[must_use]
pub fn is_test_file(ctx: &TransformContext<'_>) -> bool {
    let path = ctx.path_str();
    TEST_NAME_RE.is_match(&path) || path.contains("__tests__/")
}

fn looks_like_test(code: &str, ctx: &TransformContext<'_>) -> bool {
    if ctx.file_path.is_some() {
        return is_test_file(ctx);
    }
    TEST_BODY_RE.is_match(code) && code.contains("expect(")
}

fn imports_module(code: &str, module: &str) -> bool {
    code.contains(&format!("'{module}'")) || code.contains(&format!("\"{module}\""))
}

/// Testing Library helpers used but not imported.
fn missing_rtl_names(code: &str) -> Vec<&str> {
    if imports_module(code, RTL_MODULE) {
        return Vec::new();
    }
    let mut names: Vec<&str> = RTL_USE_RE
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

fn missing_jest_dom(code: &str) -> bool {
    JEST_DOM_USE_RE.is_match(code) && !imports_module(code, JEST_DOM_MODULE)
}

/// Modules a test file uses without importing.
pub(crate) fn missing_test_imports(code: &str, ctx: &TransformContext<'_>) -> Vec<&'static str> {
    if !looks_like_test(code, ctx) {
        return Vec::new();
    }
    let mut missing = Vec::new();
    if !missing_rtl_names(code).is_empty() {
        missing.push(RTL_MODULE);
    }
    if missing_jest_dom(code) {
        missing.push(JEST_DOM_MODULE);
    }
    missing
}

impl LayerPlugin for TestingLayer {
    fn regex_transform(&self, code: &str, ctx: &TransformContext<'_>) -> Option<PluginResult> {
        if !looks_like_test(code, ctx) {
            return Some(Ok(PluginOutput::new(code.to_string()).with_changes(0)));
        }

        let mut current = code.to_string();
        let mut improvements = Vec::new();

        let names = missing_rtl_names(code);
        if !names.is_empty() {
            let line = format!("import {{ {} }} from '{RTL_MODULE}';", names.join(", "));
            current = insert_import(&current, &line);
            improvements.push(format!("Imported {} from {RTL_MODULE}", names.join(", ")));
        }

        if missing_jest_dom(&current) {
            current = insert_import(&current, &format!("import '{JEST_DOM_MODULE}';"));
            improvements.push(format!("Imported {JEST_DOM_MODULE} matchers"));
        }

        let mut out = PluginOutput::new(current).with_changes(improvements.len());
        for imp in improvements {
            out = out.with_improvement(imp);
        }
        Some(Ok(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn run(path: Option<&str>, code: &str) -> PluginOutput {
        let ctx = TransformContext {
            file_path: path.map(Path::new),
        };
        match TestingLayer.regex_transform(code, &ctx) {
            Some(Ok(out)) => out,
            other => panic!("unexpected {other:?}"),
        }
    }

    const TEST: &str = "import Button from './Button';\n\ntest('renders', () => {\n  render(<Button />);\n  expect(screen.getByText('Go')).toBeInTheDocument();\n});\n";

    #[test]
    fn adds_testing_library_imports() {
        let out = run(Some("src/Button.test.tsx"), TEST);
        assert!(out.code.starts_with(
            "import Button from './Button';\nimport { render, screen } from '@testing-library/react';\nimport '@testing-library/jest-dom';\n"
        ), "{}", out.code);
        assert_eq!(out.changes, Some(2));
    }

    #[test]
    fn detects_tests_without_a_path() {
        let out = run(None, TEST);
        assert_eq!(out.changes, Some(2));
    }

    #[test]
    fn leaves_non_test_files_alone() {
        assert_eq!(run(Some("src/Button.tsx"), TEST).code, TEST);
    }

    #[test]
    fn existing_imports_are_respected() {
        let first = run(Some("__tests__/b.js"), TEST);
        let second = run(Some("__tests__/b.js"), &first.code);
        assert_eq!(second.code, first.code);
        assert_eq!(second.changes, Some(0));
    }
}
