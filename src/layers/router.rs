// src/layers/router.rs
//! Layer 5: Next.js App Router conventions.

use super::{LayerPlugin, PluginOutput, PluginResult, TransformContext};
use regex::Regex;
use std::sync::LazyLock;

const USE_CLIENT: &str = "'use client';";

static DIRECTIVE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*['"]use client['"][ \t]*;?[ \t]*\r?\n?"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static SERVER_DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*['"]use server['"]"#).unwrap_or_else(|_| panic!("Invalid Regex"))
});

static CLIENT_API_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^.\w$])(?:useState|useEffect|useReducer|useRef|useLayoutEffect|useContext|useRouter|usePathname|useSearchParams)\s*(?:<[^>()]*>)?\s*\(|\bon[A-Z]\w*=\{",
    )
    .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static LEGACY_ROUTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"from\s+(['"])next/router['"]"#).unwrap_or_else(|_| panic!("Invalid Regex"))
});

static LEADING_TRIVIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s+|//[^\n]*|/\*(?s:.*?)\*/)*").unwrap_or_else(|_| panic!("Invalid Regex"))
});

pub struct RouterLayer;

impl LayerPlugin for RouterLayer {
    fn regex_transform(&self, code: &str, ctx: &TransformContext<'_>) -> Option<PluginResult> {
        if !applies_to(ctx) || SERVER_DIRECTIVE_RE.is_match(code) {
            return Some(Ok(PluginOutput::new(code.to_string()).with_changes(0)));
        }

        let mut current = code.to_string();
        let mut improvements = Vec::new();

        if let Some(moved) = hoist_directive(&current) {
            current = moved;
            improvements.push("Moved 'use client' directive to the top of the file".to_string());
        } else if !DIRECTIVE_LINE_RE.is_match(&current) && CLIENT_API_RE.is_match(&current) {
            current = format!("{USE_CLIENT}\n\n{current}");
            improvements.push("Added 'use client' directive for client-side APIs".to_string());
        }

        if in_app_dir(ctx) && LEGACY_ROUTER_RE.is_match(&current) {
            current = LEGACY_ROUTER_RE
                .replace_all(&current, "from ${1}next/navigation${1}")
                .into_owned();
            improvements.push("Replaced next/router with next/navigation".to_string());
        }

        let mut out = PluginOutput::new(current).with_changes(improvements.len());
        for imp in improvements {
            out = out.with_improvement(imp);
        }
        Some(Ok(out))
    }
}

/// Uses client-only APIs without any `'use client'` directive.
pub(crate) fn needs_directive(code: &str) -> bool {
    !SERVER_DIRECTIVE_RE.is_match(code)
        && !DIRECTIVE_LINE_RE.is_match(code)
        && CLIENT_API_RE.is_match(code)
}

pub(crate) fn has_misplaced_directive(code: &str) -> bool {
    hoist_directive(code).is_some()
}

pub(crate) fn legacy_router_imports(code: &str, ctx: &TransformContext<'_>) -> usize {
    if in_app_dir(ctx) {
        LEGACY_ROUTER_RE.find_iter(code).count()
    } else {
        0
    }
}

/// Config files, JSON and test files are not components.
pub(crate) fn applies_to(ctx: &TransformContext<'_>) -> bool {
    let name = ctx.file_name();
    !(name.ends_with(".json")
        || name.starts_with("next.config.")
        || super::testing::is_test_file(ctx))
}

fn in_app_dir(ctx: &TransformContext<'_>) -> bool {
    let path = ctx.path_str();
    path.starts_with("app/") || path.contains("/app/")
}

/// Moves a `'use client'` directive that is not the first statement. `None`
/// if there is no directive or it is already in place.
fn hoist_directive(code: &str) -> Option<String> {
    let directive = DIRECTIVE_LINE_RE.find(code)?;
    let leading = LEADING_TRIVIA_RE.find(code).map_or(0, |m| m.end());
    if directive.start() <= leading && code[leading..].trim_start().starts_with(['\'', '"']) {
        return None;
    }
    let mut rest = String::with_capacity(code.len());
    rest.push_str(&code[..directive.start()]);
    rest.push_str(&code[directive.end()..]);
    Some(format!("{USE_CLIENT}\n{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn run(path: &str, code: &str) -> PluginOutput {
        let ctx = TransformContext {
            file_path: Some(Path::new(path)),
        };
        match RouterLayer.regex_transform(code, &ctx) {
            Some(Ok(out)) => out,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn adds_directive_for_hooks() {
        let out = run("app/counter.tsx", "export default function C() { const [n] = useState(0); return n; }");
        assert!(out.code.starts_with("'use client';\n\nexport default"));
        assert_eq!(out.changes, Some(1));
    }

    #[test]
    fn adds_directive_for_event_handlers() {
        let out = run("components/b.jsx", "export const B = () => <button onClick={go}>x</button>;");
        assert!(out.code.starts_with("'use client';"));
    }

    #[test]
    fn server_components_are_untouched() {
        let code = "export default async function Page() { return <main />; }";
        assert_eq!(run("app/page.tsx", code).code, code);
    }

    #[test]
    fn hoists_misplaced_directive() {
        let code = "import { useState } from 'react';\n'use client';\nexport function A() { useState(); }";
        let out = run("app/a.tsx", code);
        assert_eq!(
            out.code,
            "'use client';\nimport { useState } from 'react';\nexport function A() { useState(); }"
        );
    }

    #[test]
    fn directive_after_comments_stays() {
        let code = "// header\n/* block */\n\"use client\";\nexport function A() { useState(); }";
        assert_eq!(run("app/a.tsx", code).code, code);
    }

    #[test]
    fn rewrites_router_import_in_app_dir_only() {
        let code = "'use client';\nimport { useRouter } from 'next/router';\n";
        let app = run("src/app/nav.tsx", code);
        assert!(app.code.contains("from 'next/navigation'"));
        let pages = run("pages/nav.tsx", code);
        assert_eq!(pages.code, code);
    }

    #[test]
    fn is_idempotent() {
        let first = run("app/x.tsx", "const r = useRouter();");
        let second = run("app/x.tsx", &first.code);
        assert_eq!(second.code, first.code);
        assert_eq!(second.changes, Some(0));
    }
}
