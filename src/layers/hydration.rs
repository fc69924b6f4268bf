// src/layers/hydration.rs
//! Layer 4: guards `localStorage`/`sessionStorage` access so server rendering
//! does not touch browser-only globals.

use super::edits::{self, apply_edits, walk, Edit};
use super::{LayerPlugin, PluginOutput, PluginResult, SourceTree, TransformContext};
use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Node;

const GUARD: &str = "typeof window !== 'undefined'";
const STORAGE_OBJECTS: &[&str] = &[
    "localStorage",
    "sessionStorage",
    "window.localStorage",
    "window.sessionStorage",
];
const CLIENT_EFFECTS: &[&str] = &["useEffect", "useLayoutEffect"];

static STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)((?:window\.)?(?:localStorage|sessionStorage)\.\w+\(.*\);?)[ \t]*$")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^=!<>]=\s*)((?:window\.)?(?:localStorage|sessionStorage)\.getItem\([^()\n]*\))")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

pub struct HydrationLayer;

impl LayerPlugin for HydrationLayer {
    fn ast_transform(&self, tree: &SourceTree<'_>, _ctx: &TransformContext<'_>) -> Option<PluginResult> {
        let src = tree.source;
        let mut guards = Vec::new();
        walk(tree.tree.root_node(), &mut |node| {
            if is_storage_call(node, src) && !is_guarded(node, src) {
                guards.push(guard_edit(node, src));
            }
        });
        let (code, count) = apply_edits(src, guards);
        Some(Ok(finish(code, count)))
    }

    fn regex_transform(&self, code: &str, _ctx: &TransformContext<'_>) -> Option<PluginResult> {
        let (out, count) = guard_lines(code);
        Some(Ok(finish(out, count)))
    }
}

/// Storage accesses on lines with no visible browser guard.
pub(crate) fn unguarded_accesses(code: &str) -> usize {
    guard_lines(code).1
}

/// Line-oriented guarding. Tracks `typeof window` and effect blocks by brace
/// depth, so lines inside them are left alone.
fn guard_lines(code: &str) -> (String, usize) {
    let mut out = String::with_capacity(code.len() + 64);
    let mut count = 0;
    let mut depth: i64 = 0;
    let mut guard_depth: Option<i64> = None;
    let mut prev_line_guards = false;

    for raw in code.split_inclusive('\n') {
        let (line, ending) = split_ending(raw);
        let guarded = guard_depth.is_some() || prev_line_guards || opens_guard(line);

        let rewritten = if guarded { None } else { rewrite_line(line) };
        match rewritten {
            Some(new_line) => {
                out.push_str(&new_line);
                count += 1;
            }
            None => out.push_str(line),
        }
        out.push_str(ending);

        let before = depth;
        depth += brace_delta(line);
        if guard_depth.is_none() && opens_guard(line) && depth > before {
            guard_depth = Some(before);
        } else if guard_depth.is_some_and(|g| depth <= g) {
            guard_depth = None;
        }
        if !line.trim().is_empty() {
            prev_line_guards = opens_guard(line) && depth == before;
        }
    }
    (out, count)
}

fn finish(code: String, count: usize) -> PluginOutput {
    let out = PluginOutput::new(code).with_changes(count);
    if count == 0 {
        return out;
    }
    out.with_improvement(format!("Guarded {count} browser storage accesses for SSR"))
}

fn is_storage_call(node: Node<'_>, src: &str) -> bool {
    if node.kind() != "call_expression" {
        return false;
    }
    let Some(callee) = node.child_by_field_name("function") else {
        return false;
    };
    if callee.kind() != "member_expression" {
        return false;
    }
    callee
        .child_by_field_name("object")
        .is_some_and(|obj| STORAGE_OBJECTS.contains(&edits::text(obj, src)))
}

/// `true` if an ancestor already restricts `node` to the browser, or an
/// enclosing storage call will be guarded instead.
fn is_guarded(node: Node<'_>, src: &str) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "if_statement" | "ternary_expression" | "binary_expression" => {
                if parent
                    .named_child(0)
                    .is_some_and(|cond| edits::text(cond, src).contains("typeof window"))
                {
                    return true;
                }
            }
            "call_expression" => {
                if is_storage_call(parent, src) {
                    return true;
                }
                let callee = parent.child_by_field_name("function");
                if callee.is_some_and(|c| CLIENT_EFFECTS.contains(&edits::text(c, src))) {
                    return true;
                }
            }
            "statement_block" => {
                if has_early_return_guard(parent, current, src) {
                    return true;
                }
            }
            _ => {}
        }
        current = parent;
    }
    false
}

/// `if (typeof window === 'undefined') return;` before `child` in `block`.
fn has_early_return_guard(block: Node<'_>, child: Node<'_>, src: &str) -> bool {
    (0..block.named_child_count())
        .filter_map(|i| block.named_child(i))
        .take_while(|s| s.start_byte() < child.start_byte())
        .filter(|s| s.kind() == "if_statement")
        .any(|s| {
            let text = edits::text(s, src);
            text.contains("typeof window") && text.contains("return")
        })
}

fn guard_edit(call: Node<'_>, src: &str) -> Edit {
    match call.parent().filter(|p| p.kind() == "expression_statement") {
        Some(stmt) => {
            let body = edits::text(stmt, src);
            Edit::replace(stmt, format!("if ({GUARD}) {{ {body} }}"))
        }
        None => {
            let expr = edits::text(call, src);
            Edit::replace(call, format!("({GUARD} ? {expr} : null)"))
        }
    }
}

fn split_ending(raw: &str) -> (&str, &str) {
    let trimmed = raw.trim_end_matches(['\n', '\r']);
    (trimmed, &raw[trimmed.len()..])
}

fn opens_guard(line: &str) -> bool {
    line.contains("typeof window") || CLIENT_EFFECTS.iter().any(|e| line.contains(&format!("{e}(")))
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

fn parens_balanced(text: &str) -> bool {
    let opens = text.matches('(').count();
    opens == text.matches(')').count()
}

fn rewrite_line(line: &str) -> Option<String> {
    if let Some(caps) = STATEMENT_RE.captures(line) {
        let (indent, stmt) = (&caps[1], &caps[2]);
        if parens_balanced(stmt) {
            return Some(format!("{indent}if ({GUARD}) {{ {stmt} }}"));
        }
        return None;
    }
    if ASSIGN_RE.is_match(line) {
        return Some(
            ASSIGN_RE
                .replace_all(line, format!("${{1}}{GUARD} ? ${{2}} : null").as_str())
                .into_owned(),
        );
    }
    None
}
