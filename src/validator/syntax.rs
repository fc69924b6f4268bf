//! Syntax check: JSON parse for structured data, bracket balance and
//! malformed-syntax signatures for code, and a tree-sitter parse for known
//! script files.

use super::balance;
use super::count_matches;
use crate::lang::Lang;
use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Node;

struct Signature {
    name: &'static str,
    re: Regex,
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    [
        ("double arrow", r"=>\s*=>"),
        ("duplicated import keyword", r"\bimport\s+import\b"),
        ("duplicated export keyword", r"\bexport\s+export\b"),
    ]
    .into_iter()
    .map(|(name, pat)| Signature {
        name,
        re: Regex::new(pat).unwrap_or_else(|_| panic!("Invalid Regex")),
    })
    .collect()
});

/// Returns a failure description, or `None` if `after` passes.
pub(super) fn check(before: &str, after: &str) -> Option<String> {
    if looks_like_structured_data(after) {
        return check_structured(before, after);
    }

    let after_balance = balance::scan(after);
    if !after_balance.is_clean() {
        let before_balance = balance::scan(before);
        if before_balance != after_balance {
            return Some(format!("unbalanced delimiters ({after_balance})"));
        }
    }

    for sig in SIGNATURES.iter() {
        let was = count_matches(&sig.re, before);
        let now = count_matches(&sig.re, after);
        if now > was {
            return Some(format!("malformed syntax: {} ({was} -> {now})", sig.name));
        }
    }
    None
}

/// A candidate may not introduce parse errors into source that parsed
/// cleanly. Source that was already broken is left to the textual checks.
pub(super) fn check_tree(lang: Lang, before: &str, after: &str) -> Option<String> {
    let before_tree = lang.parse(before)?;
    if before_tree.root_node().has_error() {
        return None;
    }
    let Some(after_tree) = lang.parse(after) else {
        return Some("parser gave up on the result".to_string());
    };
    let root = after_tree.root_node();
    if !root.has_error() {
        return None;
    }
    let line = first_error(root).unwrap_or(root).start_position().row + 1;
    Some(format!("no longer parses (error near line {line})"))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

/// Starts and ends with a matching `{}` or `[]` pair.
pub(super) fn looks_like_structured_data(text: &str) -> bool {
    let t = text.trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

fn check_structured(before: &str, after: &str) -> Option<String> {
    let Err(e) = serde_json::from_str::<serde_json::Value>(after) else {
        return None;
    };
    // JSON-with-comments (tsconfig) never parsed to begin with; fall back to
    // the balance check so such files stay editable.
    let before_parsed = serde_json::from_str::<serde_json::Value>(before).is_ok();
    if before_parsed {
        return Some(format!("structured data no longer parses: {e}"));
    }
    let after_balance = balance::scan(after);
    if !after_balance.is_clean() && after_balance != balance::scan(before) {
        return Some(format!("unbalanced delimiters ({after_balance})"));
    }
    None
}
