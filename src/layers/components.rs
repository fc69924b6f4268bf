// src/layers/components.rs
//! Layer 3: React component hygiene.
//!
//! Adds a `key` to JSX elements returned from `.map()` callbacks and imports
//! hooks that are called but never imported from `react`.

use super::edits::{self, apply_edits, insert_import, walk, Edit};
use super::{LayerPlugin, PluginOutput, PluginResult, SourceTree, TransformContext};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tree_sitter::Node;

const HOOKS: &[&str] = &[
    "useState",
    "useEffect",
    "useContext",
    "useReducer",
    "useCallback",
    "useMemo",
    "useRef",
    "useLayoutEffect",
];

static HOOK_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|[^.\w$])({})\s*(?:<[^>()]*>)?\s*\(",
        HOOKS.join("|")
    ))
    .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static REACT_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^import\s+([^;'"]*?)\s+from\s+['"]react['"]"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static BRACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").unwrap_or_else(|_| panic!("Invalid Regex")));

static MAP_JSX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.map\(\s*(?:\(\s*([A-Za-z_$][\w$]*)\s*(?:,\s*([A-Za-z_$][\w$]*)\s*)?\)|([A-Za-z_$][\w$]*))\s*=>\s*\(?\s*<([A-Za-z][\w.]*)",
    )
    .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap_or_else(|_| panic!("Invalid Regex")));

static DESTRUCTURED_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{,]\s*id\s*[,}]").unwrap_or_else(|_| panic!("Invalid Regex")));

pub struct ComponentLayer;

impl LayerPlugin for ComponentLayer {
    fn ast_transform(&self, tree: &SourceTree<'_>, _ctx: &TransformContext<'_>) -> Option<PluginResult> {
        let (key_edits, warnings) = key_edits(tree);
        let (keyed, keys_added) = apply_edits(tree.source, key_edits);
        Some(Ok(finish(keyed, keys_added, warnings)))
    }

    fn regex_transform(&self, code: &str, _ctx: &TransformContext<'_>) -> Option<PluginResult> {
        let key_edits = unkeyed_maps(code)
            .into_iter()
            .filter_map(|(at, params)| {
                let expr = key_expression(&params)?;
                Some(Edit::insert(at, format!(" key={{{expr}}}")))
            })
            .collect();
        let (keyed, keys_added) = apply_edits(code, key_edits);
        Some(Ok(finish(keyed, keys_added, Vec::new())))
    }
}

/// `.map()` callbacks returning a JSX tag without a `key`: the offset just
/// after the tag name and the callback's parameters.
pub(crate) fn unkeyed_maps(code: &str) -> Vec<(usize, Vec<&str>)> {
    let mut found = Vec::new();
    for caps in MAP_JSX_RE.captures_iter(code) {
        let Some(whole) = caps.get(0) else { continue };
        let rest = &code[whole.end()..];
        let tag_end = rest.find('>').unwrap_or(rest.len());
        if rest[..tag_end].contains("key=") {
            continue;
        }
        let params = [caps.get(1).or(caps.get(3)), caps.get(2)]
            .into_iter()
            .flatten()
            .map(|m| m.as_str())
            .collect();
        found.push((whole.end(), params));
    }
    found
}

fn finish(keyed: String, keys_added: usize, warnings: Vec<String>) -> PluginOutput {
    let (code, imported) = fix_hook_imports(&keyed);
    let changes = keys_added + usize::from(!imported.is_empty());

    let mut out = PluginOutput::new(code).with_changes(changes);
    if keys_added > 0 {
        out = out.with_improvement(format!("Added key prop to {keys_added} mapped elements"));
    }
    if !imported.is_empty() {
        out = out.with_improvement(format!("Imported missing hooks: {}", imported.join(", ")));
    }
    for w in warnings {
        out = out.with_warning(w);
    }
    out
}

fn key_edits(tree: &SourceTree<'_>) -> (Vec<Edit>, Vec<String>) {
    let src = tree.source;
    let mut out = Vec::new();
    let mut warnings = Vec::new();

    walk(tree.tree.root_node(), &mut |node| {
        let Some(callback) = map_callback(node, src) else {
            return;
        };
        let Some(body) = callback.child_by_field_name("body") else {
            return;
        };
        let params = params(callback, src);
        for element in returned_jsx(body) {
            let Some(open) = opening_tag(element) else {
                continue;
            };
            if has_key(open, src) {
                continue;
            }
            let line = element.start_position().row + 1;
            let Some(name) = tag_name(open) else {
                warnings.push(format!("line {line}: fragment returned from .map() cannot take a key"));
                continue;
            };
            match key_expression(&params) {
                Some(expr) => out.push(Edit::insert(name.end_byte(), format!(" key={{{expr}}}"))),
                None => warnings.push(format!("line {line}: could not infer a key for mapped element")),
            }
        }
    });
    (out, warnings)
}

/// The arrow function passed to `<expr>.map(...)`, if `node` is such a call.
fn map_callback<'t>(node: Node<'t>, src: &str) -> Option<Node<'t>> {
    if node.kind() != "call_expression" {
        return None;
    }
    let callee = node.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    if edits::text(property, src) != "map" {
        return None;
    }
    let callback = node.child_by_field_name("arguments")?.named_child(0)?;
    (callback.kind() == "arrow_function").then_some(callback)
}

fn params<'s>(callback: Node<'_>, src: &'s str) -> Vec<&'s str> {
    if let Some(single) = callback.child_by_field_name("parameter") {
        return vec![edits::text(single, src)];
    }
    let Some(list) = callback.child_by_field_name("parameters") else {
        return Vec::new();
    };
    (0..list.named_child_count())
        .filter_map(|i| list.named_child(i))
        .map(|p| {
            let pattern = p.child_by_field_name("pattern").unwrap_or(p);
            edits::text(pattern, src)
        })
        .collect()
}

fn returned_jsx(body: Node<'_>) -> Vec<Node<'_>> {
    if body.kind() == "statement_block" {
        return (0..body.named_child_count())
            .filter_map(|i| body.named_child(i))
            .filter(|s| s.kind() == "return_statement")
            .filter_map(|s| s.named_child(0))
            .filter_map(unwrap_jsx)
            .collect();
    }
    unwrap_jsx(body).into_iter().collect()
}

fn unwrap_jsx(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "jsx_element" | "jsx_self_closing_element" => Some(node),
        "parenthesized_expression" => node.named_child(0).and_then(unwrap_jsx),
        _ => None,
    }
}

fn opening_tag(element: Node<'_>) -> Option<Node<'_>> {
    if element.kind() == "jsx_self_closing_element" {
        return Some(element);
    }
    element
        .child_by_field_name("open_tag")
        .or_else(|| element.named_child(0))
        .filter(|n| n.kind() == "jsx_opening_element")
}

fn tag_name(open: Node<'_>) -> Option<Node<'_>> {
    open.child_by_field_name("name")
        .or_else(|| open.named_child(0).filter(|n| n.kind() != "jsx_attribute"))
}

fn has_key(open: Node<'_>, src: &str) -> bool {
    (0..open.named_child_count())
        .filter_map(|i| open.named_child(i))
        .filter(|a| a.kind() == "jsx_attribute")
        .any(|a| a.named_child(0).is_some_and(|n| edits::text(n, src) == "key"))
}

/// Index parameter if present, else the item's `id` falling back to the
/// item itself, else a destructured `id`.
fn key_expression(params: &[&str]) -> Option<String> {
    if let Some(index) = params.get(1).filter(|p| IDENT_RE.is_match(p)) {
        return Some((*index).to_string());
    }
    let first = params.first()?;
    if IDENT_RE.is_match(first) {
        return Some(format!("{first}.id ?? {first}"));
    }
    DESTRUCTURED_ID_RE.is_match(first).then(|| "id".to_string())
}

/// Imports hooks that are called but not imported. Returns the new code and
/// the names added.
fn fix_hook_imports(code: &str) -> (String, Vec<String>) {
    let missing = missing_hooks(code);
    if missing.is_empty() {
        return (code.to_string(), missing);
    }

    let react_import = REACT_IMPORT_RE.captures(code);
    let Some(clause) = react_import.as_ref().and_then(|c| c.get(1)) else {
        let line = format!("import {{ {} }} from 'react';", missing.join(", "));
        return (insert_import(code, &line), missing);
    };

    let clause_text = clause.as_str();
    let new_clause = if let Some(braces) = BRACES_RE.captures(clause_text).and_then(|b| b.get(0)) {
        let mut names: Vec<String> = braces
            .as_str()
            .trim_matches(|c| c == '{' || c == '}')
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        names.extend(missing.iter().cloned());
        format!(
            "{}{{ {} }}{}",
            &clause_text[..braces.start()],
            names.join(", "),
            &clause_text[braces.end()..]
        )
    } else if clause_text.contains('*') {
        let line = format!("import {{ {} }} from 'react';", missing.join(", "));
        return (insert_import(code, &line), missing);
    } else {
        format!("{clause_text}, {{ {} }}", missing.join(", "))
    };

    let mut out = String::with_capacity(code.len() + 32);
    out.push_str(&code[..clause.start()]);
    out.push_str(&new_clause);
    out.push_str(&code[clause.end()..]);
    (out, missing)
}

/// Hooks called without a `react` import or local definition.
pub(crate) fn missing_hooks(code: &str) -> Vec<String> {
    let used: BTreeSet<&str> = HOOK_CALL_RE
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if used.is_empty() {
        return Vec::new();
    }

    let imported: BTreeSet<String> = REACT_IMPORT_RE
        .captures(code)
        .and_then(|c| c.get(1))
        .and_then(|clause| BRACES_RE.captures(clause.as_str()))
        .and_then(|b| b.get(1))
        .map(|names| imported_names(names.as_str()))
        .unwrap_or_default();

    used.into_iter()
        .filter(|h| !imported.contains(*h) && !declares_locally(code, h))
        .map(str::to_string)
        .collect()
}

fn imported_names(list: &str) -> BTreeSet<String> {
    list.split(',')
        .filter_map(|n| n.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn declares_locally(code: &str, name: &str) -> bool {
    ["function ", "const ", "let ", "var "]
        .iter()
        .any(|kw| code.contains(&format!("{kw}{name}")))
}
