//! Span edits and tree walking shared by the AST strategies.

use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Node;

/// Replace `start..end` (byte offsets) with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn replace(node: Node, text: impl Into<String>) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
            text: text.into(),
        }
    }
}

/// Applies edits back to front. Edits overlapping an already applied one are
/// dropped, so an outer rewrite never clobbers an inner one half way.
///
/// Returns the new text and the number of edits actually applied.
#[must_use]
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> (String, usize) {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut out = source.to_string();
    let mut floor = usize::MAX;
    let mut applied = 0;
    for edit in edits {
        if edit.end > floor || edit.end > out.len() || edit.start > edit.end {
            continue;
        }
        if !out.is_char_boundary(edit.start) || !out.is_char_boundary(edit.end) {
            continue;
        }
        out.replace_range(edit.start..edit.end, &edit.text);
        floor = edit.start;
        applied += 1;
    }
    (out, applied)
}

/// Depth-first visit of every node under `root` (inclusive).
pub fn walk<'a>(root: Node<'a>, visit: &mut impl FnMut(Node<'a>)) {
    visit(root);
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        walk(child, visit);
    }
}

#[must_use]
pub fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^import\b.*?['"][^'"\n]+['"][ \t]*;?[ \t]*$"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*['"]use (?:client|server|strict)['"][ \t]*;?[ \t]*\n?"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// Byte offset where a new import line belongs: after the last top-level
/// import, else after a leading directive, else the start of the file.
#[must_use]
pub fn import_insertion_point(code: &str) -> usize {
    if let Some(last) = IMPORT_RE.find_iter(code).last() {
        return last.end();
    }
    DIRECTIVE_RE.find(code).map_or(0, |m| m.end())
}

/// Inserts `line` (without trailing newline) as a new import.
#[must_use]
pub fn insert_import(code: &str, line: &str) -> String {
    let at = import_insertion_point(code);
    let mut out = String::with_capacity(code.len() + line.len() + 2);
    out.push_str(&code[..at]);
    if at == 0 {
        out.push_str(line);
        out.push('\n');
    } else {
        if !code[..at].ends_with('\n') {
            out.push('\n');
        }
        out.push_str(line);
        if !code[at..].starts_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&code[at..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_back_to_front() {
        let edits = vec![Edit::insert(0, "a"), Edit::insert(3, "b")];
        let (out, n) = apply_edits("xyz", edits);
        assert_eq!(out, "axyzb");
        assert_eq!(n, 2);
    }

    #[test]
    fn drops_overlapping_edits() {
        let edits = vec![
            Edit {
                start: 0,
                end: 3,
                text: "ABC".into(),
            },
            Edit {
                start: 1,
                end: 2,
                text: "_".into(),
            },
        ];
        let (out, n) = apply_edits("xyz", edits);
        assert_eq!(n, 1);
        assert_eq!(out, "x_z");
    }

    #[test]
    fn import_goes_after_existing_imports() {
        let code = "import a from 'a';\nimport {\n  b,\n} from \"b\";\n\nconst x = 1;\n";
        let out = insert_import(code, "import c from 'c';");
        assert_eq!(
            out,
            "import a from 'a';\nimport {\n  b,\n} from \"b\";\nimport c from 'c';\n\nconst x = 1;\n"
        );
    }

    #[test]
    fn import_goes_after_directive() {
        let out = insert_import("'use client';\nexport default 1;\n", "import a from 'a';");
        assert_eq!(out, "'use client';\nimport a from 'a';\nexport default 1;\n");
    }

    #[test]
    fn import_goes_to_top_otherwise() {
        assert_eq!(insert_import("run();", "import a from 'a';"), "import a from 'a';\nrun();");
    }
}
