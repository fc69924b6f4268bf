// src/layers/patterns.rs
//! Layer 2: HTML entities inside string literals and stray doubled semicolons.
//!
//! Entities are only unescaped inside quoted strings, found through the
//! syntax tree. JSX text and JSX attribute values keep them, since `&lt;`
//! there is the only way to render a literal `<`.

use super::edits::{self, Edit};
use super::{LayerPlugin, PluginOutput, PluginResult, TransformContext};
use crate::lang::Lang;
use regex::{Match, Regex};
use std::ops::Range;
use std::sync::LazyLock;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:amp|lt|gt|quot|apos|#39|#x27|nbsp);")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// An entity name right after `&amp;`: the text is a deliberately escaped
/// entity and must stay as it is.
static ENTITY_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:amp|lt|gt|quot|apos|#39|#x27|nbsp);")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static DOUBLE_SEMI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m);;+([ \t]*)$").unwrap_or_else(|_| panic!("Invalid Regex")));

/// String parents whose text is not a plain JavaScript value.
const VERBATIM_PARENTS: [&str; 3] = ["jsx_attribute", "import_statement", "export_statement"];

pub struct PatternLayer;

impl LayerPlugin for PatternLayer {
    fn regex_transform(&self, code: &str, ctx: &TransformContext<'_>) -> Option<PluginResult> {
        if is_json(ctx) {
            return Some(Ok(PluginOutput::new(code.to_string()).with_changes(0)));
        }

        let (code_after_entities, entities, parsed) = match unescape_string_entities(code, ctx) {
            Some((fixed, count)) => (fixed, count, true),
            None => (code.to_string(), 0, false),
        };
        let semis = doubled_semicolons(&code_after_entities);
        let fixed = DOUBLE_SEMI_RE.replace_all(&code_after_entities, ";$1").into_owned();

        let mut out = PluginOutput::new(fixed).with_changes(entities + semis);
        if entities > 0 {
            out = out.with_improvement(format!("Unescaped {entities} HTML entities in strings"));
        }
        if semis > 0 {
            out = out.with_improvement(format!("Removed {semis} doubled semicolons"));
        }
        if !parsed && ENTITY_RE.is_match(code) {
            out = out.with_warning("HTML entities left in place: source did not parse cleanly");
        }
        Some(Ok(out))
    }
}

/// HTML entities inside string literals. Zero when the source does not parse.
pub(crate) fn entity_count(code: &str, ctx: &TransformContext<'_>) -> usize {
    string_literals(code, ctx).map_or(0, |spans| {
        spans
            .into_iter()
            .map(|span| entity_matches(&code[span]).count())
            .sum()
    })
}

pub(crate) fn doubled_semicolons(code: &str) -> usize {
    DOUBLE_SEMI_RE.find_iter(code).count()
}

fn is_json(ctx: &TransformContext<'_>) -> bool {
    ctx.file_name().ends_with(".json")
}

/// Byte ranges of quoted string literals holding plain values. `None` if the
/// source does not parse cleanly.
fn string_literals(code: &str, ctx: &TransformContext<'_>) -> Option<Vec<Range<usize>>> {
    let tree = Lang::for_path(ctx.file_path).parse(code)?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }

    let mut spans = Vec::new();
    edits::walk(root, &mut |node| {
        if node.kind() != "string" {
            return;
        }
        let verbatim = node
            .parent()
            .is_some_and(|p| VERBATIM_PARENTS.contains(&p.kind()));
        if !verbatim {
            spans.push(node.start_byte()..node.end_byte());
        }
    });
    Some(spans)
}

fn entity_matches(literal: &str) -> impl Iterator<Item = Match<'_>> {
    ENTITY_RE.find_iter(literal).filter(move |m| {
        !(m.as_str() == "&amp;" && ENTITY_TAIL_RE.is_match(&literal[m.end()..]))
    })
}

/// Returns the rewritten code and the number of entities replaced, or
/// `None` if the source does not parse.
fn unescape_string_entities(code: &str, ctx: &TransformContext<'_>) -> Option<(String, usize)> {
    let mut count = 0;
    let mut replacements = Vec::new();
    for span in string_literals(code, ctx)? {
        let literal = &code[span.clone()];
        let quote = literal.chars().next().unwrap_or('"');
        let mut text = String::with_capacity(literal.len());
        let mut last = 0;
        for m in entity_matches(literal) {
            text.push_str(&literal[last..m.start()]);
            text.push_str(unescape(m.as_str(), quote));
            last = m.end();
            count += 1;
        }
        if last > 0 {
            text.push_str(&literal[last..]);
            replacements.push(Edit {
                start: span.start,
                end: span.end,
                text,
            });
        }
    }
    let (out, _) = edits::apply_edits(code, replacements);
    Some((out, count))
}

/// Maps an entity to its character, escaping it if it is the enclosing quote.
fn unescape(entity: &str, quote: char) -> &'static str {
    match entity {
        "&amp;" => "&",
        "&lt;" => "<",
        "&gt;" => ">",
        "&nbsp;" => " ",
        "&quot;" if quote == '"' => "\\\"",
        "&quot;" => "\"",
        _ if quote == '\'' => "\\'",
        _ => "'",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &str) -> PluginOutput {
        match PatternLayer.regex_transform(code, &TransformContext::default()) {
            Some(Ok(out)) => out,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unescapes_entities_in_strings() {
        let out = run("const message = \"Hello &amp; Welcome\";\nconsole.log(message);");
        assert_eq!(out.code, "const message = \"Hello & Welcome\";\nconsole.log(message);");
        assert_eq!(out.changes, Some(1));
    }

    #[test]
    fn escapes_entities_matching_the_quote() {
        let out = run(r#"const a = "say &quot;hi&quot;"; const b = 'it&#39;s';"#);
        assert_eq!(out.code, r#"const a = "say \"hi\""; const b = 'it\'s';"#);
    }

    #[test]
    fn leaves_jsx_text_alone() {
        let code = "const x = <p>1 &lt; 2</p>;";
        assert_eq!(run(code).code, code);
    }

    #[test]
    fn apostrophes_in_jsx_text_are_not_strings() {
        let code = "export const A = () => <p>Don't &lt;b&gt; won't</p>;";
        let out = run(code);
        assert_eq!(out.code, code);
        assert_eq!(out.changes, Some(0));
    }

    #[test]
    fn jsx_attribute_values_keep_entities() {
        let code = "const a = <abbr title=\"a &amp; b\">x</abbr>;";
        assert_eq!(run(code).code, code);
    }

    #[test]
    fn double_escaped_entities_are_stable() {
        let code = "const a = \"a &amp;lt; b\";";
        let first = run(code);
        assert_eq!(first.code, code);
        assert_eq!(first.changes, Some(0));
        assert_eq!(entity_count(code, &TransformContext::default()), 0);

        let mixed = run("const b = \"&amp;amp; &amp; x\";");
        assert_eq!(mixed.code, "const b = \"&amp;amp; & x\";");
        assert_eq!(run(&mixed.code).changes, Some(0));
    }

    #[test]
    fn unparsable_source_keeps_entities_with_warning() {
        let code = "const a = \"x &amp; y\"; function ( {";
        let out = run(code);
        assert_eq!(out.code, code);
        assert!(out.warnings.iter().any(|w| w.contains("did not parse")));
    }

    #[test]
    fn collapses_trailing_double_semicolons_only() {
        let out = run("let a = 1;;\nfor (;;) {}\n");
        assert_eq!(out.code, "let a = 1;\nfor (;;) {}\n");
        assert_eq!(out.changes, Some(1));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let first = run("const m = \"a &amp; b\";;");
        let second = run(&first.code);
        assert_eq!(second.code, first.code);
        assert_eq!(second.changes, Some(0));
    }
}
