//! Logical integrity: imports, declarations and exports must not silently
//! disappear. Extraction is textual and tolerant of broken input.

use super::ValidationError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const DEFAULT_CRITICAL_IDENTIFIERS: &[&str] = &[
    "React",
    "useState",
    "useEffect",
    "useContext",
    "useReducer",
    "useCallback",
    "useMemo",
    "useRef",
    "useLayoutEffect",
    "Component",
];

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?([^;'"]*?)\s*\bfrom\s*['"]([^'"]+)['"]"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:const|let|var)\s+([^=;]+?)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\b\s*\*?\s*([A-Za-z_$][\w$]*)?\s*(?:<[^>]*>)?\s*\(")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=>",
    )
    .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").unwrap_or_else(|_| panic!("Invalid Regex"))
});
static EXPORT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bexport\s+(?:declare\s+)?(?:async\s+)?(?:function\s*\*?|abstract\s+class|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static EXPORT_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\b").unwrap_or_else(|_| panic!("Invalid Regex")));
static EXPORT_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+(?:type\s+)?\{([^}]*)\}").unwrap_or_else(|_| panic!("Invalid Regex"))
});
static EXPORT_STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s*\*\s*(?:as\s+([A-Za-z_$][\w$]*)\s*)?from\s*['"]([^'"]+)['"]"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});
static COMMONJS_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bmodule\.exports\b|\bexports\.([A-Za-z_$][\w$]*)\s*=")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// One import statement: the names it binds and the module it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub names: BTreeSet<String>,
    pub module: String,
}

/// Everything the integrity check compares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surface {
    pub imports: Vec<ImportStatement>,
    pub declarations: BTreeSet<String>,
    pub declaration_count: usize,
    pub exports: BTreeSet<String>,
}

impl Surface {
    /// `true` if some import statement binds `name`.
    #[must_use]
    pub fn imports_name(&self, name: &str) -> bool {
        self.imports.iter().any(|i| i.names.contains(name))
    }
}

/// Extracts the import/declaration/export surface of `code`.
///
/// # Errors
/// Returns an error if a matched statement cannot be sliced out of the text.
pub fn extract(code: &str) -> Result<Surface, ValidationError> {
    let mut surface = Surface::default();

    for caps in IMPORT_RE.captures_iter(code) {
        let clause = capture(&caps, 1, "import clause")?;
        let module = capture(&caps, 2, "import source")?;
        surface.imports.push(ImportStatement {
            names: binding_names(clause),
            module: module.to_string(),
        });
    }
    for caps in REQUIRE_RE.captures_iter(code) {
        let clause = capture(&caps, 1, "require binding")?;
        let module = capture(&caps, 2, "require source")?;
        surface.imports.push(ImportStatement {
            names: binding_names(clause),
            module: module.to_string(),
        });
    }

    for re in [&*FUNCTION_RE, &*ARROW_RE, &*CLASS_RE] {
        for caps in re.captures_iter(code) {
            surface.declaration_count += 1;
            let name = caps.get(1).map_or("<anonymous>", |m| m.as_str());
            surface.declarations.insert(name.to_string());
        }
    }

    extract_exports(code, &mut surface.exports)?;
    Ok(surface)
}

fn extract_exports(code: &str, out: &mut BTreeSet<String>) -> Result<(), ValidationError> {
    for caps in EXPORT_DECL_RE.captures_iter(code) {
        out.insert(capture(&caps, 1, "export name")?.to_string());
    }
    if EXPORT_DEFAULT_RE.is_match(code) {
        out.insert("default".to_string());
    }
    for caps in EXPORT_LIST_RE.captures_iter(code) {
        for item in capture(&caps, 1, "export list")?.split(',') {
            let exported = item.rsplit(" as ").next().unwrap_or(item).trim();
            if !exported.is_empty() {
                out.insert(exported.to_string());
            }
        }
    }
    for caps in EXPORT_STAR_RE.captures_iter(code) {
        let module = capture(&caps, 2, "re-export source")?;
        let key = caps
            .get(1)
            .map_or_else(|| format!("* from {module}"), |alias| alias.as_str().to_string());
        out.insert(key);
    }
    for caps in COMMONJS_EXPORT_RE.captures_iter(code) {
        let key = caps
            .get(1)
            .map_or_else(|| "module.exports".to_string(), |m| format!("exports.{}", m.as_str()));
        out.insert(key);
    }
    Ok(())
}

fn capture<'t>(
    caps: &regex::Captures<'t>,
    index: usize,
    what: &'static str,
) -> Result<&'t str, ValidationError> {
    caps.get(index)
        .map(|m| m.as_str())
        .ok_or(ValidationError::Extraction { what })
}

/// Identifier tokens bound by an import clause or destructuring pattern.
/// `{ a as b }` binds both spellings; comparing either keeps a rename from
/// looking like a removal.
fn binding_names(clause: &str) -> BTreeSet<String> {
    clause
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|t| !t.is_empty() && !matches!(*t, "as" | "type" | "typeof"))
        .map(str::to_string)
        .collect()
}

/// Returns a failure description, or `None` if `after` keeps its surface.
///
/// # Errors
/// Propagates extraction failures; the caller treats them as a revert.
pub(super) fn check(
    critical: &[String],
    before: &str,
    after: &str,
) -> Result<Option<String>, ValidationError> {
    let was = extract(before)?;
    let now = extract(after)?;

    for name in critical {
        if was.imports_name(name) && !now.imports_name(name) {
            return Ok(Some(format!("missing import of critical identifier '{name}'")));
        }
    }

    if was.declaration_count > 0 && now.declaration_count == 0 {
        return Ok(Some(format!(
            "all {} function/component declarations removed",
            was.declaration_count
        )));
    }

    if let Some(lost) = was.exports.difference(&now.exports).next() {
        return Ok(Some(format!("export '{lost}' removed")));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_imports() -> Result<(), ValidationError> {
        let s = extract(
            "import React, { useState, useEffect as ue } from 'react';\nimport type { FC } from \"react\";",
        )?;
        assert_eq!(s.imports.len(), 2);
        assert!(s.imports_name("React"));
        assert!(s.imports_name("useState"));
        assert!(s.imports_name("useEffect"));
        assert!(s.imports_name("FC"));
        Ok(())
    }

    #[test]
    fn extracts_multiline_import() -> Result<(), ValidationError> {
        let s = extract("import {\n  useState,\n  useMemo,\n} from 'react';")?;
        assert!(s.imports_name("useMemo"));
        Ok(())
    }

    #[test]
    fn extracts_declarations() -> Result<(), ValidationError> {
        let s = extract(
            "function A() {}\nconst B = () => null;\nconst C = async (x: number): Promise<void> => {};\nclass D {}",
        )?;
        assert_eq!(s.declaration_count, 4);
        assert!(s.declarations.contains("C"));
        Ok(())
    }

    #[test]
    fn extracts_exports() -> Result<(), ValidationError> {
        let s = extract(
            "export default function Page() {}\nexport const a = 1;\nexport { b, c as d };\nexport * from './x';\nmodule.exports = {};",
        )?;
        for key in ["default", "a", "b", "d", "* from ./x", "module.exports"] {
            assert!(s.exports.contains(key), "missing {key}");
        }
        Ok(())
    }

    #[test]
    fn removed_export_fails() -> Result<(), ValidationError> {
        let reason = check(&[], "export const a = 1;\nexport const b = 2;", "export const a = 1;")?;
        assert_eq!(reason.as_deref(), Some("export 'b' removed"));
        Ok(())
    }

    #[test]
    fn merged_import_keeps_names() -> Result<(), ValidationError> {
        let critical = vec!["useState".to_string(), "React".to_string()];
        let before = "import React from 'react';\nimport { useState } from 'react';\nfunction A() {}";
        let after = "import React, { useState } from 'react';\nfunction A() {}";
        assert!(check(&critical, before, after)?.is_none());
        Ok(())
    }
}
