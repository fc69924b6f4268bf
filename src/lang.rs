use std::path::Path;
use tree_sitter::{Language, Parser, Tree};

/// Grammars the AST strategy can parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    TypeScript,
    Tsx,
}

impl Lang {
    #[must_use]
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" | "js" | "jsx" | "mjs" | "cjs" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Picks a grammar for `path`. Unknown or missing paths get the TSX
    /// grammar, which accepts plain JavaScript and JSX alike.
    #[must_use]
    pub fn for_path(path: Option<&Path>) -> Self {
        path.and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(Self::from_ext)
            .unwrap_or(Self::Tsx)
    }

    #[must_use]
    pub fn grammar(self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::language_typescript(),
            Self::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }

    /// Parses `source`. Returns `None` if the grammar cannot be loaded or the
    /// parser gives up.
    #[must_use]
    pub fn parse(self, source: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        parser.set_language(self.grammar()).ok()?;
        parser.parse(source, None)
    }
}

/// Returns `true` for source files the layers understand as code, as opposed
/// to JSON configuration.
#[must_use]
pub fn is_script_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| Lang::from_ext(e).is_some())
}
