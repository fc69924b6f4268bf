// src/layers/mod.rs
//! The layer table and the plugin contract every fix rule implements.
//!
//! Layers are numbered passes. A layer may only depend on lower-numbered
//! layers, so ascending id order is always a valid execution order.

pub mod components;
pub mod config_files;
pub mod edits;
pub mod hydration;
pub mod patterns;
pub mod registry;
pub mod router;
pub mod script;
pub mod testing;

use crate::error::PluginErrorKind;
use serde::Serialize;
use std::path::Path;
use tree_sitter::Tree;

pub use registry::LayerRegistry;

pub type LayerId = u32;

/// Static description of one layer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub name: &'static str,
    pub description: &'static str,
    pub dependencies: &'static [LayerId],
    pub supports_ast: bool,
    pub critical: bool,
}

pub const LAYERS: [LayerDescriptor; 6] = [
    LayerDescriptor {
        id: 1,
        name: "Configuration",
        description: "Modernizes tsconfig.json, next.config.js and package.json",
        dependencies: &[],
        supports_ast: false,
        critical: true,
    },
    LayerDescriptor {
        id: 2,
        name: "Patterns",
        description: "Unescapes HTML entities and cleans legacy patterns",
        dependencies: &[1],
        supports_ast: false,
        critical: false,
    },
    LayerDescriptor {
        id: 3,
        name: "Components",
        description: "Adds missing list keys and React hook imports",
        dependencies: &[1, 2],
        supports_ast: true,
        critical: false,
    },
    LayerDescriptor {
        id: 4,
        name: "Hydration",
        description: "Guards browser-only storage access for server rendering",
        dependencies: &[1, 2, 3],
        supports_ast: true,
        critical: false,
    },
    LayerDescriptor {
        id: 5,
        name: "App Router",
        description: "Applies Next.js App Router conventions ('use client', navigation imports)",
        dependencies: &[1, 2, 3, 4],
        supports_ast: false,
        critical: false,
    },
    LayerDescriptor {
        id: 6,
        name: "Testing",
        description: "Adds missing Testing Library imports to test files",
        dependencies: &[1, 2, 3],
        supports_ast: false,
        critical: false,
    },
];

pub const MIN_LAYER: LayerId = 1;
pub const MAX_LAYER: LayerId = 6;

#[must_use]
pub fn descriptor(id: LayerId) -> Option<&'static LayerDescriptor> {
    LAYERS.iter().find(|d| d.id == id)
}

/// Per-call information handed to plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformContext<'a> {
    pub file_path: Option<&'a Path>,
}

impl TransformContext<'_> {
    /// File name (last path component), or an empty string.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.file_path
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// Path with forward slashes, or an empty string.
    #[must_use]
    pub fn path_str(&self) -> String {
        self.file_path
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }
}

/// What a plugin hands back. A bare `String` converts into this; a missing
/// `changes` count makes the pipeline fall back to its own line diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    pub code: String,
    pub changes: Option<usize>,
    pub improvements: Vec<String>,
    pub warnings: Vec<String>,
}

impl PluginOutput {
    #[must_use]
    pub fn new(code: String) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_changes(mut self, changes: usize) -> Self {
        self.changes = Some(changes);
        self
    }

    #[must_use]
    pub fn with_improvement(mut self, text: impl Into<String>) -> Self {
        self.improvements.push(text.into());
        self
    }

    #[must_use]
    pub fn with_warning(mut self, text: impl Into<String>) -> Self {
        self.warnings.push(text.into());
        self
    }
}

impl From<String> for PluginOutput {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

pub type PluginResult = std::result::Result<PluginOutput, PluginErrorKind>;

/// A parsed view of the current code for the AST strategy.
pub struct SourceTree<'a> {
    pub tree: &'a Tree,
    pub source: &'a str,
}

/// One fix rule. Both capabilities are optional; returning `None` means the
/// plugin has no such strategy.
pub trait LayerPlugin: Send + Sync {
    fn ast_transform(
        &self,
        _tree: &SourceTree<'_>,
        _ctx: &TransformContext<'_>,
    ) -> Option<PluginResult> {
        None
    }

    fn regex_transform(&self, _code: &str, _ctx: &TransformContext<'_>) -> Option<PluginResult> {
        None
    }
}
