// src/discovery.rs
//! Finds the files the CLI should process.

use crate::config::{should_prune, Config};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static SOURCE_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:[cm]?js|jsx|ts|tsx)$").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static CONFIG_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:tsconfig\.json|package\.json|next\.config\.[cm]?[jt]s)$")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static DECLARATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.d\.[cm]?ts$").unwrap_or_else(|_| panic!("Invalid Regex")));

/// Walks `roots` and returns every source or config file layerfix handles,
/// sorted and deduplicated. A root that is a file is kept if it qualifies.
#[must_use]
pub fn discover(roots: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut errors = 0usize;

    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !should_prune(&e.file_name().to_string_lossy()));

        for item in walker {
            match item {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.path();
                    let path = path.strip_prefix("./").unwrap_or(path);
                    files.push(path.to_path_buf());
                }
                Ok(_) => {}
                Err(e) => {
                    errors += 1;
                    tracing::debug!("walk error: {e}");
                }
            }
        }
    }

    if errors > 0 {
        tracing::warn!("encountered {errors} errors during file walk");
    }

    files.retain(|p| is_candidate(p) && !config.is_excluded(&normalize_path(p)));
    files.sort();
    files.dedup();
    files
}

/// JS/TS sources (not declaration files) and the known config files.
#[must_use]
pub fn is_candidate(path: &Path) -> bool {
    let name = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
    if CONFIG_NAME_RE.is_match(name) {
        return true;
    }
    SOURCE_EXT_RE.is_match(name) && !DECLARATION_RE.is_match(name)
}

/// Normalizes a path to use forward slashes (cross-platform pattern matching).
#[must_use]
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
