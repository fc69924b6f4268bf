// src/config/mod.rs
pub mod io;
pub mod types;

pub use self::io::{CONFIG_FILE, IGNORE_FILE};
pub use self::types::{
    Config, LayerfixToml, PipelineConfig, Preferences, ScriptConfig, ValidatorConfig,
    DEFAULT_MAX_SHRINK_RATIO,
};
use crate::error::ConfigError;
use std::path::Path;

/// Directories discovery never descends into.
pub const PRUNE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".next",
    "dist",
    "build",
    "out",
    "coverage",
    ".turbo",
    ".cache",
    ".layerfix",
    crate::repository::BACKUP_DIR,
];

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `layerfix.toml` and `.layerfixignore` from the current directory.
    ///
    /// # Errors
    /// Returns error if `layerfix.toml` exists but is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Loads `layerfix.toml` and `.layerfixignore` from `root`.
    ///
    /// # Errors
    /// Returns error if `layerfix.toml` exists but is invalid.
    pub fn load_from(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        io::load_toml_config(&mut config, root)?;
        io::load_ignore_file(&mut config, root);
        Ok(config)
    }

    /// Parses TOML content into this config.
    ///
    /// # Errors
    /// Returns error on invalid TOML or unknown script layers.
    pub fn parse_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file = io::parse_toml(content)?;
        io::apply_toml(self, file)
    }

    pub fn process_ignore_line(&mut self, line: &str) {
        io::process_ignore_line(self, line);
    }

    /// `true` if a forward-slash path matches an exclusion pattern.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }
}

#[must_use]
pub fn should_prune(name: &str) -> bool {
    PRUNE_DIRS.contains(&name)
}
