// src/config/io.rs
use super::types::{Config, LayerfixToml};
use crate::error::ConfigError;
use crate::layers::{descriptor, LayerId};
use regex::Regex;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "layerfix.toml";
pub const IGNORE_FILE: &str = ".layerfixignore";

/// Parses `layerfix.toml` content.
///
/// # Errors
/// Returns error on invalid TOML.
pub fn parse_toml(content: &str) -> Result<LayerfixToml, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Copies a parsed file into `config`.
///
/// # Errors
/// Returns error if a `[scripts]` key is not a registered layer id.
pub fn apply_toml(config: &mut Config, file: LayerfixToml) -> Result<(), ConfigError> {
    config.pipeline = file.pipeline;
    config.validator = file.validator;
    config.preferences = file.preferences;

    config.scripts.clear();
    for (key, script) in file.scripts {
        let id: LayerId = key
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownScriptLayer(key.clone()))?;
        if descriptor(id).is_none() {
            return Err(ConfigError::UnknownScriptLayer(key));
        }
        config.scripts.insert(id, script);
    }
    Ok(())
}

/// Loads `layerfix.toml` from `root` if present.
///
/// # Errors
/// Returns error if the file exists but is invalid.
pub fn load_toml_config(config: &mut Config, root: &Path) -> Result<(), ConfigError> {
    let path = root.join(CONFIG_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(());
    };
    let file = parse_toml(&content)?;
    apply_toml(config, file)
}

/// Loads `.layerfixignore` from `root` if present. Each non-empty,
/// non-comment line is a regex matched against forward-slash paths.
pub fn load_ignore_file(config: &mut Config, root: &Path) {
    let Ok(content) = fs::read_to_string(root.join(IGNORE_FILE)) else {
        return;
    };
    for line in content.lines() {
        process_ignore_line(config, line);
    }
}

pub fn process_ignore_line(config: &mut Config, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return;
    }
    match Regex::new(trimmed) {
        Ok(re) => config.exclude_patterns.push(re),
        Err(e) => tracing::warn!("ignoring invalid pattern in {IGNORE_FILE}: {trimmed} ({e})"),
    }
}
