use crate::layers::LayerId;
use crate::validator::corruption::CorruptionPattern;
use crate::validator::integrity::DEFAULT_CRITICAL_IDENTIFIERS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_SHRINK_RATIO: f64 = 0.8;

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default = "default_true")]
    pub use_ast: bool,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            use_ast: true,
            use_cache: true,
            cache_ttl_secs: default_cache_ttl(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_shrink_ratio")]
    pub max_shrink_ratio: f64,
    #[serde(default = "default_critical_identifiers")]
    pub critical_identifiers: Vec<String>,
    /// Added to the built-in corruption patterns, never replacing them.
    #[serde(default)]
    pub corruption_patterns: Vec<CorruptionPattern>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_shrink_ratio: default_shrink_ratio(),
            critical_identifiers: default_critical_identifiers(),
            corruption_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default)]
    pub event_log: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            backup: true,
            backup_retention: default_backup_retention(),
            event_log: false,
        }
    }
}

/// An external command standing in for a layer's textual strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_script_timeout")]
    pub timeout_secs: u64,
}

/// On-disk shape of `layerfix.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LayerfixToml {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub preferences: Preferences,
    /// Keyed by layer id as a string (`[scripts.2]`).
    #[serde(default)]
    pub scripts: BTreeMap<String, ScriptConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub validator: ValidatorConfig,
    pub preferences: Preferences,
    pub scripts: BTreeMap<LayerId, ScriptConfig>,
    pub exclude_patterns: Vec<regex::Regex>,
}

const fn default_true() -> bool { true }
const fn default_cache_ttl() -> u64 { 300 }
const fn default_max_input_bytes() -> usize { 2 * 1024 * 1024 }
const fn default_shrink_ratio() -> f64 { DEFAULT_MAX_SHRINK_RATIO }
const fn default_backup_retention() -> usize { 5 }
const fn default_script_timeout() -> u64 { 30 }

fn default_critical_identifiers() -> Vec<String> {
    DEFAULT_CRITICAL_IDENTIFIERS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
