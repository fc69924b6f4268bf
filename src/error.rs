// src/error.rs
use std::time::Duration;
use thiserror::Error;

use crate::layers::LayerId;

/// Errors that abort a whole engine call.
///
/// Per-layer problems never show up here: they are captured in the
/// layer's own [`crate::pipeline::LayerResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Catastrophic input error: {0}")]
    Catastrophic(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid `layerfix.toml` content or validator data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid corruption pattern '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown layer {0} in [scripts]")]
    UnknownScriptLayer(String),
}

/// Why a single layer could not produce a candidate.
#[derive(Debug, Clone, Error)]
pub enum PluginErrorKind {
    #[error("transform failed: {0}")]
    Threw(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not start external command: {0}")]
    Spawn(String),

    #[error("no usable strategy: {0}")]
    Unsupported(String),

    #[error("layer is not registered")]
    UnknownLayer,
}

/// A layer failed to execute. Recorded per layer; the pipeline keeps going
/// unless fail-fast is set.
#[derive(Debug, Clone, Error)]
#[error("Layer {layer}: {kind}")]
pub struct PluginError {
    pub layer: LayerId,
    pub kind: PluginErrorKind,
}

impl PluginError {
    #[must_use]
    pub fn new(layer: LayerId, kind: PluginErrorKind) -> Self {
        Self { layer, kind }
    }

    #[must_use]
    pub fn threw(layer: LayerId, msg: impl Into<String>) -> Self {
        Self::new(layer, PluginErrorKind::Threw(msg.into()))
    }

    #[must_use]
    pub fn unsupported(layer: LayerId, msg: impl Into<String>) -> Self {
        Self::new(layer, PluginErrorKind::Unsupported(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
