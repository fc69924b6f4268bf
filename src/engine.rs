// src/engine.rs
//! Facade over resolver, analyzer and pipeline.
//!
//! The engine never touches the filesystem. Callers own reading, writing and
//! backups; the engine only turns source text into a [`PipelineResult`].

use crate::analysis::{self, AnalysisReport};
use crate::cache::SkipCache;
use crate::config::{Config, PipelineConfig};
use crate::error::{EngineError, Result};
use crate::layers::script::ScriptLayer;
use crate::layers::{LayerId, LayerRegistry};
use crate::pipeline::{Pipeline, PipelineResult, RunOptions};
use crate::resolver;
use crate::validator::Validator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct Engine {
    registry: LayerRegistry,
    validator: Validator,
    cache: Option<Arc<SkipCache>>,
    max_input_bytes: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_registry(LayerRegistry::builtin(), Validator::default())
    }
}

impl Engine {
    /// Builds an engine from loaded configuration: validator extras, cache
    /// TTL and any `[scripts]` overrides.
    ///
    /// # Errors
    /// Returns error if a configured corruption pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        let validator = Validator::new(&config.validator)?;
        let mut registry = LayerRegistry::builtin();
        for (&layer, script) in &config.scripts {
            tracing::debug!(layer, command = %script.command, "layer replaced by script");
            registry.set_plugin(layer, Arc::new(ScriptLayer::new(layer, script.clone())));
        }

        let mut engine = Self::with_registry(registry, validator);
        engine.max_input_bytes = config.pipeline.max_input_bytes;
        if config.pipeline.use_cache {
            engine.cache = Some(Arc::new(SkipCache::new(Duration::from_secs(
                config.pipeline.cache_ttl_secs,
            ))));
        }
        Ok(engine)
    }

    /// Engine over an explicit registry, without a cache.
    #[must_use]
    pub fn with_registry(registry: LayerRegistry, validator: Validator) -> Self {
        Self {
            registry,
            validator,
            cache: None,
            max_input_bytes: PipelineConfig::default().max_input_bytes,
        }
    }

    /// Shares `cache` with this engine. Several engines (or rayon workers
    /// holding the same engine) may use one cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SkipCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = max;
        self
    }

    #[must_use]
    pub fn cache(&self) -> Option<&SkipCache> {
        self.cache.as_deref()
    }

    #[must_use]
    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Resolves `requested` and runs the resulting layers over `code`.
    ///
    /// Per-layer failures and reverts are reported inside the result; only
    /// unusable input aborts the call.
    ///
    /// # Errors
    /// Returns [`EngineError::Catastrophic`] if `code` contains a NUL byte,
    /// exceeds the configured size limit, or no valid layer was requested.
    pub fn run(
        &self,
        code: &str,
        requested: &[LayerId],
        options: RunOptions,
        file_path: Option<&Path>,
    ) -> Result<PipelineResult> {
        self.check_input(code)?;

        let resolution = resolver::resolve(requested);
        for warning in &resolution.warnings {
            tracing::debug!("{warning}");
        }
        if resolution.ordered.is_empty() {
            return Err(EngineError::Catastrophic(format!(
                "no valid layers in request {requested:?}"
            )));
        }

        let mut pipeline = Pipeline::new(&self.registry, &self.validator);
        if let Some(cache) = self.cache.as_deref() {
            pipeline = pipeline.with_cache(cache);
        }
        let mut result = pipeline.run(code, &resolution.ordered, options, file_path);
        result.resolution = Some(resolution);
        Ok(result)
    }

    /// Read-only diagnosis of `code`.
    #[must_use]
    pub fn analyze(&self, code: &str, file_path: Option<&Path>) -> AnalysisReport {
        analysis::analyze(code, file_path)
    }

    fn check_input(&self, code: &str) -> Result<()> {
        if code.contains('\0') {
            return Err(EngineError::Catastrophic(
                "input contains NUL bytes (binary content?)".to_string(),
            ));
        }
        if code.len() > self.max_input_bytes {
            return Err(EngineError::Catastrophic(format!(
                "input is {} bytes, limit is {}",
                code.len(),
                self.max_input_bytes
            )));
        }
        Ok(())
    }
}
