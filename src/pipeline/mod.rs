// src/pipeline/mod.rs
//! Ordered, validated execution of layers over one source text.
//!
//! Each layer's candidate must pass the validator before it replaces the
//! current code. A rejected or failed layer leaves the code as it was and the
//! next layer runs on the last accepted state. Nothing a layer does can make
//! `run` fail.

pub mod diff;
pub mod state;
pub mod types;

pub use self::types::{LayerResult, Outcome, PipelineResult, RunOptions, Summary};

use crate::cache::{entry_hash, SkipCache};
use crate::fallback::{FallbackController, Transformed};
use crate::layers::{descriptor, LayerId, LayerRegistry, TransformContext};
use crate::validator::Validator;
use state::{Accepted, ExecutingLayer, PendingLayer, PipelineRun, NO_CHANGES};
use std::path::Path;

pub struct Pipeline<'a> {
    registry: &'a LayerRegistry,
    validator: &'a Validator,
    cache: Option<&'a SkipCache>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(registry: &'a LayerRegistry, validator: &'a Validator) -> Self {
        Self {
            registry,
            validator,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a SkipCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Runs `layers` in the given order. The order is trusted: callers are
    /// expected to pass a resolved, dependency-closed list.
    #[must_use]
    pub fn run(
        &self,
        code: &str,
        layers: &[LayerId],
        options: RunOptions,
        file_path: Option<&Path>,
    ) -> PipelineResult {
        let ctx = TransformContext { file_path };
        let controller = FallbackController::new(self.registry, self.validator);
        let cache = self.cache.filter(|_| options.use_cache);
        let mut run = PipelineRun::start(code);
        let path_key = ctx.path_str();

        tracing::debug!(?layers, file = %path_key, "pipeline started");

        for &layer in layers {
            let pending = PendingLayer::new(layer);
            let hash = entry_hash(&path_key, run.current());

            if cache.is_some_and(|c| c.should_skip(hash, layer)) {
                tracing::debug!(layer, "skipped: cached no-op");
                run.skip(pending.skip());
                continue;
            }

            let executing = pending.start();
            tracing::debug!(layer, "executing");
            match controller.execute(run.current(), layer, options.use_ast, &ctx) {
                Err(err) => {
                    tracing::warn!(layer, "layer failed: {err}");
                    run.reject(executing.fail(&err));
                    if options.fail_fast {
                        tracing::info!(layer, "fail-fast: stopping pipeline");
                        break;
                    }
                }
                Ok(candidate) => self.settle(&mut run, executing, candidate, &ctx, cache, hash),
            }
        }

        let result = run.finish(options.dry_run);
        tracing::info!(
            changes = result.summary.total_changes,
            ok = result.summary.successful_layers,
            failed = result.summary.failed_layers,
            ms = result.summary.total_execution_time_ms,
            "pipeline finished"
        );
        result
    }

    /// Validates a candidate and either advances or reverts.
    fn settle(
        &self,
        run: &mut PipelineRun,
        executing: ExecutingLayer,
        candidate: Transformed,
        ctx: &TransformContext<'_>,
        cache: Option<&SkipCache>,
        hash: u64,
    ) {
        let layer = executing.layer();
        let verdict = self
            .validator
            .validate_at(run.current(), &candidate.code, ctx.file_path);
        if !verdict.accept {
            let reason = verdict.reason.unwrap_or_default();
            tracing::warn!(layer, "reverted: {reason}");
            run.reject(executing.revert(reason, candidate.warnings, candidate.method));
            return;
        }

        let unchanged = candidate.code == run.current();
        let (change_count, improvements) = if unchanged {
            if let Some(cache) = cache {
                cache.mark_skippable(hash, layer);
            }
            (0, vec![NO_CHANGES.to_string()])
        } else {
            let count = candidate
                .changes
                .filter(|&n| n > 0)
                .unwrap_or_else(|| diff::changed_lines(run.current(), &candidate.code));
            let improvements = if candidate.improvements.is_empty() {
                vec![default_improvement(layer)]
            } else {
                candidate.improvements
            };
            (count, improvements)
        };

        tracing::debug!(layer, change_count, method = %candidate.method, "accepted");
        let result = executing.accept(Accepted {
            change_count,
            improvements,
            warnings: candidate.warnings,
            method: candidate.method,
        });
        run.advance(result, candidate.code);
    }
}

fn default_improvement(layer: LayerId) -> String {
    match descriptor(layer) {
        Some(desc) => format!("Applied {} fixes", desc.name),
        None => format!("Applied layer {layer} fixes"),
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
