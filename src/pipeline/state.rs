// src/pipeline/state.rs
//! Layer and pipeline states as types.
//!
//! A layer is `PendingLayer` until it starts or is skipped, `ExecutingLayer`
//! while its strategy runs, and a finished `LayerResult` afterwards. Each
//! transition consumes the previous state, so a layer cannot be finished
//! twice or accepted without having started.

use super::types::{LayerResult, PipelineResult, Summary};
use crate::error::PluginError;
use crate::fallback::Method;
use crate::layers::LayerId;
use std::time::Instant;

pub const NO_CHANGES: &str = "no changes needed";

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub struct PendingLayer {
    layer: LayerId,
}

impl PendingLayer {
    #[must_use]
    pub fn new(layer: LayerId) -> Self {
        Self { layer }
    }

    /// Served from the skip cache: a documented no-op.
    #[must_use]
    pub fn skip(self) -> LayerResult {
        LayerResult {
            layer_id: self.layer,
            success: true,
            change_count: 0,
            improvements: vec![NO_CHANGES.to_string()],
            warnings: Vec::new(),
            reverted: false,
            revert_reason: None,
            error: None,
            skipped: true,
            execution_time_ms: 0,
            method_used: Method::None,
        }
    }

    #[must_use]
    pub fn start(self) -> ExecutingLayer {
        ExecutingLayer {
            layer: self.layer,
            started: Instant::now(),
        }
    }
}

/// A validated candidate ready to become the current code.
pub struct Accepted {
    pub change_count: usize,
    pub improvements: Vec<String>,
    pub warnings: Vec<String>,
    pub method: Method,
}

pub struct ExecutingLayer {
    layer: LayerId,
    started: Instant,
}

impl ExecutingLayer {
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    #[must_use]
    pub fn accept(self, accepted: Accepted) -> LayerResult {
        LayerResult {
            layer_id: self.layer,
            success: true,
            change_count: accepted.change_count,
            improvements: accepted.improvements,
            warnings: accepted.warnings,
            reverted: false,
            revert_reason: None,
            error: None,
            skipped: false,
            execution_time_ms: elapsed_ms(self.started),
            method_used: accepted.method,
        }
    }

    #[must_use]
    pub fn revert(self, reason: String, warnings: Vec<String>, method: Method) -> LayerResult {
        LayerResult {
            layer_id: self.layer,
            success: false,
            change_count: 0,
            improvements: Vec::new(),
            warnings,
            reverted: true,
            revert_reason: Some(reason),
            error: None,
            skipped: false,
            execution_time_ms: elapsed_ms(self.started),
            method_used: method,
        }
    }

    #[must_use]
    pub fn fail(self, error: &PluginError) -> LayerResult {
        LayerResult {
            layer_id: self.layer,
            success: false,
            change_count: 0,
            improvements: Vec::new(),
            warnings: Vec::new(),
            reverted: false,
            revert_reason: None,
            error: Some(error.kind.to_string()),
            skipped: false,
            execution_time_ms: elapsed_ms(self.started),
            method_used: Method::None,
        }
    }
}

/// The running pipeline. Created from the input, consumed into the result.
pub struct PipelineRun {
    current: String,
    snapshots: Vec<String>,
    results: Vec<LayerResult>,
    started: Instant,
}

impl PipelineRun {
    #[must_use]
    pub fn start(input: &str) -> Self {
        Self {
            current: input.to_string(),
            snapshots: vec![input.to_string()],
            results: Vec::new(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Records a successful layer and advances the current code.
    pub fn advance(&mut self, result: LayerResult, code: String) {
        self.snapshots.push(code.clone());
        self.current = code;
        self.results.push(result);
    }

    /// Records a skipped layer; the unchanged code is snapshotted again.
    pub fn skip(&mut self, result: LayerResult) {
        self.snapshots.push(self.current.clone());
        self.results.push(result);
    }

    /// Records a reverted or failed layer. The current code stays.
    pub fn reject(&mut self, result: LayerResult) {
        self.results.push(result);
    }

    #[must_use]
    pub fn finish(self, dry_run: bool) -> PipelineResult {
        let summary = Summary::from_results(&self.results, elapsed_ms(self.started));
        PipelineResult {
            final_code: self.current,
            layer_results: self.results,
            snapshots: self.snapshots,
            summary,
            dry_run,
            resolution: None,
        }
    }
}
