// src/pipeline/types.rs
use crate::fallback::Method;
use crate::layers::LayerId;
use crate::resolver::Resolution;
use serde::Serialize;

/// Flags for one pipeline run.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub dry_run: bool,
    pub fail_fast: bool,
    pub use_cache: bool,
    pub use_ast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            fail_fast: false,
            use_cache: true,
            use_ast: true,
        }
    }
}

/// How a layer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Reverted,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerResult {
    pub layer_id: LayerId,
    pub success: bool,
    pub change_count: usize,
    pub improvements: Vec<String>,
    pub warnings: Vec<String>,
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub skipped: bool,
    pub execution_time_ms: u64,
    pub method_used: Method,
}

impl LayerResult {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match (self.success, self.reverted, self.skipped) {
            (true, _, true) => Outcome::Skipped,
            (true, _, false) => Outcome::Accepted,
            (false, true, _) => Outcome::Reverted,
            (false, false, _) => Outcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_changes: usize,
    pub successful_layers: usize,
    pub failed_layers: usize,
    pub reverted_layers: usize,
    pub total_execution_time_ms: u64,
}

impl Summary {
    #[must_use]
    pub fn from_results(results: &[LayerResult], total_execution_time_ms: u64) -> Self {
        let mut summary = Self {
            total_execution_time_ms,
            ..Self::default()
        };
        for r in results {
            summary.total_changes += r.change_count;
            match r.outcome() {
                Outcome::Accepted | Outcome::Skipped => summary.successful_layers += 1,
                Outcome::Reverted => {
                    summary.failed_layers += 1;
                    summary.reverted_layers += 1;
                }
                Outcome::Failed => summary.failed_layers += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    pub final_code: String,
    pub layer_results: Vec<LayerResult>,
    /// `snapshots[0]` is the input; one more per successful layer.
    pub snapshots: Vec<String>,
    pub summary: Summary,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl PipelineResult {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.snapshots.first().is_some_and(|s| *s != self.final_code)
    }

    #[must_use]
    pub fn result_for(&self, layer: LayerId) -> Option<&LayerResult> {
        self.layer_results.iter().find(|r| r.layer_id == layer)
    }

    #[must_use]
    pub fn has_reverts(&self) -> bool {
        self.summary.reverted_layers > 0
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.summary.failed_layers > self.summary.reverted_layers
    }
}
