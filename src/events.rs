// src/events.rs
//! Machine-readable event logging for audit trails.
//!
//! Events are appended to `.layerfix/events.jsonl`.

use crate::layers::LayerId;
use crate::pipeline::{Outcome, PipelineResult};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const EVENT_DIR: &str = ".layerfix";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PipelineStarted {
        path: String,
        layers: Vec<LayerId>,
    },
    LayerAccepted {
        path: String,
        layer: LayerId,
        changes: usize,
    },
    LayerReverted {
        path: String,
        layer: LayerId,
        reason: String,
    },
    LayerFailed {
        path: String,
        layer: LayerId,
        error: String,
    },
    LayerSkipped {
        path: String,
        layer: LayerId,
    },
    PipelineFinished {
        path: String,
        total_changes: usize,
        dry_run: bool,
    },
    FileWritten {
        path: String,
        bytes: usize,
        sha256: String,
    },
    BackupCreated {
        path: String,
        backup: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayerfixEvent {
    pub timestamp: u64,
    pub kind: EventKind,
}

#[derive(Clone)]
pub struct EventLogger {
    log_path: PathBuf,
}

impl EventLogger {
    #[must_use]
    pub fn new(repo_root: &Path) -> Self {
        let log_path = repo_root.join(EVENT_DIR).join("events.jsonl");
        Self { log_path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn log(&self, kind: EventKind) {
        // Best effort: a broken log never fails a run.
        if let Ok(json) = Self::serialize_event(kind) {
            if let Err(e) = self.append_to_file(&json) {
                tracing::debug!("event log write failed: {e}");
            }
        }
    }

    /// Logs the start, each layer outcome and the finish of one pipeline run.
    pub fn log_run(&self, path: &str, result: &PipelineResult) {
        let layers = result
            .resolution
            .as_ref()
            .map(|r| r.ordered.clone())
            .unwrap_or_else(|| result.layer_results.iter().map(|r| r.layer_id).collect());
        self.log(EventKind::PipelineStarted {
            path: path.to_string(),
            layers,
        });

        for r in &result.layer_results {
            let path = path.to_string();
            let layer = r.layer_id;
            let kind = match r.outcome() {
                Outcome::Accepted => EventKind::LayerAccepted {
                    path,
                    layer,
                    changes: r.change_count,
                },
                Outcome::Reverted => EventKind::LayerReverted {
                    path,
                    layer,
                    reason: r.revert_reason.clone().unwrap_or_default(),
                },
                Outcome::Failed => EventKind::LayerFailed {
                    path,
                    layer,
                    error: r.error.clone().unwrap_or_default(),
                },
                Outcome::Skipped => EventKind::LayerSkipped { path, layer },
            };
            self.log(kind);
        }

        self.log(EventKind::PipelineFinished {
            path: path.to_string(),
            total_changes: result.summary.total_changes,
            dry_run: result.dry_run,
        });
    }

    pub fn log_write(&self, path: &str, content: &str) {
        self.log(EventKind::FileWritten {
            path: path.to_string(),
            bytes: content.len(),
            sha256: sha256_hex(content),
        });
    }

    fn serialize_event(kind: EventKind) -> Result<String> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let event = LayerfixEvent { timestamp, kind };
        Ok(serde_json::to_string(&event)?)
    }

    fn append_to_file(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }
}

#[must_use]
pub fn sha256_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
