// src/cli/handlers.rs
use crate::cli::args::{FixArgs, OutputFormat};
use crate::config::Config;
use crate::discovery;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::{EventKind, EventLogger};
use crate::exit::LayerfixExit;
use crate::layers::{LayerId, LAYERS, MAX_LAYER, MIN_LAYER};
use crate::pipeline::RunOptions;
use crate::reporting::{self, AnalysisEntry, FileReport};
use crate::repository::{FsRepository, SourceRepository};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

fn roots(paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    }
}

fn load_config() -> Result<Config> {
    Config::load().context("Failed to load layerfix.toml")
}

/// Everything one file's processing needs, shared across rayon workers.
struct FixSession<'a> {
    engine: &'a Engine,
    repo: &'a FsRepository,
    events: Option<&'a EventLogger>,
    requested: &'a [LayerId],
    options: RunOptions,
    backup: bool,
}

impl FixSession<'_> {
    fn process(&self, path: &Path) -> FileReport {
        let display = discovery::normalize_path(path);
        let mut report = FileReport::new(display.clone());

        let code = match self.repo.read(path) {
            Ok(code) => code,
            Err(e) => {
                report.error = Some(format!("{e:#}"));
                return report;
            }
        };

        let requested = if self.requested.is_empty() {
            self.engine.analyze(&code, Some(path)).recommended_layers
        } else {
            self.requested.to_vec()
        };
        if requested.is_empty() {
            return report;
        }
        report.requested.clone_from(&requested);

        let result = match self.engine.run(&code, &requested, self.options, Some(path)) {
            Ok(result) => result,
            Err(e) => {
                report.invalid_input = matches!(e, EngineError::Catastrophic(_));
                report.error = Some(e.to_string());
                return report;
            }
        };
        if let Some(events) = self.events {
            events.log_run(&display, &result);
        }

        if !self.options.dry_run && result.changed() {
            if let Err(e) = self.persist(path, &code, &result.final_code, &mut report) {
                report.error = Some(format!("{e:#}"));
            }
        }
        report.result = Some(result);
        report
    }

    fn persist(&self, path: &Path, original: &str, code: &str, report: &mut FileReport) -> Result<()> {
        if self.backup {
            let saved = self.repo.backup(path, original)?.display().to_string();
            if let Some(events) = self.events {
                events.log(EventKind::BackupCreated {
                    path: report.path.clone(),
                    backup: saved.clone(),
                });
            }
            report.backup = Some(saved);
        }
        self.repo.write(path, code)?;
        report.written = true;
        if let Some(events) = self.events {
            events.log_write(&report.path, code);
        }
        Ok(())
    }
}

/// Handles the fix command.
///
/// # Errors
/// Returns error if configuration cannot be loaded or output fails.
pub fn handle_fix(args: &FixArgs) -> Result<LayerfixExit> {
    let mut config = load_config()?;
    config.pipeline.fail_fast |= args.fail_fast;
    config.pipeline.use_ast &= !args.no_ast;
    config.pipeline.use_cache &= !args.no_cache;
    config.preferences.backup &= !args.no_backup;

    let engine = Engine::from_config(&config)?;
    let files = discovery::discover(&roots(&args.paths), &config);
    tracing::info!(files = files.len(), "discovered files");

    let requested: Vec<LayerId> = if args.all {
        (MIN_LAYER..=MAX_LAYER).collect()
    } else {
        args.layers.clone()
    };
    let options = RunOptions {
        dry_run: args.dry_run,
        fail_fast: config.pipeline.fail_fast,
        use_cache: config.pipeline.use_cache,
        use_ast: config.pipeline.use_ast,
    };

    let root = Path::new(".");
    let repo = FsRepository::new(root)?;
    let events = config.preferences.event_log.then(|| EventLogger::new(root));
    let session = FixSession {
        engine: &engine,
        repo: &repo,
        events: events.as_ref(),
        requested: &requested,
        options,
        backup: config.preferences.backup && !args.dry_run,
    };

    let reports: Vec<FileReport> = files.par_iter().map(|path| session.process(path)).collect();

    if session.backup {
        let removed = repo.cleanup_old_backups(config.preferences.backup_retention);
        tracing::debug!(removed, "pruned old backups");
    }
    if let Some(cache) = engine.cache() {
        let expired = cache.prune_expired();
        tracing::debug!(
            hits = cache.hits(),
            misses = cache.misses(),
            expired,
            "skip cache"
        );
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => reporting::print_fix_report(&reports, args.dry_run),
    }

    Ok(fix_exit(&reports))
}

fn fix_exit(reports: &[FileReport]) -> LayerfixExit {
    if reports.iter().any(|r| r.error.is_some() && !r.invalid_input) {
        return LayerfixExit::Error;
    }
    if reports.iter().any(|r| r.invalid_input) {
        return LayerfixExit::InvalidInput;
    }
    LayerfixExit::from_outcomes(
        reports.iter().any(FileReport::failed),
        reports.iter().any(FileReport::reverted),
    )
}

/// Handles the analyze command.
///
/// # Errors
/// Returns error if configuration cannot be loaded or output fails.
pub fn handle_analyze(paths: &[PathBuf], format: OutputFormat) -> Result<LayerfixExit> {
    let config = load_config()?;
    let engine = Engine::from_config(&config)?;
    let repo = FsRepository::new(Path::new("."))?;
    let files = discovery::discover(&roots(paths), &config);

    let entries: Vec<AnalysisEntry> = files
        .par_iter()
        .map(|path| {
            let display = discovery::normalize_path(path);
            match repo.read(path) {
                Ok(code) => AnalysisEntry {
                    path: display,
                    error: None,
                    report: Some(engine.analyze(&code, Some(path))),
                },
                Err(e) => AnalysisEntry {
                    path: display,
                    error: Some(format!("{e:#}")),
                    report: None,
                },
            }
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => reporting::print_analysis(&entries),
    }

    if entries.iter().any(|e| e.error.is_some()) {
        Ok(LayerfixExit::Error)
    } else {
        Ok(LayerfixExit::Success)
    }
}

/// Handles the layers command.
///
/// # Errors
/// Returns error if JSON serialisation fails.
pub fn handle_layers(format: OutputFormat) -> Result<LayerfixExit> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&LAYERS)?),
        OutputFormat::Text => reporting::print_layers(&LAYERS),
    }
    Ok(LayerfixExit::Success)
}
