//! Run orchestration.
//!
//! Ties the pipeline stages together around an explicit [`RunContext`]:
//! settings, the per-run logger, and the run clock travel through function
//! arguments, never through global state.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::logging::{LogConfig, RunLogger};
use crate::models::{MediaItem, TransformResult, WorkItem};
use crate::pool::{collect_sorted, WorkerPool};
use crate::review::{ReviewManifest, ReviewSelection};
use crate::transform::Transform;

/// Everything a run carries between stages.
pub struct RunContext {
    /// Effective settings for this run.
    pub settings: Settings,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    started: Instant,
}

impl RunContext {
    /// Start a new run: creates the per-run log file under `log_dir`.
    pub fn new(settings: Settings, log_dir: impl AsRef<std::path::Path>) -> io::Result<Self> {
        let run_name = format!("vtriage_{}", Local::now().format("%Y%m%d-%H%M%S"));
        let logger = RunLogger::new(run_name, log_dir, LogConfig::default(), None)?;
        Ok(Self {
            settings,
            logger: Arc::new(logger),
            started: Instant::now(),
        })
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the elapsed-time report and flush the run log.
    pub fn finish(&self) {
        let secs = self.elapsed().as_secs_f64();
        self.logger.info(&format!("Run finished in {:.1}s", secs));
        self.logger.flush();
    }
}

/// Run one transform stage over the items through the worker pool.
///
/// Returns one result per input, re-sorted to submission order. Per-item
/// failures are logged and carried in the results; they never abort the
/// stage.
pub fn run_transforms(
    ctx: &RunContext,
    transform: Arc<dyn Transform>,
    items: Vec<MediaItem>,
) -> io::Result<Vec<TransformResult>> {
    let stage = transform.name().to_string();
    ctx.logger.phase(&format!(
        "{}: {} item(s), {} worker(s)",
        stage,
        items.len(),
        ctx.settings.pool.worker_count
    ));

    let work: Vec<WorkItem> = items
        .into_iter()
        .enumerate()
        .map(|(seq, item)| WorkItem { seq, item })
        .collect();

    let pool = WorkerPool::new(ctx.settings.pool.worker_count);
    let rx = pool.run(transform, work)?;
    let results = collect_sorted(&rx);

    let mut failures = 0;
    for result in &results {
        match &result.outcome {
            Ok(artifact) => ctx.logger.debug(&format!(
                "{}: {} -> {}",
                stage,
                result.item.path.display(),
                artifact.path.display()
            )),
            Err(reason) => {
                failures += 1;
                ctx.logger.error(&format!(
                    "{}: {}: {}",
                    stage,
                    result.item.path.display(),
                    reason
                ));
            }
        }
    }

    if failures == 0 {
        ctx.logger
            .success(&format!("{}: all {} item(s) ok", stage, results.len()));
    } else {
        ctx.logger.warn(&format!(
            "{}: {} of {} item(s) failed",
            stage,
            failures,
            results.len()
        ));
    }

    Ok(results)
}

/// Final tally of a dispatch pass.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Items dispatched per bucket.
    pub bucket_counts: BTreeMap<String, usize>,
    /// Total files moved (stem siblings included).
    pub moved_files: usize,
    /// Per-file dispatch failures, by path and reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Whether every requested move completed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply the reviewer's selection: build choices and dispatch the moves.
pub fn apply_dispositions(
    ctx: &RunContext,
    manifest: &ReviewManifest,
    selection: ReviewSelection,
) -> RunSummary {
    let choices = selection.into_choices(manifest);
    ctx.logger.phase(&format!(
        "dispatch: {} choice(s), mode {}",
        choices.len(),
        manifest.collision_mode
    ));

    let dispatcher = Dispatcher::new(&manifest.output_root, manifest.collision_mode);
    let report = dispatcher.dispatch_all(&choices);

    for action in &report.actions {
        let mut note = String::new();
        if action.replaced {
            note.push_str(" (replaced)");
        }
        if action.renamed {
            note.push_str(" (renamed)");
        }
        ctx.logger.action(&format!(
            "{} -> {}{}",
            action.file.display(),
            action.destination.display(),
            note
        ));
    }

    let failures: Vec<(PathBuf, String)> = report
        .errors
        .iter()
        .map(|e| (error_path(e), e.to_string()))
        .collect();
    for (_, reason) in &failures {
        ctx.logger.error(reason);
    }

    for (bucket, count) in &report.counts {
        ctx.logger.info(&format!("{}: {} item(s)", bucket, count));
    }

    RunSummary {
        bucket_counts: report.counts,
        moved_files: report.actions.len(),
        failures,
    }
}

fn error_path(e: &crate::dispatch::DispatchError) -> PathBuf {
    use crate::dispatch::DispatchError::*;
    match e {
        BucketUnwritable { path, .. } | Unreadable { path, .. } => path.clone(),
        MoveFailed { from, .. } => from.clone(),
    }
}
