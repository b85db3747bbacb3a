//! Organize session: plan and execute one copy run
//!
//! An [`Organizer`] owns everything one run needs: the normalized roots,
//! the prior-success set loaded for resume, and live counters that a
//! supervising thread can poll while a worker executes.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::media::MediaKind;
use crate::plan::{Operation, Plan, build_plan};
use crate::run_log::{
    RunLogWriter, find_latest_log, load_successful_destinations, make_log_path, normalize_path,
};
use crate::scanner::MediaScanner;
use crate::validate::validate_paths;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{Level, info, span, warn};

/// Live counters for one run
#[derive(Debug, Default)]
pub struct CopyStats {
    pub images_found: AtomicUsize,
    pub videos_found: AtomicUsize,
    pub images_copied: AtomicUsize,
    pub videos_copied: AtomicUsize,
    pub failed: AtomicUsize,
    /// Operations finished so far
    pub completed: AtomicUsize,
    /// Operations in the plan being executed
    pub total: AtomicUsize,
}

impl Clone for CopyStats {
    fn clone(&self) -> Self {
        Self {
            images_found: AtomicUsize::new(self.images_found.load(Ordering::Relaxed)),
            videos_found: AtomicUsize::new(self.videos_found.load(Ordering::Relaxed)),
            images_copied: AtomicUsize::new(self.images_copied.load(Ordering::Relaxed)),
            videos_copied: AtomicUsize::new(self.videos_copied.load(Ordering::Relaxed)),
            failed: AtomicUsize::new(self.failed.load(Ordering::Relaxed)),
            completed: AtomicUsize::new(self.completed.load(Ordering::Relaxed)),
            total: AtomicUsize::new(self.total.load(Ordering::Relaxed)),
        }
    }
}

impl CopyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "Found - Pics: {}, Videos: {} | Copied - Pics: {}, Videos: {} | Failed: {} | Progress: {}/{}",
            self.images_found.load(Ordering::Relaxed),
            self.videos_found.load(Ordering::Relaxed),
            self.images_copied.load(Ordering::Relaxed),
            self.videos_copied.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.completed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed)
        )
    }

    fn record_found(&self, kind: MediaKind) {
        let counter = match kind {
            MediaKind::Image => &self.images_found,
            MediaKind::Video => &self.videos_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_result(&self, op: &Operation, success: bool) {
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if let Operation::Copy { kind, .. } = op {
            let counter = match kind {
                MediaKind::Image => &self.images_copied,
                MediaKind::Video => &self.videos_copied,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Result of executing a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub log_path: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
}

/// One copy run from a source tree into an organized destination
pub struct Organizer {
    source: PathBuf,
    destination: PathBuf,
    resume: bool,
    prior_successes: HashSet<PathBuf>,
    stats: Arc<CopyStats>,
}

impl Organizer {
    pub fn new(source: impl AsRef<Path>, destination: impl AsRef<Path>, resume: bool) -> Self {
        Self {
            source: normalize_path(source.as_ref()),
            destination: normalize_path(destination.as_ref()),
            resume,
            prior_successes: HashSet::new(),
            stats: Arc::new(CopyStats::new()),
        }
    }

    /// Build from a config that names both roots
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = config
            .source_dir
            .as_ref()
            .ok_or_else(|| Error::Config("source_dir is not set".to_string()))?;
        let destination = config
            .destination_dir
            .as_ref()
            .ok_or_else(|| Error::Config("destination_dir is not set".to_string()))?;
        Ok(Self::new(source, destination, config.resume))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Destinations the latest matching run log recorded as copied
    pub fn prior_successes(&self) -> &HashSet<PathBuf> {
        &self.prior_successes
    }

    /// Get a clone of the stats Arc for sharing with a progress display
    pub fn stats_arc(&self) -> Arc<CopyStats> {
        Arc::clone(&self.stats)
    }

    /// Validate, load resume data, scan and plan
    ///
    /// `on_directory` receives scanner progress messages and `on_debug`
    /// the low-level directory events. Only validation can fail.
    pub fn plan(
        &mut self,
        on_directory: impl FnMut(&str),
        on_debug: impl FnMut(&str),
    ) -> Result<Plan> {
        let _span = span!(Level::INFO, "organize_plan", source = %self.source.display()).entered();

        validate_paths(&self.source, &self.destination)?;

        self.prior_successes = if self.resume {
            self.load_resume_set()
        } else {
            HashSet::new()
        };

        self.stats.images_found.store(0, Ordering::Relaxed);
        self.stats.videos_found.store(0, Ordering::Relaxed);

        let started = Instant::now();
        let stats = Arc::clone(&self.stats);
        let entries = MediaScanner::new(&self.source)
            .on_directory(on_directory)
            .on_debug(on_debug)
            .inspect(|media| stats.record_found(media.kind));
        let plan = build_plan(entries, &self.destination, &self.prior_successes)
            .with_scan_stats(started.elapsed(), self.resume);

        info!(
            found = plan.total_found,
            to_copy = plan.total_files,
            skipped = plan.total_skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plan ready"
        );
        Ok(plan)
    }

    fn load_resume_set(&self) -> HashSet<PathBuf> {
        match find_latest_log(&self.destination) {
            Some(log) => {
                let prior = load_successful_destinations(
                    &log,
                    Some(&self.source),
                    Some(&self.destination),
                );
                info!(log = ?log, entries = prior.len(), "Resuming from run log");
                prior
            }
            None => {
                info!("No previous run log found");
                HashSet::new()
            }
        }
    }

    /// Execute a plan, writing a fresh run log under the destination
    ///
    /// Every log line is written to the run log and then passed to
    /// `on_log_line`. Failing operations never stop the run; only
    /// creating the run log itself can fail.
    pub fn execute(
        &self,
        plan: &Plan,
        mut on_log_line: impl FnMut(&str),
        mut on_operation_result: impl FnMut(&Operation, bool),
    ) -> Result<CopyReport> {
        let _span = span!(Level::INFO, "organize_execute", operations = plan.operations.len()).entered();

        let log_path = make_log_path(&self.destination);
        let mut writer = RunLogWriter::create(&log_path, &self.source, &self.destination)?;

        let stats = &self.stats;
        stats.total.store(plan.operations.len(), Ordering::Relaxed);
        stats.completed.store(0, Ordering::Relaxed);

        let report = Executor::new(|line| {
            if let Err(e) = writer.write_line(line) {
                warn!(error = %e, "Failed to write run log line");
            }
            on_log_line(line);
        })
        .on_operation_result(|op, success| {
            stats.record_result(op, success);
            on_operation_result(op, success);
        })
        .on_progress(|done, _| stats.completed.store(done, Ordering::Relaxed))
        .run(&plan.operations);

        info!("{}", stats.summary());
        Ok(CopyReport {
            log_path,
            succeeded: report.succeeded,
            failed: report.failed,
        })
    }
}
