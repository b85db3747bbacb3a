//! Threshold-based deletion of tiny files
//!
//! Thumbnails, truncated transfers and zero-byte placeholders pile up in
//! photo trees. This removes every regular file below a size threshold.
//! It works directly on the tree and never goes through a plan.

use crate::error::{Result, ValidationError};
use std::fs;
use std::path::Path;
use tracing::{Level, debug, info, span};
use walkdir::WalkDir;

/// Outcome of a cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files below the threshold
    pub candidates: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Delete files smaller than `threshold_kb` KiB under `root`
///
/// Symlinks are not followed and unreadable entries are skipped. With
/// `dry_run` nothing is removed. One line per candidate goes to
/// `on_line`.
pub fn cleanup(
    root: &Path,
    threshold_kb: u64,
    dry_run: bool,
    mut on_line: impl FnMut(&str),
) -> Result<CleanupReport> {
    if !root.is_dir() {
        return Err(ValidationError::SourceNotDirectory(root.to_path_buf()).into());
    }
    let _span = span!(Level::INFO, "cleanup", root = %root.display(), threshold_kb, dry_run).entered();

    let threshold_bytes = threshold_kb.saturating_mul(1024);
    let mut report = CleanupReport::default();

    let files = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file());

    for entry in files {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let size = metadata.len();
        if size >= threshold_bytes {
            continue;
        }

        report.candidates += 1;
        let path = entry.path();

        if dry_run {
            on_line(&format!("DRY-RUN delete {} ({} bytes)", path.display(), size));
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                report.deleted += 1;
                on_line(&format!("deleted {} ({} bytes)", path.display(), size));
            }
            Err(e) => {
                report.failed += 1;
                on_line(&format!("failed {} ({} bytes): {}", path.display(), size, e));
            }
        }
    }

    info!(
        candidates = report.candidates,
        deleted = report.deleted,
        failed = report.failed,
        "Cleanup finished"
    );
    Ok(report)
}
