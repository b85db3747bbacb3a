//! In-place rebuild of an organized destination
//!
//! The destination is re-scanned and every media file is moved to the
//! directory its capture time calls for. Nothing is resumed: the layout
//! is always re-derived from what is on disk now.

use crate::error::Result;
use crate::executor::Executor;
use crate::layout::{layout_dir, unique_path};
use crate::media::{is_ignorable_file, is_sidecar};
use crate::plan::{Operation, is_probable_duplicate};
use crate::run_log::{RunLogWriter, make_log_path, normalize_path};
use crate::scanner::scan;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Counts reported by a rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub moved: usize,
    pub skipped_same_path: usize,
    pub skipped_duplicates: usize,
    pub total_files: usize,
    pub deleted_empty_dirs: usize,
    /// Operations that failed during execution
    pub failed: usize,
}

impl RebuildSummary {
    /// The `REBUILD SUMMARY:` run log line
    pub fn log_line(&self) -> String {
        format!(
            "REBUILD SUMMARY: total={} moved={} skipped_same={} skipped_duplicates={}",
            self.total_files, self.moved, self.skipped_same_path, self.skipped_duplicates
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOptions {
    pub delete_sidecars: bool,
    pub delete_empty_dirs: bool,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            delete_sidecars: true,
            delete_empty_dirs: false,
        }
    }
}

/// Delete operations for every `._` sidecar file anywhere under `root`
pub fn build_sidecar_delete_ops(root: &Path) -> Vec<Operation> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_sidecar(entry.file_name()))
        .map(|entry| Operation::Delete {
            path: entry.into_path(),
        })
        .collect()
}

/// Plan the moves that bring `root` back into the standard layout
///
/// Returns `MakeDir` operations (sorted) followed by moves and, when
/// requested, sidecar deletions.
pub fn build_rebuild_operations(root: &Path, delete_sidecars: bool) -> (Vec<Operation>, RebuildSummary) {
    let _span = span!(Level::INFO, "build_rebuild", root = %root.display()).entered();

    let mut summary = RebuildSummary::default();
    let mut target_dirs: BTreeSet<PathBuf> = BTreeSet::new();
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut ops = Vec::new();

    for media in scan(root) {
        summary.total_files += 1;

        let target_dir = layout_dir(root, &media.captured_at, media.kind);
        let Some(file_name) = media.path.file_name() else {
            continue;
        };
        let target = target_dir.join(file_name);
        target_dirs.insert(target_dir);

        if normalize_path(&target) == normalize_path(&media.path) {
            summary.skipped_same_path += 1;
            continue;
        }
        if target.exists() && is_probable_duplicate(&media.path, &target) {
            debug!(source = ?media.path, target = ?target, "Duplicate already in place");
            summary.skipped_duplicates += 1;
            continue;
        }

        let destination = unique_path(&target, &mut taken);
        ops.push(Operation::Move {
            source: media.path,
            destination,
            kind: media.kind,
        });
        summary.moved += 1;
    }

    if delete_sidecars {
        ops.extend(build_sidecar_delete_ops(root));
    }

    let operations = target_dirs
        .into_iter()
        .map(|dir| Operation::MakeDir { dir })
        .chain(ops)
        .collect();
    (operations, summary)
}

/// Rebuild `root` in place, logging every operation to `log_path`
pub fn rebuild_destination(
    root: &Path,
    log_path: &Path,
    options: &RebuildOptions,
) -> Result<RebuildSummary> {
    let root = normalize_path(root);
    let _span = span!(Level::INFO, "rebuild", root = %root.display()).entered();

    let (operations, mut summary) = build_rebuild_operations(&root, options.delete_sidecars);
    info!(
        total = summary.total_files,
        moved = summary.moved,
        skipped_same = summary.skipped_same_path,
        skipped_duplicates = summary.skipped_duplicates,
        "Rebuild planned"
    );

    let mut writer = RunLogWriter::create(log_path, &root, &root)?;
    writer.write_line(&summary.log_line())?;

    let mut on_log_line = |line: &str| {
        if let Err(e) = writer.write_line(line) {
            warn!(error = %e, "Failed to write run log line");
        }
    };

    let report = Executor::new(&mut on_log_line).run(&operations);
    summary.failed = report.failed;

    if options.delete_empty_dirs {
        summary.deleted_empty_dirs = delete_empty_dirs(&root, &mut on_log_line);
    }

    info!(
        moved = summary.moved,
        failed = summary.failed,
        deleted_empty_dirs = summary.deleted_empty_dirs,
        "Rebuild finished"
    );
    Ok(summary)
}

/// Rebuild with a fresh run log under the root
pub fn rebuild(root: &Path, delete_sidecars: bool, delete_empty_dirs: bool) -> Result<RebuildSummary> {
    let log_path = make_log_path(root);
    rebuild_destination(
        root,
        &log_path,
        &RebuildOptions {
            delete_sidecars,
            delete_empty_dirs,
        },
    )
}

/// Remove directories below `root` that hold nothing but housekeeping files
///
/// Children are visited before their parents, so a parent whose only
/// contents were empty subdirectories is removed in the same pass. The
/// root itself is kept. Returns the number of directories removed.
pub fn delete_empty_dirs(root: &Path, on_log_line: &mut dyn FnMut(&str)) -> usize {
    let mut deleted = 0;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir());

    for entry in walker {
        let dir = entry.path();
        // Listed fresh: children removed earlier in this pass are gone
        let Ok(listing) = fs::read_dir(dir) else {
            continue;
        };
        let mut housekeeping = Vec::new();
        let mut has_content = false;
        for child in listing.filter_map(|child| child.ok()) {
            let name = child.file_name();
            let is_file = child.file_type().is_ok_and(|t| t.is_file());
            if is_file && (is_ignorable_file(&name) || is_sidecar(&name)) {
                housekeeping.push(child.path());
            } else {
                has_content = true;
                break;
            }
        }
        if has_content {
            continue;
        }

        for file in &housekeeping {
            if let Err(e) = fs::remove_file(file) {
                debug!(path = ?file, error = %e, "Failed to remove housekeeping file");
            }
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                deleted += 1;
                on_log_line(&format!("rmdir {} [SUCCESS]", dir.display()));
            }
            Err(e) => {
                warn!(path = ?dir, error = %e, "Failed to remove empty directory");
                on_log_line(&format!("rmdir {} [FAIL] reason={}", dir.display(), e));
            }
        }
    }

    deleted
}
