//! Lazy media discovery over a directory tree
//!
//! The walk keeps its own stack of pending directories, so tree depth is
//! bounded only by memory. Directory order is unspecified. Housekeeping
//! folders are pruned, `._` sidecars are dropped, and directories that
//! cannot be read are skipped.

use crate::media::{MediaEntry, MediaKind, is_sidecar, is_skipped_dir};
use crate::time;
use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Directory progress is re-reported every this many entries
const PROGRESS_EVERY: usize = 200;

type TextSink<'a> = Box<dyn FnMut(&str) + 'a>;

struct OpenDir {
    path: PathBuf,
    entries: ReadDir,
    seen: usize,
}

/// Iterator over the media files below a root directory
///
/// Each call to [`scan`] or [`MediaScanner::new`] starts a fresh walk; no
/// state is shared between walks. Capture times are resolved before an
/// entry is yielded.
pub struct MediaScanner<'a> {
    stack: Vec<PathBuf>,
    current: Option<OpenDir>,
    on_directory: Option<TextSink<'a>>,
    on_debug: Option<TextSink<'a>>,
}

/// Start a walk without progress reporting
pub fn scan(root: &Path) -> MediaScanner<'static> {
    MediaScanner::new(root)
}

impl<'a> MediaScanner<'a> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![root.into()],
            current: None,
            on_directory: None,
            on_debug: None,
        }
    }

    /// Receive `Current Dir - <dir> (entries: <n>)` status messages
    pub fn on_directory(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_directory = Some(Box::new(callback));
        self
    }

    /// Receive low-level `scandir_*` trace lines
    pub fn on_debug(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_debug = Some(Box::new(callback));
        self
    }

    fn report_directory(&mut self, path: &Path, seen: usize) {
        if let Some(callback) = self.on_directory.as_mut() {
            callback(&format!("Current Dir - {} (entries: {})", path.display(), seen));
        }
    }

    fn debug_event(&mut self, line: String) {
        trace!("{}", line);
        if let Some(callback) = self.on_debug.as_mut() {
            callback(&line);
        }
    }

    fn enter(&mut self, path: PathBuf) {
        self.report_directory(&path, 0);
        self.debug_event(format!("scandir_start path={}", path.display()));

        match fs::read_dir(&path) {
            Ok(entries) => {
                self.current = Some(OpenDir {
                    path,
                    entries,
                    seen: 0,
                });
            }
            Err(e) => {
                self.debug_event(format!("scandir_error path={} error={}", path.display(), e));
            }
        }
    }

    fn leave(&mut self, dir: OpenDir) {
        self.report_directory(&dir.path, dir.seen);
        self.debug_event(format!(
            "scandir_end path={} entries={}",
            dir.path.display(),
            dir.seen
        ));
    }

    fn visit(&mut self, entry: DirEntry) -> Option<MediaEntry> {
        // file_type() does not follow symlinks
        let file_type = entry.file_type().ok()?;
        let name = entry.file_name();

        if file_type.is_dir() {
            if is_skipped_dir(&name) {
                self.debug_event(format!("skip_dir path={}", entry.path().display()));
            } else {
                self.stack.push(entry.path());
            }
            return None;
        }

        if !file_type.is_file() || is_sidecar(&name) {
            return None;
        }

        let path = entry.path();
        let kind = MediaKind::from_path(&path)?;
        let resolved = time::resolve(&path, kind);

        Some(MediaEntry::new(path, resolved.timestamp, kind, resolved.source))
    }
}

impl Iterator for MediaScanner<'_> {
    type Item = MediaEntry;

    fn next(&mut self) -> Option<MediaEntry> {
        loop {
            let mut dir = match self.current.take() {
                Some(dir) => dir,
                None => {
                    let path = self.stack.pop()?;
                    self.enter(path);
                    continue;
                }
            };

            let entry = match dir.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    self.debug_event(format!(
                        "scandir_error path={} error={}",
                        dir.path.display(),
                        e
                    ));
                    self.current = Some(dir);
                    continue;
                }
                None => {
                    self.leave(dir);
                    continue;
                }
            };

            dir.seen += 1;
            if dir.seen % PROGRESS_EVERY == 0 {
                self.report_directory(&dir.path, dir.seen);
            }

            let found = self.visit(entry);
            self.current = Some(dir);
            if found.is_some() {
                return found;
            }
        }
    }
}
