//! Run log and resume store
//!
//! One plain-text file per run under the destination root. The first line
//! is `SOURCE -> DEST: <source> -> <destination>`, followed by one line per
//! executed operation in the executor's log format. A later run reads the
//! newest log back to find the destinations already copied.

use crate::error::{Error, Result};
use crate::layout::unique_path;
use chrono::Local;
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const HEADER_PREFIX: &str = "SOURCE -> DEST: ";
const LOG_EXTENSION: &str = "log";

static HEADER_PATTERN: OnceLock<Regex> = OnceLock::new();
static COPY_SUCCESS_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Header payload splits at the last ` -> `
fn header_pattern() -> &'static Regex {
    HEADER_PATTERN.get_or_init(|| Regex::new(r"^SOURCE -> DEST: (.+) -> (.+)$").unwrap())
}

/// Copy payload splits at the first ` -> `
fn copy_success_pattern() -> &'static Regex {
    COPY_SUCCESS_PATTERN.get_or_init(|| Regex::new(r"^copy (.+?) -> (.+) \[SUCCESS\]$").unwrap())
}

/// Header line for a run between two roots
pub fn format_header(source: &Path, destination: &Path) -> String {
    format!(
        "{}{} -> {}",
        HEADER_PREFIX,
        source.display(),
        destination.display()
    )
}

/// Canonicalize paths that exist, absolutize the rest
///
/// For a missing path the deepest existing ancestor is still resolved, so
/// a symlinked parent compares equal to its target.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    while let (Some(parent), Some(name)) = (current.parent(), current.file_name()) {
        tail.push(name);
        if let Ok(base) = fs::canonicalize(parent) {
            return tail.iter().rev().fold(base, |acc, name| acc.join(name));
        }
        current = parent;
    }
    absolute
}

/// Fresh `<YYYYmmdd_HHMMSS>.log` path under the destination root
///
/// A name already on disk gets the usual `_1`, `_2`, ... suffix.
pub fn make_log_path(destination_root: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let candidate = destination_root.join(format!("{}.{}", stamp, LOG_EXTENSION));
    unique_path(&candidate, &mut HashSet::new())
}

/// Newest run log directly under the destination root
///
/// Log names are timestamps, so the lexicographically last name is the
/// most recent run.
pub fn find_latest_log(destination_root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(destination_root).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == LOG_EXTENSION))
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}

/// Destinations a prior run copied successfully
///
/// When an expected root is given and the log header names a different
/// one (after normalization), nothing is returned. A log that cannot be
/// read yields an empty set; a malformed header skips the check.
pub fn load_successful_destinations(
    log_path: &Path,
    expected_source: Option<&Path>,
    expected_destination: Option<&Path>,
) -> HashSet<PathBuf> {
    let bytes = match fs::read(log_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = ?log_path, error = %e, "Cannot read run log, resuming from nothing");
            return HashSet::new();
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let mut lines = content.lines();

    if let Some(header) = lines.next() {
        if let Some(caps) = header_pattern().captures(header.trim_end()) {
            let logged_source = Path::new(&caps[1]);
            let logged_destination = Path::new(&caps[2]);

            if !same_location(expected_source, logged_source)
                || !same_location(expected_destination, logged_destination)
            {
                info!(path = ?log_path, "Run log belongs to a different source/destination pair");
                return HashSet::new();
            }
        } else {
            debug!(path = ?log_path, "Run log has no header line");
        }
    }

    let destinations: HashSet<PathBuf> = lines
        .filter_map(|line| copy_success_pattern().captures(line.trim()))
        .map(|caps| PathBuf::from(&caps[2]))
        .collect();

    debug!(path = ?log_path, count = destinations.len(), "Loaded prior successes");
    destinations
}

fn same_location(expected: Option<&Path>, logged: &Path) -> bool {
    match expected {
        Some(expected) => normalize_path(expected) == normalize_path(logged),
        None => true,
    }
}

/// Append-only writer for one run's log
///
/// The header is written on creation and every line is flushed as soon
/// as it is written. The file closes when the writer is dropped.
pub struct RunLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLogWriter {
    pub fn create(path: &Path, source: &Path, destination: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| run_log_error(path, e))?;
        }
        let file = File::create(path).map_err(|e| run_log_error(path, e))?;

        let mut log = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        log.write_line(&format_header(source, destination))?;
        info!(path = ?log.path, "Run log opened");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|()| self.writer.flush())
            .map_err(|e| run_log_error(&self.path, e))
    }
}

fn run_log_error(path: &Path, e: std::io::Error) -> Error {
    Error::RunLog {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_successful_destinations() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();

        let log = dir.path().join("run.log");
        fs::write(
            &log,
            format!(
                "SOURCE -> DEST: {src} -> {dst}\n\
                 mkdir /tmp/whatever [SUCCESS]\n\
                 copy /a/b.jpg -> {dst}/2002/sep/pics/b.jpg [SUCCESS]\n\
                 copy /a/c.jpg -> {dst}/2002/sep/pics/c.jpg [FAIL] reason=oops\n\
                 move /a/d.jpg -> {dst}/2002/sep/pics/d.jpg [SUCCESS]\n",
                src = src.display(),
                dst = dst.display()
            ),
        )
        .unwrap();

        let results = load_successful_destinations(&log, Some(&src), Some(&dst));
        assert_eq!(results, HashSet::from([dst.join("2002/sep/pics/b.jpg")]));
    }

    #[test]
    fn test_header_mismatch_refuses_resume() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        fs::write(
            &log,
            "SOURCE -> DEST: /other/src -> /other/dst\n\
             copy /a/b.jpg -> /other/dst/2002/sep/pics/b.jpg [SUCCESS]\n",
        )
        .unwrap();

        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        assert!(load_successful_destinations(&log, Some(&src), Some(&dst)).is_empty());
        // Only the destination mismatches
        assert!(load_successful_destinations(&log, None, Some(&dst)).is_empty());
        // No expectations: every success counts
        assert_eq!(load_successful_destinations(&log, None, None).len(), 1);
    }

    #[test]
    fn test_header_splits_at_last_arrow() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        fs::write(
            &log,
            "SOURCE -> DEST: /media/a -> b -> /backup\n\
             copy /media/a -> b/x.jpg -> /backup/2002/sep/pics/x.jpg [SUCCESS]\n",
        )
        .unwrap();

        let results = load_successful_destinations(
            &log,
            Some(Path::new("/media/a -> b")),
            Some(Path::new("/backup")),
        );
        // Copy lines split at the first arrow
        assert_eq!(
            results,
            HashSet::from([PathBuf::from("b/x.jpg -> /backup/2002/sep/pics/x.jpg")])
        );
    }

    #[test]
    fn test_malformed_header_is_tolerated() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        fs::write(
            &log,
            "garbage first line\ncopy /a.jpg -> /d/2002/sep/pics/a.jpg [SUCCESS]\n",
        )
        .unwrap();

        let results = load_successful_destinations(&log, Some(Path::new("/s")), Some(Path::new("/d")));
        assert_eq!(results, HashSet::from([PathBuf::from("/d/2002/sep/pics/a.jpg")]));
    }

    #[test]
    fn test_missing_log_yields_empty_set() {
        let dir = tempdir().unwrap();
        assert!(load_successful_destinations(&dir.path().join("none.log"), None, None).is_empty());
    }

    #[test]
    fn test_find_latest_log() {
        let dir = tempdir().unwrap();
        assert_eq!(find_latest_log(dir.path()), None);

        fs::write(dir.path().join("20240101_120000.log"), "").unwrap();
        fs::write(dir.path().join("20240301_080000.log"), "").unwrap();
        fs::write(dir.path().join("20240301_080000_1.log"), "").unwrap();
        fs::write(dir.path().join("zzz.txt"), "").unwrap();
        fs::create_dir(dir.path().join("zzz.log")).unwrap();

        assert_eq!(
            find_latest_log(dir.path()),
            Some(dir.path().join("20240301_080000_1.log"))
        );
        assert_eq!(find_latest_log(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_make_log_path_is_fresh() {
        let dir = tempdir().unwrap();
        let first = make_log_path(dir.path());
        assert_eq!(first.parent(), Some(dir.path()));
        assert_eq!(first.extension().unwrap(), "log");
        // e.g. 20240301_080000
        assert_eq!(first.file_stem().unwrap().len(), 15);

        fs::write(&first, "").unwrap();
        let second = make_log_path(dir.path());
        assert_ne!(first, second);
        assert!(!second.exists());
    }

    #[test]
    fn test_writer_round_trip() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        let log_path = dst.join("20240101_000000.log");

        let mut writer = RunLogWriter::create(&log_path, &src, &dst).unwrap();
        let copied = dst.join("2002/sep/pics/a.jpg");
        writer
            .write_line(&format!("copy {} -> {} [SUCCESS]", src.join("a.jpg").display(), copied.display()))
            .unwrap();

        // Flushed while still open
        let text = fs::read_to_string(&log_path).unwrap();
        assert!(text.starts_with(&format_header(&src, &dst)));
        drop(writer);

        let results = load_successful_destinations(&log_path, Some(&src), Some(&dst));
        assert_eq!(results, HashSet::from([copied]));
        assert_eq!(find_latest_log(&dst), Some(log_path));
    }

    #[test]
    fn test_normalize_path() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir(&nested).unwrap();

        assert_eq!(normalize_path(&nested.join("../a")), normalize_path(&nested));
        assert!(normalize_path(Path::new("relative/missing")).is_absolute());
    }
}
