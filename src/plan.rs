//! Copy planning
//!
//! Turns scanned media into an ordered operation list: every `MakeDir`
//! first (sorted by path), then file operations in discovery order.
//! Files a prior run already copied, and files whose destination holds a
//! probable duplicate, are recorded as skipped instead.

use crate::layout::{layout_dir, unique_path};
use crate::media::{MediaEntry, MediaKind};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{Level, debug, info, span};

/// A single file system action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a directory and any missing ancestors
    MakeDir { dir: PathBuf },
    /// Copy content and metadata to a new path
    Copy {
        source: PathBuf,
        destination: PathBuf,
        kind: MediaKind,
    },
    /// Relocate a file
    Move {
        source: PathBuf,
        destination: PathBuf,
        kind: MediaKind,
    },
    /// Remove a file if present
    Delete { path: PathBuf },
}

impl Operation {
    /// Verb used in run log lines
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::MakeDir { .. } => "mkdir",
            Operation::Copy { .. } => "copy",
            Operation::Move { .. } => "move",
            Operation::Delete { .. } => "delete",
        }
    }

    /// Path the operation creates, writes or removes
    pub fn destination(&self) -> &Path {
        match self {
            Operation::MakeDir { dir } => dir,
            Operation::Copy { destination, .. } | Operation::Move { destination, .. } => {
                destination
            }
            Operation::Delete { path } => path,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        match self {
            Operation::Copy { source, .. } | Operation::Move { source, .. } => Some(source),
            Operation::MakeDir { .. } | Operation::Delete { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Operation::Copy { kind, .. } | Operation::Move { kind, .. } => Some(*kind),
            Operation::MakeDir { .. } | Operation::Delete { .. } => None,
        }
    }
}

/// A directory the plan will ensure exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDirectory {
    pub path: PathBuf,
    /// Snapshot taken while planning; not re-checked at execution
    pub existed: bool,
}

/// Why a file was left out of the copy operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A prior run logged this destination as copied
    Resume,
    /// Destination already holds a file with the same size and mtime
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub reason: SkipReason,
}

/// Planned operations plus summary counts
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub directories: Vec<PlannedDirectory>,
    pub skipped: Vec<SkippedEntry>,
    /// Media files seen by the scan
    pub total_found: usize,
    /// Files that will be copied
    pub total_files: usize,
    pub total_images: usize,
    pub total_videos: usize,
    pub total_dirs: usize,
    pub total_skipped: usize,
    pub skipped_resume: usize,
    pub skipped_duplicates: usize,
    pub scan_duration: Option<Duration>,
    pub resume_requested: bool,
}

impl Plan {
    /// Record how long the scan took and whether resume data was consulted
    pub fn with_scan_stats(mut self, scan_duration: Duration, resume_requested: bool) -> Self {
        self.scan_duration = Some(scan_duration);
        self.resume_requested = resume_requested;
        self
    }

    /// File operations, without directory creation
    pub fn file_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| !matches!(op, Operation::MakeDir { .. }))
    }

    pub fn summary(&self) -> String {
        format!(
            "Found: {} (images: {}, videos: {}), To copy: {}, Directories: {}, Skipped: {} (resume: {}, duplicates: {})",
            self.total_found,
            self.total_images,
            self.total_videos,
            self.total_files,
            self.total_dirs,
            self.total_skipped,
            self.skipped_resume,
            self.skipped_duplicates
        )
    }
}

/// Cheap duplicate check: identical size and identical modification time
///
/// Content is never read. Either file being unreadable means "not a duplicate".
pub fn is_probable_duplicate(source: &Path, destination: &Path) -> bool {
    let (Ok(src), Ok(dst)) = (fs::metadata(source), fs::metadata(destination)) else {
        return false;
    };
    if src.len() != dst.len() {
        return false;
    }
    match (src.modified(), dst.modified()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Build a copy plan for scanned media
///
/// `prior_successes` holds destinations a previous run logged as copied;
/// entries are matched against their un-suffixed base destination.
pub fn build_plan<I>(entries: I, destination_root: &Path, prior_successes: &HashSet<PathBuf>) -> Plan
where
    I: IntoIterator<Item = MediaEntry>,
{
    let _span = span!(Level::INFO, "build_plan", destination = %destination_root.display()).entered();

    let mut plan = Plan::default();
    let mut copy_ops = Vec::new();
    let mut target_dirs: BTreeSet<PathBuf> = BTreeSet::new();
    let mut taken: HashSet<PathBuf> = HashSet::new();

    for media in entries {
        plan.total_found += 1;
        match media.kind {
            MediaKind::Image => plan.total_images += 1,
            MediaKind::Video => plan.total_videos += 1,
        }

        let target_dir = layout_dir(destination_root, &media.captured_at, media.kind);
        let Some(file_name) = media.path.file_name() else {
            continue;
        };
        let base = target_dir.join(file_name);
        target_dirs.insert(target_dir);

        if prior_successes.contains(&base) {
            debug!(source = ?media.path, destination = ?base, "Already copied by a prior run");
            // The file may be gone from disk; keep later entries off its path
            taken.insert(base.clone());
            plan.skipped_resume += 1;
            plan.skipped.push(SkippedEntry {
                source: media.path,
                destination: base,
                reason: SkipReason::Resume,
            });
            continue;
        }

        if base.exists() && is_probable_duplicate(&media.path, &base) {
            debug!(source = ?media.path, destination = ?base, "Probable duplicate at destination");
            taken.insert(base.clone());
            plan.skipped_duplicates += 1;
            plan.skipped.push(SkippedEntry {
                source: media.path,
                destination: base,
                reason: SkipReason::Duplicate,
            });
            continue;
        }

        let destination = unique_path(&base, &mut taken);
        copy_ops.push(Operation::Copy {
            source: media.path,
            destination,
            kind: media.kind,
        });
        plan.total_files += 1;
    }

    plan.total_skipped = plan.skipped_resume + plan.skipped_duplicates;
    plan.total_dirs = target_dirs.len();
    plan.directories = target_dirs
        .iter()
        .map(|dir| PlannedDirectory {
            path: dir.clone(),
            existed: dir.exists(),
        })
        .collect();
    plan.operations = target_dirs
        .into_iter()
        .map(|dir| Operation::MakeDir { dir })
        .chain(copy_ops)
        .collect();

    info!("{}", plan.summary());
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeSource;
    use chrono::{NaiveDate, NaiveDateTime};
    use filetime::FileTime;
    use tempfile::tempdir;

    fn entry(path: PathBuf, captured_at: NaiveDateTime, kind: MediaKind) -> MediaEntry {
        MediaEntry::new(path, captured_at, kind, TimeSource::Exif)
    }

    fn sep_27() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2002, 9, 27)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn copy_mtime(from: &Path, to: &Path) {
        let meta = fs::metadata(from).unwrap();
        filetime::set_file_mtime(to, FileTime::from_last_modification_time(&meta)).unwrap();
    }

    #[test]
    fn test_build_plan_basic() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let entries = vec![
            entry(dir.path().join("a.jpg"), sep_27(), MediaKind::Image),
            entry(dir.path().join("b.mp4"), sep_27(), MediaKind::Video),
        ];

        let plan = build_plan(entries, &dest, &HashSet::new());
        assert_eq!(plan.total_found, 2);
        assert_eq!(plan.total_files, 2);
        assert_eq!(plan.total_images, 1);
        assert_eq!(plan.total_videos, 1);
        assert_eq!(plan.total_dirs, 2);
        assert_eq!(
            plan.operations,
            vec![
                Operation::MakeDir { dir: dest.join("2002/sep/pics") },
                Operation::MakeDir { dir: dest.join("2002/sep/videos") },
                Operation::Copy {
                    source: dir.path().join("a.jpg"),
                    destination: dest.join("2002/sep/pics/a.jpg"),
                    kind: MediaKind::Image,
                },
                Operation::Copy {
                    source: dir.path().join("b.mp4"),
                    destination: dest.join("2002/sep/videos/b.mp4"),
                    kind: MediaKind::Video,
                },
            ]
        );
        assert!(plan.directories.iter().all(|d| !d.existed));
    }

    #[test]
    fn test_make_dirs_sorted_before_copies() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let at = |y, m| {
            NaiveDate::from_ymd_opt(y, m, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let entries = vec![
            entry(dir.path().join("z.jpg"), at(2010, 5), MediaKind::Image),
            entry(dir.path().join("y.jpg"), at(2001, 1), MediaKind::Image),
            entry(dir.path().join("x.mov"), at(2005, 3), MediaKind::Video),
        ];

        let plan = build_plan(entries, &dest, &HashSet::new());
        let dirs: Vec<_> = plan.operations[..3]
            .iter()
            .map(|op| op.destination().to_path_buf())
            .collect();
        assert_eq!(
            dirs,
            vec![
                dest.join("2001/jan/pics"),
                dest.join("2005/mar/videos"),
                dest.join("2010/may/pics"),
            ]
        );
        let copies: Vec<_> = plan
            .file_operations()
            .map(|op| op.source().unwrap().file_name().unwrap().to_owned())
            .collect();
        assert_eq!(copies, vec!["z.jpg", "y.jpg", "x.mov"]);
    }

    #[test]
    fn test_build_plan_skips_resume() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let media = entry(dir.path().join("a.jpg"), sep_27(), MediaKind::Image);
        let prior = HashSet::from([dest.join("2002/sep/pics/a.jpg")]);

        let plan = build_plan([media], &dest, &prior);
        assert_eq!(plan.total_files, 0);
        assert_eq!(plan.skipped_resume, 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::Resume);
        // The directory is still planned so the preview tree can show the skip
        assert_eq!(plan.total_dirs, 1);
    }

    #[test]
    fn test_build_plan_skips_duplicate() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let source = dir.path().join("a.jpg");
        let target = dest.join("2002/sep/pics/a.jpg");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&source, b"abc").unwrap();
        fs::write(&target, b"abc").unwrap();
        copy_mtime(&source, &target);

        let plan = build_plan(
            [entry(source, sep_27(), MediaKind::Image)],
            &dest,
            &HashSet::new(),
        );
        assert_eq!(plan.total_files, 0);
        assert_eq!(plan.skipped_duplicates, 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::Duplicate);
        assert!(plan.directories[0].existed);
    }

    #[test]
    fn test_existing_different_file_is_suffixed() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let source = dir.path().join("a.jpg");
        let target = dest.join("2002/sep/pics/a.jpg");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&source, b"abc").unwrap();
        fs::write(&target, b"abcd").unwrap();

        let plan = build_plan(
            [entry(source, sep_27(), MediaKind::Image)],
            &dest,
            &HashSet::new(),
        );
        assert_eq!(plan.total_files, 1);
        assert_eq!(
            plan.file_operations().next().unwrap().destination(),
            dest.join("2002/sep/pics/a_1.jpg")
        );
    }

    #[test]
    fn test_same_name_sources_get_distinct_destinations() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let entries = (0..3).map(|i| {
            entry(
                dir.path().join(format!("card{}", i)).join("IMG_0001.JPG"),
                sep_27(),
                MediaKind::Image,
            )
        });

        let plan = build_plan(entries, &dest, &HashSet::new());
        let targets: Vec<_> = plan
            .file_operations()
            .map(|op| op.destination().file_name().unwrap().to_owned())
            .collect();
        assert_eq!(targets, vec!["IMG_0001.JPG", "IMG_0001_1.JPG", "IMG_0001_2.JPG"]);
    }

    #[test]
    fn test_resume_ignores_suffixed_prior_copy() {
        // A prior run logged only the suffixed copy of the second "a.jpg".
        // Resume matches base paths, so that file is planned again.
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let pics = dest.join("2002/sep/pics");
        fs::create_dir_all(&pics).unwrap();
        fs::write(pics.join("a_1.jpg"), b"second").unwrap();
        let entries = vec![
            entry(dir.path().join("x/a.jpg"), sep_27(), MediaKind::Image),
            entry(dir.path().join("y/a.jpg"), sep_27(), MediaKind::Image),
        ];
        let prior = HashSet::from([pics.join("a_1.jpg")]);

        let plan = build_plan(entries, &dest, &prior);
        assert_eq!(plan.skipped_resume, 0);
        let targets: Vec<_> = plan
            .file_operations()
            .map(|op| op.destination().to_path_buf())
            .collect();
        assert_eq!(targets, vec![pics.join("a.jpg"), pics.join("a_2.jpg")]);
    }

    #[test]
    fn test_resume_skip_reserves_missing_destination() {
        // Logged as copied, then removed from the library
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let pics = dest.join("2002/sep/pics");
        let entries = vec![
            entry(dir.path().join("s/a_1.jpg"), sep_27(), MediaKind::Image),
            entry(dir.path().join("x/a.jpg"), sep_27(), MediaKind::Image),
            entry(dir.path().join("y/a.jpg"), sep_27(), MediaKind::Image),
        ];
        let prior = HashSet::from([pics.join("a_1.jpg")]);

        let plan = build_plan(entries, &dest, &prior);
        assert_eq!(plan.skipped_resume, 1);
        assert_eq!(plan.skipped[0].destination, pics.join("a_1.jpg"));
        let targets: Vec<_> = plan
            .file_operations()
            .map(|op| op.destination().to_path_buf())
            .collect();
        assert_eq!(targets, vec![pics.join("a.jpg"), pics.join("a_2.jpg")]);
    }

    #[test]
    fn test_skipped_destinations_never_copied() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let entries = vec![
            entry(dir.path().join("x/a.jpg"), sep_27(), MediaKind::Image),
            entry(dir.path().join("b.jpg"), sep_27(), MediaKind::Image),
        ];
        let prior = HashSet::from([dest.join("2002/sep/pics/a.jpg")]);

        let plan = build_plan(entries, &dest, &prior);
        let skipped: HashSet<_> = plan.skipped.iter().map(|s| s.destination.clone()).collect();
        assert!(
            plan.file_operations()
                .all(|op| !skipped.contains(op.destination()))
        );
    }

    #[test]
    fn test_probable_duplicate_heuristic() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"abc").unwrap();
        fs::write(&dst, b"xyz").unwrap();
        copy_mtime(&src, &dst);
        // Same size and mtime: content is not compared
        assert!(is_probable_duplicate(&src, &dst));

        // Any mtime change breaks the match
        let meta = fs::metadata(&src).unwrap();
        let mtime = FileTime::from_last_modification_time(&meta);
        let shifted = FileTime::from_unix_time(mtime.unix_seconds() + 1, mtime.nanoseconds());
        filetime::set_file_mtime(&dst, shifted).unwrap();
        assert!(!is_probable_duplicate(&src, &dst));

        // Any size change breaks the match
        fs::write(&dst, b"abcd").unwrap();
        copy_mtime(&src, &dst);
        assert!(!is_probable_duplicate(&src, &dst));

        assert!(!is_probable_duplicate(&src, &dir.path().join("missing.jpg")));
    }

    #[test]
    fn test_with_scan_stats() {
        let plan = Plan::default().with_scan_stats(Duration::from_millis(1500), true);
        assert_eq!(plan.scan_duration, Some(Duration::from_millis(1500)));
        assert!(plan.resume_requested);
    }
}
