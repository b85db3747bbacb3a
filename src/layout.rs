//! Destination layout: `<root>/<YYYY>/<mon>/<pics|videos>/<name>`

use crate::media::MediaKind;
use chrono::{Datelike, NaiveDateTime};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Three-letter lowercase month names
pub const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Three-letter month folder name for a timestamp
pub fn month_name(timestamp: &NaiveDateTime) -> &'static str {
    MONTH_NAMES[timestamp.month0() as usize]
}

/// Target directory for a media file. Pure, no file system access.
pub fn layout_dir(root: &Path, timestamp: &NaiveDateTime, kind: MediaKind) -> PathBuf {
    root.join(format!("{:04}", timestamp.year()))
        .join(month_name(timestamp))
        .join(kind.folder_name())
}

/// Reserve a destination that collides with neither `taken` nor the disk
///
/// The candidate itself is used when free; otherwise `_1`, `_2`, ... is
/// inserted before the extension and the first free name wins. The
/// returned path is added to `taken`.
pub fn unique_path(candidate: &Path, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if is_free(candidate, taken) {
        taken.insert(candidate.to_path_buf());
        return candidate.to_path_buf();
    }

    let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
    let stem = candidate.file_stem().unwrap_or_default();
    let extension = candidate.extension();

    let mut counter: u64 = 1;
    loop {
        let mut name = OsString::from(stem);
        name.push(format!("_{}", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let path = parent.join(name);
        if is_free(&path, taken) {
            taken.insert(path.clone());
            return path;
        }
        counter += 1;
    }
}

fn is_free(path: &Path, taken: &HashSet<PathBuf>) -> bool {
    !taken.contains(path) && !path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn dt(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_layout_dir() {
        let root = Path::new("/dest");
        assert_eq!(
            layout_dir(root, &dt(2002, 9, 27), MediaKind::Image),
            PathBuf::from("/dest/2002/sep/pics")
        );
        assert_eq!(
            layout_dir(root, &dt(1999, 12, 31), MediaKind::Video),
            PathBuf::from("/dest/1999/dec/videos")
        );
        assert_eq!(
            layout_dir(root, &dt(2024, 1, 1), MediaKind::Image),
            PathBuf::from("/dest/2024/jan/pics")
        );
    }

    #[test]
    fn test_layout_dir_depends_only_on_year_month_kind() {
        let root = Path::new("/dest");
        let morning = dt(2002, 9, 1);
        let evening = NaiveDate::from_ymd_opt(2002, 9, 30)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(
            layout_dir(root, &morning, MediaKind::Video),
            layout_dir(root, &evening, MediaKind::Video)
        );
        assert_eq!(
            layout_dir(root, &morning, MediaKind::Image),
            layout_dir(root, &morning, MediaKind::Image)
        );
    }

    #[test]
    fn test_all_month_names() {
        for (i, name) in MONTH_NAMES.iter().enumerate() {
            assert_eq!(month_name(&dt(2020, i as u32 + 1, 1)), *name);
        }
    }

    #[test]
    fn test_unique_path_sequence_within_plan() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("IMG_0001.JPG");
        let mut taken = HashSet::new();

        let first = unique_path(&candidate, &mut taken);
        let second = unique_path(&candidate, &mut taken);
        let third = unique_path(&candidate, &mut taken);

        assert_eq!(first, candidate);
        assert_eq!(second, dir.path().join("IMG_0001_1.JPG"));
        assert_eq!(third, dir.path().join("IMG_0001_2.JPG"));
        assert_eq!(taken.len(), 3);
    }

    #[test]
    fn test_unique_path_skips_existing_files() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("a.jpg");
        std::fs::write(&candidate, b"x").unwrap();
        std::fs::write(dir.path().join("a_1.jpg"), b"x").unwrap();

        let mut taken = HashSet::new();
        assert_eq!(unique_path(&candidate, &mut taken), dir.path().join("a_2.jpg"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempdir().unwrap();
        let candidate = dir.path().join("README");
        let mut taken = HashSet::new();
        taken.insert(candidate.clone());

        assert_eq!(unique_path(&candidate, &mut taken), dir.path().join("README_1"));
    }
}
