//! Media classification by file extension
//!
//! Classification never opens the file: the lowercased extension is looked
//! up in two fixed tables and everything else is "not media".

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::time::TimeSource;

/// Image extensions (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "heic", "heif", "webp", "raw",
];

/// Video extensions (lowercase, without the dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "m4v", "wmv", "flv", "webm", "mpeg", "mpg", "3gp",
];

/// OS and volume housekeeping directories that are never descended into
pub const SKIP_DIR_NAMES: &[&str] = &[
    ".Spotlight-V100",
    ".fseventsd",
    ".TemporaryItems",
    "System Volume Information",
];

/// Prefix of hidden companion files written by macOS on foreign volumes
pub const SIDECAR_PREFIX: &str = "._";

/// Folder metadata file that does not keep a directory "non-empty"
pub const IGNORABLE_METADATA_FILE: &str = ".DS_Store";

/// Kind of media, which decides the leaf folder of the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Leaf folder name used under `<year>/<month>/`
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "pics",
            MediaKind::Video => "videos",
        }
    }

    /// Classify an extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A discovered media file with its resolved capture time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub captured_at: NaiveDateTime,
    pub kind: MediaKind,
    /// Which signal produced `captured_at`
    pub time_source: TimeSource,
}

impl MediaEntry {
    pub fn new(
        path: PathBuf,
        captured_at: NaiveDateTime,
        kind: MediaKind,
        time_source: TimeSource,
    ) -> Self {
        Self {
            path,
            captured_at,
            kind,
            time_source,
        }
    }
}

/// True for `._name` sidecar files
pub fn is_sidecar(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(SIDECAR_PREFIX.as_bytes())
}

/// True for housekeeping directory names the scanner prunes
pub fn is_skipped_dir(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| SKIP_DIR_NAMES.contains(&n))
        .unwrap_or(false)
}

/// True for files that may be discarded when judging a directory empty
pub fn is_ignorable_file(name: &OsStr) -> bool {
    name == IGNORABLE_METADATA_FILE || is_sidecar(name)
}
