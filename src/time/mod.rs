//! Capture time resolution
//!
//! Every media file gets a best-effort capture timestamp:
//! - Images: EXIF date tags
//! - Videos: container creation metadata, if plausible, else modification time
//! - Anything left: birth time, modification time, then metadata change time
//!
//! The individual readers are fallible and return `Result`; `resolve`
//! absorbs those failures and always produces a timestamp.

pub mod exif;
pub mod video;

use crate::media::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Source of the resolved timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// EXIF metadata
    Exif,
    /// Video container metadata via FFprobe
    VideoMetadata,
    /// File system birth time
    Birth,
    /// File system modification time
    Modified,
    /// File system metadata change time
    Changed,
    /// Nothing was readable; the current time was used
    Now,
}

/// Result of timestamp resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedTime {
    /// The resolved timestamp, in local time
    pub timestamp: NaiveDateTime,
    /// Source of the timestamp
    pub source: TimeSource,
}

impl ExtractedTime {
    fn new(timestamp: NaiveDateTime, source: TimeSource) -> Self {
        Self { timestamp, source }
    }
}

/// Resolve the capture time of a media file. Never fails.
pub fn resolve(path: &Path, kind: MediaKind) -> ExtractedTime {
    match kind {
        MediaKind::Image => match exif::extract_exif_time(path) {
            Ok(time) => {
                debug!(?path, "Resolved time from EXIF");
                return ExtractedTime::new(time, TimeSource::Exif);
            }
            Err(e) => debug!(?path, error = %e, "No EXIF time, using file system time"),
        },
        MediaKind::Video => {
            let metadata_time = match video::extract_video_time(path) {
                Ok(time) => Some(time),
                Err(e) => {
                    debug!(?path, error = %e, "No video metadata time");
                    None
                }
            };
            let modified = fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(to_local);

            if let Some(time) = metadata_time {
                if video::is_plausible(time, Local::now().naive_local(), modified) {
                    debug!(?path, "Resolved time from video metadata");
                    return ExtractedTime::new(time, TimeSource::VideoMetadata);
                }
                warn!(?path, metadata_time = %time, "Implausible video metadata time, ignoring");
            }

            // Container metadata is unreliable enough that mtime beats birth time
            if let Some(time) = modified {
                return ExtractedTime::new(time, TimeSource::Modified);
            }
        }
    }

    filesystem_time(path)
}

/// Generic fallback: birth time, then modification time, then change time
pub fn filesystem_time(path: &Path) -> ExtractedTime {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!(?path, error = %e, "Cannot stat file, using current time");
            return ExtractedTime::new(Local::now().naive_local(), TimeSource::Now);
        }
    };

    if let Ok(created) = metadata.created() {
        return ExtractedTime::new(to_local(created), TimeSource::Birth);
    }
    if let Ok(modified) = metadata.modified() {
        return ExtractedTime::new(to_local(modified), TimeSource::Modified);
    }
    if let Some(changed) = changed_time(&metadata) {
        return ExtractedTime::new(changed, TimeSource::Changed);
    }

    warn!(?path, "No usable file system timestamp, using current time");
    ExtractedTime::new(Local::now().naive_local(), TimeSource::Now)
}

/// Convert a system time to a naive local timestamp
pub fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(unix)]
fn changed_time(metadata: &Metadata) -> Option<NaiveDateTime> {
    use std::os::unix::fs::MetadataExt;

    DateTime::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32)
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

#[cfg(not(unix))]
fn changed_time(_metadata: &Metadata) -> Option<NaiveDateTime> {
    None
}
