//! Video metadata extraction via FFprobe

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Metadata keys to try for creation date
const CREATION_DATE_KEYS: &[&str] = &[
    "creation_time",
    "com.apple.quicktime.creationdate",
    "date",
    "date_recorded",
];

/// How far past "now" or the file's mtime a container date may lie
const PLAUSIBILITY_SLACK_DAYS: i64 = 1;

/// Cached FFprobe availability check
static FFPROBE_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffprobe is available (cached)
fn is_ffprobe_available() -> bool {
    *FFPROBE_AVAILABLE.get_or_init(|| Command::new("ffprobe").arg("-version").output().is_ok())
}

/// Extract creation time from video metadata using FFprobe
///
/// Containers store creation time in UTC; the result is converted to
/// local time so it lines up with file system timestamps.
pub fn extract_video_time(path: &Path) -> Result<NaiveDateTime> {
    if !is_ffprobe_available() {
        return Err(Error::FfprobeNotFound);
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!("Failed to execute ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!(
                "FFprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    trace!(?path, "FFprobe output: {}", json_str);

    let json: Value = serde_json::from_str(&json_str).map_err(|e| Error::VideoMetadata {
        path: path.to_path_buf(),
        message: format!("Failed to parse FFprobe JSON: {}", e),
    })?;

    let utc_time = find_creation_time(&json).ok_or_else(|| Error::VideoMetadata {
        path: path.to_path_buf(),
        message: "No creation time found in video metadata".to_string(),
    })?;

    let local_time = DateTime::<Utc>::from_naive_utc_and_offset(utc_time, Utc)
        .with_timezone(&Local)
        .naive_local();
    debug!(?path, utc_time = %utc_time, local_time = %local_time, "Found video creation time");

    Ok(local_time)
}

/// Look up the creation time in FFprobe JSON: format tags first, then stream tags
fn find_creation_time(json: &Value) -> Option<NaiveDateTime> {
    if let Some(tags) = json.get("format").and_then(|f| f.get("tags"))
        && let Some(dt) = creation_time_from_tags(tags)
    {
        return Some(dt);
    }

    json.get("streams")
        .and_then(|s| s.as_array())?
        .iter()
        .filter_map(|stream| stream.get("tags"))
        .find_map(creation_time_from_tags)
}

fn creation_time_from_tags(tags: &Value) -> Option<NaiveDateTime> {
    for key in CREATION_DATE_KEYS {
        // Try both lowercase and original case
        for tag_key in [key.to_string(), key.to_uppercase()] {
            if let Some(value) = tags.get(&tag_key).and_then(|v| v.as_str())
                && let Some(dt) = parse_video_datetime(value)
            {
                return Some(dt);
            }
        }
    }
    None
}

/// Parse a container datetime into naive UTC
///
/// Values without an offset are taken as UTC.
pub fn parse_video_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    // QuickTime writes offsets without a colon: 2024-01-15T14:30:00+0800
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_utc());
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
    ];
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Guard against bogus camera/container dates
///
/// A metadata time is accepted only if it is at most one day past `now`
/// and at most one day past the file's modification time (when known).
pub fn is_plausible(
    candidate: NaiveDateTime,
    now: NaiveDateTime,
    modified: Option<NaiveDateTime>,
) -> bool {
    let slack = Duration::days(PLAUSIBILITY_SLACK_DAYS);
    if candidate > now + slack {
        return false;
    }
    match modified {
        Some(mtime) => candidate <= mtime + slack,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};
    use serde_json::json;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_video_datetime() {
        // ISO 8601 with Z
        let parsed = parse_video_datetime("2024-01-15T14:30:00Z").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.day(), 15);

        // With microseconds
        let parsed = parse_video_datetime("2024-01-15T14:30:00.000000Z").unwrap();
        assert_eq!(parsed.hour(), 14);

        // With timezone offset - converted to UTC
        let parsed = parse_video_datetime("2024-01-15T14:30:00+08:00").unwrap();
        assert_eq!(parsed.hour(), 6);
        assert_eq!(parsed.minute(), 30);

        // QuickTime offset without colon
        let parsed = parse_video_datetime("2024-01-15T14:30:00+0800").unwrap();
        assert_eq!(parsed.hour(), 6);

        // Without timezone (assumed UTC)
        let parsed = parse_video_datetime("2024-01-15T14:30:00").unwrap();
        assert_eq!(parsed.hour(), 14);

        // Space separator
        let parsed = parse_video_datetime("2024-01-15 14:30:00").unwrap();
        assert_eq!(parsed.year(), 2024);

        assert!(parse_video_datetime("invalid").is_none());
    }

    #[test]
    fn test_find_creation_time_prefers_format_tags() {
        let probe = json!({
            "format": { "tags": { "creation_time": "2002-09-27T10:00:00.000000Z" } },
            "streams": [ { "tags": { "creation_time": "2010-01-01T00:00:00Z" } } ]
        });
        assert_eq!(find_creation_time(&probe), Some(dt(2002, 9, 27, 10, 0, 0)));
    }

    #[test]
    fn test_find_creation_time_in_streams() {
        let probe = json!({
            "format": { "tags": { "encoder": "Lavf" } },
            "streams": [
                { "codec_type": "audio" },
                { "tags": { "CREATION_TIME": "2002-09-27T10:00:00Z" } }
            ]
        });
        assert_eq!(find_creation_time(&probe), Some(dt(2002, 9, 27, 10, 0, 0)));

        assert_eq!(find_creation_time(&json!({ "streams": [] })), None);
    }

    #[test]
    fn test_plausible_metadata_accepted() {
        let now = dt(2026, 10, 17, 12, 0, 0);
        let mtime = dt(2002, 9, 27, 19, 7, 18);
        assert!(is_plausible(dt(2002, 9, 27, 10, 0, 0), now, Some(mtime)));
        // Within one day after mtime is tolerated
        assert!(is_plausible(dt(2002, 9, 28, 19, 7, 18), now, Some(mtime)));
        assert!(is_plausible(dt(2002, 9, 27, 10, 0, 0), now, None));
    }

    #[test]
    fn test_implausible_metadata_rejected() {
        let now = dt(2026, 10, 17, 12, 0, 0);
        let mtime = dt(2002, 9, 27, 19, 7, 18);
        // Camera default far after the file was last written
        assert!(!is_plausible(dt(2026, 2, 22, 14, 28, 47), now, Some(mtime)));
        // More than a day in the future
        assert!(!is_plausible(dt(2026, 10, 19, 12, 0, 0), now, None));
    }
}
