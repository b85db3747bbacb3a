//! Error types for the media organizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media organizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to extract video metadata from {path}: {message}")]
    VideoMetadata { path: PathBuf, message: String },

    #[error("FFprobe not found. Please install FFmpeg and ensure ffprobe is in PATH")]
    FfprobeNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Run log error for {path}: {message}")]
    RunLog { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Pre-flight problems with the source/destination pair.
///
/// These are the only hard-stop errors: they are reported before any
/// scanning starts and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Source is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("Destination is not a directory: {0}")]
    DestinationNotDirectory(PathBuf),

    #[error("Source and destination must be different directories: {0}")]
    SamePath(PathBuf),

    #[error("Source {source_dir} cannot be inside destination directory {destination}")]
    SourceInsideDestination {
        source_dir: PathBuf,
        destination: PathBuf,
    },

    #[error("Destination {destination} cannot be inside source directory {source_dir}")]
    DestinationInsideSource {
        source_dir: PathBuf,
        destination: PathBuf,
    },
}
