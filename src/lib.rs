//! Media Organizer - sort photos and videos into a dated library
//!
//! This library organizes photos and videos into
//! `<destination>/<YYYY>/<mon>/<pics|videos>/` with support for:
//! - EXIF capture times for images
//! - FFprobe-based creation times for videos, with a plausibility check
//! - File system timestamp fallbacks
//! - Size + mtime duplicate detection
//! - Resuming from the previous run's log
//! - Rebuilding an organized library in place

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod layout;
pub mod media;
pub mod organize;
pub mod plan;
pub mod rebuild;
pub mod run_log;
pub mod scanner;
pub mod status;
pub mod time;
pub mod validate;

pub use cleanup::{CleanupReport, cleanup};
pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use error::{Error, Result, ValidationError};
pub use executor::{ExecutionReport, Executor};
pub use media::{MediaEntry, MediaKind};
pub use organize::{CopyReport, CopyStats, Organizer};
pub use plan::{Operation, Plan, SkipReason, SkippedEntry, build_plan};
pub use rebuild::{RebuildOptions, RebuildSummary, rebuild, rebuild_destination};
pub use run_log::{find_latest_log, load_successful_destinations, make_log_path};
pub use scanner::{MediaScanner, scan};
pub use status::{ExecutionTracker, NodeStatus};
pub use time::{ExtractedTime, TimeSource};
pub use validate::{validate_paths, validate_rebuild_root};
