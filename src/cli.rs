//! CLI argument parsing with clap

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Media Organizer - sort photos and videos into a dated library
///
/// Copies media into `<destination>/<YYYY>/<mon>/<pics|videos>/` using the
/// best available capture time (EXIF, video metadata, file timestamps),
/// resuming from the last run log, and can rebuild an existing library
/// in place.
#[derive(Parser, Debug)]
#[command(name = "media-organizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging and scanner events)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Copy media from a source tree into the organized destination
    Organize {
        /// Directory to scan for photos and videos
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Root of the organized library
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Ignore previous run logs and re-plan every file
        #[arg(long)]
        no_resume: bool,

        /// Print the plan without copying anything
        #[arg(long)]
        plan_only: bool,
    },

    /// Re-sort an existing library in place
    Rebuild {
        /// Library root to rebuild
        dest: Option<PathBuf>,

        /// Do not delete macOS "._" sidecar files
        #[arg(long)]
        keep_sidecars: bool,

        /// Remove directories left empty after the rebuild
        #[arg(long)]
        delete_empty_dirs: bool,
    },

    /// Delete files smaller than a size threshold
    Cleanup {
        /// Root directory to scan
        root: PathBuf,

        /// Delete files smaller than this size in KB
        #[arg(long)]
        threshold_kb: Option<u64>,

        /// Show files that would be deleted without deleting them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Write a sample configuration file
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "media-organizer.toml")]
        path: PathBuf,
    },
}

impl Command {
    /// Name used for the diagnostic log file
    pub fn log_name(&self) -> &'static str {
        match self {
            Command::Organize { .. } => "Organize",
            Command::Rebuild { .. } => "Rebuild",
            Command::Cleanup { .. } => "Cleanup",
            Command::InitConfig { .. } => "InitConfig",
        }
    }
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        match &self.command {
            Command::Organize {
                source,
                dest,
                no_resume,
                ..
            } => {
                if let Some(source) = source {
                    config.source_dir = Some(source.clone());
                }
                if let Some(dest) = dest {
                    config.destination_dir = Some(dest.clone());
                }
                if *no_resume {
                    config.resume = false;
                }
            }
            Command::Rebuild {
                dest,
                keep_sidecars,
                delete_empty_dirs,
            } => {
                if let Some(dest) = dest {
                    config.destination_dir = Some(dest.clone());
                }
                if *keep_sidecars {
                    config.delete_sidecars = false;
                }
                if *delete_empty_dirs {
                    config.delete_empty_dirs = true;
                }
            }
            Command::Cleanup { threshold_kb, .. } => {
                if let Some(threshold_kb) = threshold_kb {
                    config.cleanup_threshold_kb = *threshold_kb;
                }
            }
            Command::InitConfig { .. } => {}
        }

        if self.verbose {
            config.debug = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
