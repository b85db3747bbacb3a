//! Configuration for the media organizer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rebuild::RebuildOptions;

/// Settings shared by the organize, rebuild and cleanup commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tree to scan for media
    pub source_dir: Option<PathBuf>,

    /// Root of the organized `YYYY/mon/pics|videos` tree
    pub destination_dir: Option<PathBuf>,

    /// Skip files the latest run log recorded as copied
    pub resume: bool,

    /// Rebuild: delete `._` sidecar files
    pub delete_sidecars: bool,

    /// Rebuild: remove directories left empty after moving
    pub delete_empty_dirs: bool,

    /// Debug logging, including scanner directory events
    pub debug: bool,

    /// Cleanup: files smaller than this many KiB are deleted
    pub cleanup_threshold_kb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: None,
            destination_dir: None,
            resume: true,
            delete_sidecars: true,
            delete_empty_dirs: false,
            debug: false,
            cleanup_threshold_kb: 1,
        }
    }
}

impl Config {
    pub fn rebuild_options(&self) -> RebuildOptions {
        RebuildOptions {
            delete_sidecars: self.delete_sidecars,
            delete_empty_dirs: self.delete_empty_dirs,
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Media Organizer Configuration File
# This file uses TOML format (https://toml.io)

# Tree to scan for photos and videos
source_dir = "/Volumes/Card/DCIM"

# Organized library: <destination>/<YYYY>/<jan..dec>/<pics|videos>/
destination_dir = "/Volumes/Backup/Media"

# Skip files that the latest run log in the destination recorded as copied
resume = true

# Rebuild only: delete macOS "._" sidecar files
delete_sidecars = true

# Rebuild only: remove directories that are empty after files were moved
delete_empty_dirs = false

# Debug logging, including per-directory scan events
debug = false

# Cleanup only: delete files smaller than this many KB
cleanup_threshold_kb = 1
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError { source: toml::ser::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
