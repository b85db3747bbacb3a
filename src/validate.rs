//! Pre-flight checks on the source and destination roots
//!
//! These are the only hard-stop errors. Both roots are normalized first,
//! so `..` components and symlinked roots cannot hide a nesting.

use crate::error::ValidationError;
use crate::run_log::normalize_path;
use std::path::Path;

/// Check that a copy from `source` into `destination` is safe to start
///
/// The source must be an existing directory. The destination may not
/// exist yet, but if it does it must be a directory. Neither may contain
/// the other.
pub fn validate_paths(source: &Path, destination: &Path) -> Result<(), ValidationError> {
    if !source.is_dir() {
        return Err(ValidationError::SourceNotDirectory(source.to_path_buf()));
    }
    if destination.exists() && !destination.is_dir() {
        return Err(ValidationError::DestinationNotDirectory(
            destination.to_path_buf(),
        ));
    }

    let source = normalize_path(source);
    let destination = normalize_path(destination);

    if source == destination {
        return Err(ValidationError::SamePath(source));
    }
    if source.starts_with(&destination) {
        return Err(ValidationError::SourceInsideDestination {
            source_dir: source,
            destination,
        });
    }
    if destination.starts_with(&source) {
        return Err(ValidationError::DestinationInsideSource {
            source_dir: source,
            destination,
        });
    }

    Ok(())
}

/// A rebuild works in place, so only an existing directory will do
pub fn validate_rebuild_root(destination: &Path) -> Result<(), ValidationError> {
    if !destination.is_dir() {
        return Err(ValidationError::DestinationNotDirectory(
            destination.to_path_buf(),
        ));
    }
    Ok(())
}
