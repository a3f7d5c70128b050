//! Store object immutability.
//!
//! Once an object is registered in the store its tree is write-protected so
//! that nothing edits a published generation in place.
//!
//! ## Platform Behavior
//!
//! - **Unix**: Sets permissions to 0444 (files) or 0555 (dirs/executables)
//! - **Windows**: Sets the read-only attribute on files
//!
//! Symlinks are never touched: their permissions are meaningless on Unix and
//! changing them would follow the link into another store object.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Error during immutability operations.
#[derive(Debug, thiserror::Error)]
pub enum ImmutableError {
  #[error("failed to set permissions on {path}: {source}")]
  SetPermissions {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read metadata for {path}: {source}")]
  Metadata {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to traverse directory {path}: {source}")]
  WalkDir {
    path: String,
    #[source]
    source: walkdir::Error,
  },
}

/// Write-protect a store object.
///
/// Entries are processed deepest first so directories are locked after their
/// contents. Failures on individual entries are logged and skipped.
pub fn make_immutable(path: &Path) -> Result<(), ImmutableError> {
  if path.symlink_metadata().is_err() {
    return Ok(());
  }

  debug!(path = ?path, "making store object immutable");

  for entry in WalkDir::new(path).contents_first(true) {
    let entry = entry.map_err(|e| ImmutableError::WalkDir {
      path: path.display().to_string(),
      source: e,
    })?;

    if entry.path_is_symlink() {
      continue;
    }

    if let Err(e) = set_entry_writable(entry.path(), false) {
      warn!(path = ?entry.path(), error = %e, "failed to make immutable, continuing");
    }
  }

  Ok(())
}

/// Lift write protection so an object can be deleted.
pub fn make_mutable(path: &Path) -> Result<(), ImmutableError> {
  if path.symlink_metadata().is_err() {
    return Ok(());
  }

  debug!(path = ?path, "making store object mutable");

  // Directories first so their contents can be reached.
  for entry in WalkDir::new(path) {
    let entry = entry.map_err(|e| ImmutableError::WalkDir {
      path: path.display().to_string(),
      source: e,
    })?;

    if entry.path_is_symlink() {
      continue;
    }

    if let Err(e) = set_entry_writable(entry.path(), true) {
      warn!(path = ?entry.path(), error = %e, "failed to make mutable, continuing");
    }
  }

  Ok(())
}

#[cfg(unix)]
fn set_entry_writable(path: &Path, writable: bool) -> Result<(), ImmutableError> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = std::fs::symlink_metadata(path).map_err(|e| ImmutableError::Metadata {
    path: path.display().to_string(),
    source: e,
  })?;

  let executable = metadata.is_dir() || (metadata.permissions().mode() & 0o111 != 0);
  let new_mode = match (writable, executable) {
    (false, false) => 0o444,
    (false, true) => 0o555,
    (true, false) => 0o644,
    (true, true) => 0o755,
  };

  let mut perms = metadata.permissions();
  perms.set_mode(new_mode);
  std::fs::set_permissions(path, perms).map_err(|e| ImmutableError::SetPermissions {
    path: path.display().to_string(),
    source: e,
  })
}

#[cfg(windows)]
fn set_entry_writable(path: &Path, writable: bool) -> Result<(), ImmutableError> {
  let metadata = std::fs::symlink_metadata(path).map_err(|e| ImmutableError::Metadata {
    path: path.display().to_string(),
    source: e,
  })?;

  // Directory read-only flags do not stop deletion on Windows.
  if metadata.is_dir() {
    return Ok(());
  }

  let mut perms = metadata.permissions();
  perms.set_readonly(!writable);
  std::fs::set_permissions(path, perms).map_err(|e| ImmutableError::SetPermissions {
    path: path.display().to_string(),
    source: e,
  })
}
