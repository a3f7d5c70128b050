//! Hashing utilities for content-addressed storage.
//!
//! This module provides:
//! - `ObjectHash`: A truncated 20-character hash used in store object names
//! - `ContentHash`: A full 64-character hash of a file tree or byte string
//! - `hash_directory()`: Deterministic tree hashing
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A truncated hash naming a unique store object.
///
/// The hash is the first 20 hex characters of the SHA-256 of the
/// JSON-serialized descriptor it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let full = hash_bytes(serialized.as_bytes());
    Ok(ObjectHash(full.0[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

/// A full 64-character SHA-256 hash of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// The leading `OBJ_HASH_PREFIX_LEN` characters, used as a short revision.
  pub fn short(&self) -> &str {
    &self.0[..OBJ_HASH_PREFIX_LEN.min(self.0.len())]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "sha256:{}", self.0)
  }
}

/// Error during tree hashing.
#[derive(Debug, thiserror::Error)]
pub enum DirHashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },

  #[error("failed to read symlink {path}: {message}")]
  ReadSymlink { path: String, message: String },
}

/// Compute a deterministic hash of a file tree.
///
/// The hash covers file contents, entry names, directory structure and
/// symlink targets. Timestamps and permissions are ignored, and symlinks are
/// recorded rather than followed. Entries are visited in name order.
///
/// A plain file at `path` hashes as a single unnamed entry.
pub fn hash_directory(path: &Path) -> Result<ContentHash, DirHashError> {
  let mut entries: Vec<(String, String)> = Vec::new();

  for entry in WalkDir::new(path).follow_root_links(false).sort_by_file_name() {
    let entry = entry.map_err(|e| DirHashError::WalkDir { message: e.to_string() })?;
    let entry_path = entry.path();

    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .to_string_lossy()
      .replace('\\', "/");

    let file_type = entry.file_type();
    let entry_hash = if file_type.is_symlink() {
      let target = fs::read_link(entry_path).map_err(|e| DirHashError::ReadSymlink {
        path: entry_path.display().to_string(),
        message: e.to_string(),
      })?;
      let target_hash = hash_bytes(target.to_string_lossy().as_bytes());
      format!("L:{}:{}", rel_path, target_hash.0)
    } else if file_type.is_file() {
      let content_hash = hash_file(entry_path)?;
      format!("F:{}:{}", rel_path, content_hash.0)
    } else if file_type.is_dir() {
      if rel_path.is_empty() {
        continue;
      }
      format!("D:{}", rel_path)
    } else {
      // Sockets, devices and fifos never appear in store objects.
      continue;
    };

    entries.push((rel_path, entry_hash));
  }

  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, entry_hash) in entries {
    hasher.update(entry_hash.as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> Result<ContentHash, DirHashError> {
  let mut file = fs::File::open(path).map_err(|e| DirHashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| DirHashError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::link::symlink;
  use std::fs;
  use tempfile::tempdir;

  #[test]
  fn empty_tree_has_full_length_hash() {
    let temp = tempdir().unwrap();
    let hash = hash_directory(temp.path()).unwrap();
    assert_eq!(hash.0.len(), 64);
  }

  #[test]
  fn hash_is_deterministic() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.txt"), "content a").unwrap();
    fs::write(temp.path().join("b.txt"), "content b").unwrap();

    assert_eq!(hash_directory(temp.path()).unwrap(), hash_directory(temp.path()).unwrap());
  }

  #[test]
  fn identical_trees_in_different_places_hash_equal() {
    let one = tempdir().unwrap();
    let two = tempdir().unwrap();
    for root in [one.path(), two.path()] {
      fs::create_dir(root.join("bin")).unwrap();
      fs::write(root.join("bin/hello"), "#!/bin/sh\necho hi\n").unwrap();
    }

    assert_eq!(hash_directory(one.path()).unwrap(), hash_directory(two.path()).unwrap());
  }

  #[test]
  fn hash_changes_with_content() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("file.txt"), "original").unwrap();
    let before = hash_directory(temp.path()).unwrap();

    fs::write(temp.path().join("file.txt"), "modified").unwrap();
    assert_ne!(before, hash_directory(temp.path()).unwrap());
  }

  #[test]
  fn hash_changes_with_names() {
    let one = tempdir().unwrap();
    let two = tempdir().unwrap();
    fs::write(one.path().join("a"), "same").unwrap();
    fs::write(two.path().join("b"), "same").unwrap();

    assert_ne!(hash_directory(one.path()).unwrap(), hash_directory(two.path()).unwrap());
  }

  #[test]
  fn symlinks_hash_by_target_not_content() {
    let temp = tempdir().unwrap();
    let target = temp.path().join("target.txt");
    fs::write(&target, "first").unwrap();

    let tree = tempdir().unwrap();
    symlink(&target, &tree.path().join("link")).unwrap();
    let before = hash_directory(tree.path()).unwrap();

    fs::write(&target, "second").unwrap();
    assert_eq!(before, hash_directory(tree.path()).unwrap());
  }

  #[test]
  fn same_content_different_structure_different_hash() {
    let flat = tempdir().unwrap();
    fs::write(flat.path().join("file.txt"), "content").unwrap();

    let nested = tempdir().unwrap();
    fs::create_dir(nested.path().join("subdir")).unwrap();
    fs::write(nested.path().join("subdir/file.txt"), "content").unwrap();

    assert_ne!(hash_directory(flat.path()).unwrap(), hash_directory(nested.path()).unwrap());
  }

  #[test]
  fn object_hash_is_truncated() {
    #[derive(Serialize)]
    struct Descriptor {
      name: &'static str,
    }
    impl Hashable for Descriptor {}

    let hash = Descriptor { name: "hello" }.compute_hash().unwrap();
    assert_eq!(hash.0.len(), OBJ_HASH_PREFIX_LEN);
  }
}
