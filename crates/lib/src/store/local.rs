//! Directory-backed store.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::types::{BuildRequest, FixedOutputDescriptor, PathInfo, StoreError};
use super::Store;
use crate::consts::OBJ_HASH_PREFIX_LEN;
use crate::platform::immutable::{make_immutable, make_mutable};
use crate::platform::link::symlink;
use crate::platform::paths::store_dir;
use crate::store_lock::StoreLock;
use crate::util::hash::{ContentHash, Hashable, hash_directory};

const OBJ_DIR: &str = "obj";
const INFO_DIR: &str = "info";

/// A store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
  root: PathBuf,
  obj_dir: PathBuf,
  info_dir: PathBuf,
}

impl LocalStore {
  /// A store rooted at `root`. Nothing is created until the first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      obj_dir: root.join(OBJ_DIR),
      info_dir: root.join(INFO_DIR),
      root,
    }
  }

  /// The store at the configured default location.
  pub fn open_default() -> Self {
    Self::new(store_dir())
  }

  /// Directory holding store objects.
  pub fn obj_dir(&self) -> &Path {
    &self.obj_dir
  }

  fn info_path(&self, path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    Some(self.info_dir.join(format!("{}.json", file_name)))
  }

  /// Read the registration record of `path`, if it is registered.
  pub fn query_path_info(&self, path: &Path) -> Result<Option<PathInfo>, StoreError> {
    let Some(info_path) = self.info_path(path) else {
      return Ok(None);
    };
    let content = match fs::read_to_string(&info_path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => {
        return Err(StoreError::ReadInfo {
          path: info_path,
          source: e,
        });
      }
    };
    let info: PathInfo = serde_json::from_str(&content).map_err(StoreError::Serialize)?;
    Ok(Some(info))
  }

  fn ensure_dirs(&self) -> Result<(), StoreError> {
    for dir in [&self.obj_dir, &self.info_dir] {
      fs::create_dir_all(dir).map_err(|e| StoreError::CreateDir {
        path: dir.clone(),
        source: e,
      })?;
    }
    Ok(())
  }

  /// Split `path` into its object name, if it names an object of this store.
  fn object_name<'a>(&self, path: &'a Path) -> Option<&'a str> {
    if path.parent() != Some(self.obj_dir.as_path()) {
      return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let (hash, name) = file_name.split_once('-')?;
    let hash_ok = hash.len() == OBJ_HASH_PREFIX_LEN && hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));
    (hash_ok && is_valid_name(name)).then_some(name)
  }

  fn write_info(&self, info: &PathInfo) -> Result<(), StoreError> {
    let info_path = self
      .info_path(&info.path)
      .ok_or_else(|| StoreError::NotInStore(info.path.clone()))?;
    let temp_path = info_path.with_extension("json.tmp");

    let content = serde_json::to_string_pretty(info).map_err(StoreError::Serialize)?;
    fs::write(&temp_path, content).map_err(|e| StoreError::WriteInfo {
      path: info_path.clone(),
      source: e,
    })?;
    fs::rename(&temp_path, &info_path).map_err(|e| StoreError::WriteInfo {
      path: info_path.clone(),
      source: e,
    })
  }

  fn build_one(&self, request: &BuildRequest) -> Result<(), StoreError> {
    // The object must hold the source's content, not a link to it.
    let src = dunce::canonicalize(&request.src).map_err(|_| StoreError::BuildFailed {
      name: request.name.clone(),
      message: format!("source {} does not exist", request.src.display()),
    })?;

    let hash = hash_directory(&src).map_err(|e| StoreError::Hash {
      path: src.clone(),
      source: e,
    })?;
    let references = BTreeSet::new();
    let expected = self.make_fixed_output_path(&request.name, &hash, &references)?;
    if expected != request.out_path {
      return Err(StoreError::BuildFailed {
        name: request.name.clone(),
        message: format!(
          "source changed since it was resolved: expected {}, now {}",
          request.out_path.display(),
          expected.display()
        ),
      });
    }

    self.add_to_store(&PathInfo::new(expected, hash, references), &src)?;
    info!(name = %request.name, path = %request.out_path.display(), "built");
    Ok(())
  }
}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_' | '?' | '='))
}

/// Copy a file tree, recreating symlinks instead of following them.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
  for entry in WalkDir::new(from).follow_root_links(false) {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(from).map_err(io::Error::other)?;
    let target = if rel.as_os_str().is_empty() {
      to.to_path_buf()
    } else {
      to.join(rel)
    };

    let file_type = entry.file_type();
    if file_type.is_symlink() {
      symlink(&fs::read_link(entry.path())?, &target)?;
    } else if file_type.is_dir() {
      fs::create_dir_all(&target)?;
    } else if file_type.is_file() {
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}

fn remove_partial(path: &Path) -> io::Result<()> {
  let metadata = path.symlink_metadata()?;
  if metadata.is_dir() {
    make_mutable(path).map_err(io::Error::other)?;
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}

impl Store for LocalStore {
  fn store_dir(&self) -> &Path {
    &self.root
  }

  fn is_store_path(&self, path: &str) -> bool {
    self.object_name(Path::new(path)).is_some()
  }

  fn is_valid_path(&self, path: &Path) -> bool {
    self.object_name(path).is_some()
      && path.symlink_metadata().is_ok()
      && self.info_path(path).is_some_and(|info| info.exists())
  }

  fn build_paths(&self, requests: &[BuildRequest]) -> Result<(), StoreError> {
    for request in requests {
      if self.is_valid_path(&request.out_path) {
        debug!(name = %request.name, path = %request.out_path.display(), "output already valid");
        continue;
      }

      self.build_one(request).map_err(|e| match e {
        StoreError::BuildFailed { .. } => e,
        other => StoreError::BuildFailed {
          name: request.name.clone(),
          message: other.to_string(),
        },
      })?;
    }
    Ok(())
  }

  fn make_fixed_output_path(
    &self,
    name: &str,
    hash: &ContentHash,
    references: &BTreeSet<PathBuf>,
  ) -> Result<PathBuf, StoreError> {
    if !is_valid_name(name) {
      return Err(StoreError::InvalidName(name.to_string()));
    }

    let descriptor = FixedOutputDescriptor {
      kind: "fixed:r:sha256",
      name,
      hash: &hash.0,
      references: references.iter().map(|r| r.to_string_lossy().into_owned()).collect(),
    };
    let object_hash = descriptor.compute_hash().map_err(StoreError::Serialize)?;
    Ok(self.obj_dir.join(format!("{}-{}", object_hash, name)))
  }

  fn add_to_store(&self, info: &PathInfo, tree: &Path) -> Result<(), StoreError> {
    if self.is_valid_path(&info.path) {
      debug!(path = %info.path.display(), "already in store");
      return Ok(());
    }

    let name = self
      .object_name(&info.path)
      .ok_or_else(|| StoreError::NotInStore(info.path.clone()))?;

    let tree = &dunce::canonicalize(tree).map_err(|e| StoreError::Copy {
      from: tree.to_path_buf(),
      source: e,
    })?;
    let actual = hash_directory(tree).map_err(|e| StoreError::Hash {
      path: tree.to_path_buf(),
      source: e,
    })?;
    if actual != info.nar_hash {
      return Err(StoreError::HashMismatch {
        path: info.path.clone(),
        expected: info.nar_hash.0.clone(),
        actual: actual.0,
      });
    }

    let expected = self.make_fixed_output_path(name, &info.nar_hash, &info.references)?;
    if expected != info.path {
      return Err(StoreError::AddressMismatch {
        path: info.path.clone(),
        expected,
      });
    }

    self.ensure_dirs()?;
    let _lock = StoreLock::acquire(&self.root, "add-to-store")?;

    if self.is_valid_path(&info.path) {
      debug!(path = %info.path.display(), "registered concurrently");
      return Ok(());
    }

    // Left behind by an interrupted registration: present but never recorded.
    if info.path.symlink_metadata().is_ok() {
      debug!(path = %info.path.display(), "removing unregistered object");
      remove_partial(&info.path).map_err(|e| StoreError::Copy {
        from: info.path.clone(),
        source: e,
      })?;
    }

    let staging = tempfile::Builder::new()
      .prefix(".tmp-")
      .tempdir_in(&self.obj_dir)
      .map_err(|e| StoreError::CreateDir {
        path: self.obj_dir.clone(),
        source: e,
      })?;
    let staged = staging.path().join("out");
    let copy_err = |e| StoreError::Copy {
      from: tree.to_path_buf(),
      source: e,
    };
    copy_tree(tree, &staged).map_err(copy_err)?;
    fs::rename(&staged, &info.path).map_err(copy_err)?;

    make_immutable(&info.path)?;
    self.write_info(info)?;

    info!(
      path = %info.path.display(),
      references = info.references.len(),
      "registered store object"
    );
    Ok(())
  }
}
