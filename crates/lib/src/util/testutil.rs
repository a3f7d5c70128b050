//! Test utilities for prof-lib.
//!
//! Cross-platform filesystem helpers and in-memory collaborators for tests
//! that exercise profile operations without a real store.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::buildenv::{BuildEnvError, EnvironmentBuilder, Package};
use crate::consts::MANIFEST_FILENAME;
use crate::profile::{GenerationError, ProfilePointer};
use crate::reference::PackageRef;
use crate::resolve::{ResolveError, Resolution, Resolver};
use crate::store::{BuildRequest, PathInfo, Store, StoreError};
use crate::util::hash::ContentHash;

/// Write `files` (relative path, content) below `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
  for (rel, content) in files {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
  }
}

/// A store that only records calls. Paths under `/store/` are store paths.
#[derive(Default)]
pub struct RecordingStore {
  pub build_calls: RefCell<Vec<Vec<BuildRequest>>>,
  pub added: RefCell<Vec<PathInfo>>,
  /// `manifest.json` of each added tree, by object path.
  pub manifests: RefCell<BTreeMap<PathBuf, String>>,
  pub fail_builds: bool,
}

impl Store for RecordingStore {
  fn store_dir(&self) -> &Path {
    Path::new("/store")
  }

  fn is_store_path(&self, path: &str) -> bool {
    path.starts_with("/store/") && path.len() > "/store/".len() && !path["/store/".len()..].contains('/')
  }

  fn is_valid_path(&self, path: &Path) -> bool {
    self.added.borrow().iter().any(|info| info.path == path)
  }

  fn build_paths(&self, requests: &[BuildRequest]) -> Result<(), StoreError> {
    self.build_calls.borrow_mut().push(requests.to_vec());
    if self.fail_builds
      && let Some(first) = requests.first()
    {
      return Err(StoreError::BuildFailed {
        name: first.name.clone(),
        message: "builder exited with code 1".to_string(),
      });
    }
    Ok(())
  }

  fn make_fixed_output_path(
    &self,
    name: &str,
    hash: &ContentHash,
    _references: &BTreeSet<PathBuf>,
  ) -> Result<PathBuf, StoreError> {
    Ok(PathBuf::from(format!("/store/{}-{}", hash.short(), name)))
  }

  fn add_to_store(&self, info: &PathInfo, tree: &Path) -> Result<(), StoreError> {
    if let Ok(manifest) = fs::read_to_string(tree.join(MANIFEST_FILENAME)) {
      self.manifests.borrow_mut().insert(info.path.clone(), manifest);
    }
    self.added.borrow_mut().push(info.clone());
    Ok(())
  }
}

/// A resolver answering from a fixed table keyed by `(reference, attr path)`.
#[derive(Default)]
pub struct TableResolver {
  pub entries: RefCell<BTreeMap<(String, String), (PackageRef, PathBuf)>>,
  pub calls: RefCell<Vec<(String, String)>>,
}

impl TableResolver {
  pub fn insert(&self, reference: &str, attr_path: &str, resolved: &str, out_path: &str) {
    self.entries.borrow_mut().insert(
      (reference.to_string(), attr_path.to_string()),
      (resolved.parse().unwrap(), PathBuf::from(out_path)),
    );
  }
}

impl Resolver for TableResolver {
  fn resolve(&self, _store: &dyn Store, reference: &PackageRef, attr_path: &str) -> Result<Resolution, ResolveError> {
    let key = (reference.to_string(), attr_path.to_string());
    self.calls.borrow_mut().push(key.clone());
    let entries = self.entries.borrow();
    let (resolved_ref, out_path) = entries.get(&key).ok_or_else(|| ResolveError::MissingAttribute {
      reference: reference.to_string(),
      attr_path: attr_path.to_string(),
    })?;
    Ok(Resolution {
      attr_path: attr_path.to_string(),
      resolved_ref: resolved_ref.clone(),
      derivation: BuildRequest {
        name: attr_path.to_string(),
        src: PathBuf::from("/src").join(attr_path),
        out_path: out_path.clone(),
      },
    })
  }
}

/// An environment builder that records merges and creates nothing.
#[derive(Default)]
pub struct RecordingEnvBuilder {
  pub merges: RefCell<Vec<Vec<Package>>>,
  /// Report a conflict between the first two active packages.
  pub conflict: bool,
}

impl EnvironmentBuilder for RecordingEnvBuilder {
  fn merge(&self, _out: &Path, packages: &[Package]) -> Result<(), BuildEnvError> {
    let active: Vec<Package> = packages.iter().filter(|p| p.active).cloned().collect();
    self.merges.borrow_mut().push(active.clone());
    if self.conflict
      && let [existing, new, ..] = active.as_slice()
    {
      return Err(BuildEnvError::Conflict {
        path: PathBuf::from("bin/tool"),
        existing: existing.path.clone(),
        new: new.path.clone(),
      });
    }
    Ok(())
  }
}

/// A profile pointer that records every published artifact.
#[derive(Default)]
pub struct RecordingPointer {
  pub published: RefCell<Vec<PathBuf>>,
}

impl ProfilePointer for RecordingPointer {
  fn publish(&self, artifact: &Path) -> Result<PathBuf, GenerationError> {
    let mut published = self.published.borrow_mut();
    published.push(artifact.to_path_buf());
    Ok(PathBuf::from(format!("/profiles/default-{}-link", published.len())))
  }
}
