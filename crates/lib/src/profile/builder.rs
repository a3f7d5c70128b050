//! Turning a manifest into a profile store object.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::buildenv::{BuildEnvError, EnvironmentBuilder, Package};
use crate::consts::{DEFAULT_PRIORITY, MANIFEST_FILENAME, PROFILE_OBJECT_NAME};
use crate::manifest::{ManifestError, ProfileManifest};
use crate::store::{PathInfo, Store, StoreError};
use crate::util::hash::{DirHashError, hash_directory};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to create build directory: {0}")]
  TempDir(#[source] io::Error),

  #[error(transparent)]
  Env(#[from] BuildEnvError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("failed to write {path}: {source}")]
  WriteManifest {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to hash profile tree: {0}")]
  Hash(#[source] DirHashError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Build the profile described by `manifest` and register it in `store`.
///
/// Active elements are merged into a fresh tree with `env`, the manifest is
/// written beside them, and the tree is added to the store under the name
/// `profile`. The object references every element's store paths, active or
/// not. Building the same manifest twice yields the same path.
pub fn build(manifest: &ProfileManifest, store: &dyn Store, env: &dyn EnvironmentBuilder) -> Result<PathBuf, BuildError> {
  let packages: Vec<Package> = manifest
    .elements
    .iter()
    .filter(|element| element.active)
    .flat_map(|element| {
      element
        .store_paths
        .iter()
        .map(|path| Package::new(path, true, DEFAULT_PRIORITY))
    })
    .collect();
  let references = manifest.references();

  let temp = tempfile::Builder::new()
    .prefix("prof-build-")
    .tempdir()
    .map_err(BuildError::TempDir)?;
  let tree = temp.path().join(PROFILE_OBJECT_NAME);
  fs::create_dir(&tree).map_err(BuildError::TempDir)?;

  env.merge(&tree, &packages)?;

  let manifest_path = tree.join(MANIFEST_FILENAME);
  // A package may ship its own manifest.json; the profile's takes its place.
  if manifest_path.symlink_metadata().is_ok() {
    debug!(path = %manifest_path.display(), "replacing package-provided manifest");
    fs::remove_file(&manifest_path).map_err(|e| BuildError::WriteManifest {
      path: manifest_path.clone(),
      source: e,
    })?;
  }
  fs::write(&manifest_path, manifest.to_json()?).map_err(|e| BuildError::WriteManifest {
    path: manifest_path.clone(),
    source: e,
  })?;

  let hash = hash_directory(&tree).map_err(BuildError::Hash)?;
  let path = store.make_fixed_output_path(PROFILE_OBJECT_NAME, &hash, &references)?;
  store.add_to_store(&PathInfo::new(path.clone(), hash, references), &tree)?;

  info!(
    path = %path.display(),
    elements = manifest.len(),
    packages = packages.len(),
    "built profile"
  );
  Ok(path)
}
