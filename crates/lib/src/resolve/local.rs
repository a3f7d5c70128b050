//! Resolution against package sources on the local filesystem.
//!
//! A package source is a directory holding a `packages.json` index:
//!
//! ```json
//! {
//!   "packages": {
//!     "hello": { "name": "hello", "src": "hello" }
//!   }
//! }
//! ```
//!
//! Keys are attribute paths. `src` is relative to the source directory and
//! names the tree that becomes the package's store object. The revision of
//! a source is the short content hash of the whole directory.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Registry, ResolveError, Resolution, Resolver};
use crate::platform::paths::registry_path;
use crate::reference::PackageRef;
use crate::store::{BuildRequest, Store};
use crate::util::hash::hash_directory;

pub const PACKAGE_INDEX_FILENAME: &str = "packages.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
  pub packages: BTreeMap<String, PackageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
  /// Store object name of the output.
  pub name: String,
  /// Output tree, relative to the source directory.
  pub src: PathBuf,
}

impl PackageIndex {
  fn load(dir: &Path) -> Result<Self, ResolveError> {
    let path = dir.join(PACKAGE_INDEX_FILENAME);
    let content = fs::read_to_string(&path).map_err(|e| ResolveError::ReadIndex {
      path: path.clone(),
      source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ResolveError::ParseIndex { path, source: e })
  }
}

/// Resolves references through a [`Registry`] to package source directories.
#[derive(Debug, Clone, Default)]
pub struct LocalResolver {
  registry: Registry,
}

impl LocalResolver {
  pub fn new(registry: Registry) -> Self {
    Self { registry }
  }

  /// A resolver over the registry at the configured location.
  pub fn open_default() -> Result<Self, ResolveError> {
    Ok(Self::new(Registry::load(&registry_path())?))
  }

  /// The source directory of `reference` and the revision it is pinned to.
  ///
  /// A registry entry may itself carry a revision; a revision on the
  /// reference takes precedence.
  fn locate(&self, reference: &PackageRef) -> Result<(PathBuf, Option<String>), ResolveError> {
    match reference {
      PackageRef::Path { path, rev } => Ok((path.clone(), rev.clone())),
      PackageRef::Indirect { id, rev } => {
        let PackageRef::Path { path, rev: entry_rev } = self.registry.lookup(id)? else {
          return Err(ResolveError::UnknownId(id.clone()));
        };
        Ok((path, rev.clone().or(entry_rev)))
      }
    }
  }
}

/// The canonical form of the source directory `dir`.
fn canonical_dir(dir: &Path) -> Result<PathBuf, ResolveError> {
  match dunce::canonicalize(dir) {
    Ok(canonical) if canonical.is_dir() => Ok(canonical),
    Ok(_) => Err(ResolveError::SourceNotFound(dir.to_path_buf())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ResolveError::SourceNotFound(dir.to_path_buf())),
    Err(e) => Err(ResolveError::ReadSource {
      path: dir.to_path_buf(),
      source: e,
    }),
  }
}

impl Resolver for LocalResolver {
  fn resolve(&self, store: &dyn Store, reference: &PackageRef, attr_path: &str) -> Result<Resolution, ResolveError> {
    let (dir, pinned) = self.locate(reference)?;
    // Revisions and outputs are hashes of real trees, never of links to them.
    let dir = canonical_dir(&dir)?;
    let revision = hash_directory(&dir).map_err(|e| ResolveError::Hash {
      path: dir.clone(),
      source: e,
    })?;
    let rev = revision.short();

    if let Some(pinned) = pinned
      && pinned != rev
    {
      return Err(ResolveError::RevisionMismatch {
        reference: reference.to_string(),
        expected: pinned,
        actual: rev.to_string(),
      });
    }

    let index = PackageIndex::load(&dir)?;
    let entry = index
      .packages
      .get(attr_path)
      .ok_or_else(|| ResolveError::MissingAttribute {
        reference: reference.to_string(),
        attr_path: attr_path.to_string(),
      })?;

    let src = dunce::canonicalize(dir.join(&entry.src)).map_err(|e| match e.kind() {
      io::ErrorKind::NotFound => ResolveError::SourceNotFound(dir.join(&entry.src)),
      _ => ResolveError::ReadSource {
        path: dir.join(&entry.src),
        source: e,
      },
    })?;
    let hash = hash_directory(&src).map_err(|e| ResolveError::Hash {
      path: src.clone(),
      source: e,
    })?;
    let out_path = store.make_fixed_output_path(&entry.name, &hash, &BTreeSet::new())?;

    let resolved_ref = PackageRef::Path {
      path: dir,
      rev: Some(rev.to_string()),
    };
    debug!(reference = %reference, resolved = %resolved_ref, attr_path, "resolved reference");
    info!(package = %entry.name, out = %out_path.display(), "resolved package");

    Ok(Resolution {
      attr_path: attr_path.to_string(),
      resolved_ref,
      derivation: BuildRequest {
        name: entry.name.clone(),
        src,
        out_path,
      },
    })
  }
}
