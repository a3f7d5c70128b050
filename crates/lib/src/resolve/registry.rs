//! The registry of package sources.
//!
//! Maps registry ids used in indirect references (`pkgs`) to `path:`
//! references.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "pkgs": "path:/srv/pkgs"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ResolveError;
use crate::reference::PackageRef;

/// Current registry format version.
pub const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
  pub version: u32,
  #[serde(default)]
  pub entries: BTreeMap<String, String>,
}

impl Default for Registry {
  fn default() -> Self {
    Self {
      version: REGISTRY_VERSION,
      entries: BTreeMap::new(),
    }
  }
}

impl Registry {
  /// Load the registry at `path`. A missing file is an empty registry.
  pub fn load(path: &Path) -> Result<Self, ResolveError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no registry, using an empty one");
        return Ok(Self::default());
      }
      Err(e) => {
        return Err(ResolveError::ReadRegistry {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    let registry: Registry = serde_json::from_str(&content).map_err(|e| ResolveError::ParseRegistry {
      path: path.to_path_buf(),
      source: e,
    })?;

    if registry.version != REGISTRY_VERSION {
      return Err(ResolveError::UnsupportedRegistryVersion {
        path: path.to_path_buf(),
        version: registry.version,
      });
    }

    Ok(registry)
  }

  /// The `path:` reference registered under `id`.
  pub fn lookup(&self, id: &str) -> Result<PackageRef, ResolveError> {
    let target = self
      .entries
      .get(id)
      .ok_or_else(|| ResolveError::UnknownId(id.to_string()))?;

    let invalid = |reason: String| ResolveError::InvalidRegistryEntry {
      id: id.to_string(),
      target: target.clone(),
      reason,
    };

    match target.parse::<PackageRef>().map_err(|e| invalid(e.to_string()))? {
      reference @ PackageRef::Path { .. } => Ok(reference),
      PackageRef::Indirect { .. } => Err(invalid("registry entries must be 'path:' references".to_string())),
    }
  }
}
