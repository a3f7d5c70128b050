//! Manifest types and their persisted form.
//!
//! # Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "elements": [
//!     {
//!       "storePaths": ["/store/obj/0123...-hello"],
//!       "active": true,
//!       "originalUri": "pkgs",
//!       "uri": "path:/srv/pkgs?rev=89ab...",
//!       "attrPath": "hello"
//!     }
//!   ]
//! }
//! ```
//!
//! `originalUri`, `uri` and `attrPath` are present only for elements that
//! were installed from a reference.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MANIFEST_FILENAME, MANIFEST_VERSION};
use crate::reference::PackageRef;

/// Where an element came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileElementSource {
  /// The reference as the user gave it; may float.
  pub original_ref: PackageRef,
  /// The reference pinned at install or last upgrade.
  pub resolved_ref: PackageRef,
  /// The package's attribute path within the reference.
  pub attr_path: String,
}

/// One installed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileElement {
  pub store_paths: BTreeSet<PathBuf>,
  /// Absent for elements not installed through a reference.
  pub source: Option<ProfileElementSource>,
  /// Inactive elements stay in the manifest and keep their paths alive, but
  /// are left out of the environment.
  pub active: bool,
}

impl ProfileElement {
  /// An active element with provenance, as created by install.
  pub fn from_source(store_paths: BTreeSet<PathBuf>, source: ProfileElementSource) -> Self {
    Self {
      store_paths,
      source: Some(source),
      active: true,
    }
  }
}

/// The ordered elements of a profile.
///
/// Positions are significant: they are the indices users select elements by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileManifest {
  pub elements: Vec<ProfileElement>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read profile manifest '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse profile manifest '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("profile manifest '{path}' has unsupported version {version}")]
  UnsupportedVersion { path: PathBuf, version: String },

  #[error("profile manifest '{path}' element {index} is invalid: {reason}")]
  InvalidElement {
    path: PathBuf,
    index: usize,
    reason: String,
  },

  #[error("failed to serialize profile manifest: {0}")]
  Serialize(#[source] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
  version: u32,
  elements: Vec<ElementEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementEntry {
  store_paths: Vec<PathBuf>,
  active: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  original_uri: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  uri: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  attr_path: Option<String>,
}

impl ElementEntry {
  fn into_element(self) -> Result<ProfileElement, String> {
    let source = match self.uri.filter(|uri| !uri.is_empty()) {
      None => None,
      Some(uri) => {
        let original = self.original_uri.ok_or("missing 'originalUri'")?;
        let attr_path = self.attr_path.ok_or("missing 'attrPath'")?;
        Some(ProfileElementSource {
          original_ref: original.parse::<PackageRef>().map_err(|e| format!("{}", e))?,
          resolved_ref: uri.parse::<PackageRef>().map_err(|e| format!("{}", e))?,
          attr_path,
        })
      }
    };

    Ok(ProfileElement {
      store_paths: self.store_paths.into_iter().collect(),
      source,
      active: self.active,
    })
  }

  fn from_element(element: &ProfileElement) -> Self {
    let (original_uri, uri, attr_path) = match &element.source {
      Some(source) => (
        Some(source.original_ref.to_string()),
        Some(source.resolved_ref.to_string()),
        Some(source.attr_path.clone()),
      ),
      None => (None, None, None),
    };

    Self {
      store_paths: element.store_paths.iter().cloned().collect(),
      active: element.active,
      original_uri,
      uri,
      attr_path,
    }
  }
}

impl ProfileManifest {
  /// Load the manifest of the profile generation at `profile`.
  ///
  /// A missing manifest file, or a missing profile, is an empty manifest.
  pub fn load(profile: &Path) -> Result<Self, ManifestError> {
    let path = profile.join(MANIFEST_FILENAME);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(e) => return Err(ManifestError::Read { path, source: e }),
    };

    Self::parse(&content, &path)
  }

  /// Parse manifest JSON; `origin` names the file in errors.
  ///
  /// The version is checked before anything else is looked at.
  pub fn parse(content: &str, origin: &Path) -> Result<Self, ManifestError> {
    let parse_err = |e| ManifestError::Parse {
      path: origin.to_path_buf(),
      source: e,
    };

    let document: serde_json::Value = serde_json::from_str(content).map_err(parse_err)?;
    // A manifest without a version predates versioning: version 0.
    let version = document.get("version").cloned().unwrap_or(serde_json::Value::from(0));
    if version.as_u64() != Some(u64::from(MANIFEST_VERSION)) {
      return Err(ManifestError::UnsupportedVersion {
        path: origin.to_path_buf(),
        version: version.to_string(),
      });
    }

    let file: ManifestFile = serde_json::from_value(document).map_err(parse_err)?;
    let elements = file
      .elements
      .into_iter()
      .enumerate()
      .map(|(index, entry)| {
        entry.into_element().map_err(|reason| ManifestError::InvalidElement {
          path: origin.to_path_buf(),
          index,
          reason,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { elements })
  }

  /// The version-tagged JSON form written into every generation.
  pub fn to_json(&self) -> Result<String, ManifestError> {
    let file = ManifestFile {
      version: MANIFEST_VERSION,
      elements: self.elements.iter().map(ElementEntry::from_element).collect(),
    };
    serde_json::to_string(&file).map_err(ManifestError::Serialize)
  }

  /// Every store path of every element, active or not.
  pub fn references(&self) -> BTreeSet<PathBuf> {
    self
      .elements
      .iter()
      .flat_map(|element| element.store_paths.iter().cloned())
      .collect()
  }

  pub fn len(&self) -> usize {
    self.elements.len()
  }

  pub fn is_empty(&self) -> bool {
    self.elements.is_empty()
  }
}
