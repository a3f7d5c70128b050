use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ProfileError;
use crate::manifest::ProfileManifest;

/// One element of a profile, as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
  pub index: usize,
  /// `<original reference>#<attr path>`, if the element has provenance.
  pub original: Option<String>,
  /// `<resolved reference>#<attr path>`, if the element has provenance.
  pub resolved: Option<String>,
  pub store_paths: Vec<PathBuf>,
  pub active: bool,
}

impl fmt::Display for ElementInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let paths: Vec<String> = self.store_paths.iter().map(|p| p.display().to_string()).collect();
    write!(
      f,
      "{} {} {} {}",
      self.index,
      self.original.as_deref().unwrap_or("-"),
      self.resolved.as_deref().unwrap_or("-"),
      paths.join(" ")
    )
  }
}

/// Describe every element of the profile at `profile`, in order.
pub fn info(profile: &Path) -> Result<Vec<ElementInfo>, ProfileError> {
  let manifest = ProfileManifest::load(profile)?;

  Ok(
    manifest
      .elements
      .iter()
      .enumerate()
      .map(|(index, element)| {
        let source = element.source.as_ref();
        ElementInfo {
          index,
          original: source.map(|s| format!("{}#{}", s.original_ref, s.attr_path)),
          resolved: source.map(|s| format!("{}#{}", s.resolved_ref, s.attr_path)),
          store_paths: element.store_paths.iter().cloned().collect(),
          active: element.active,
        }
      })
      .collect(),
  )
}
