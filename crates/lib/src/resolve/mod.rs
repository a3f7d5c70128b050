//! Reference resolution.
//!
//! A [`Resolver`] turns a possibly floating [`PackageRef`] plus attribute path
//! into a pinned reference and the build request for the package's output.

mod local;
mod registry;

pub use local::{LocalResolver, PACKAGE_INDEX_FILENAME, PackageEntry, PackageIndex};
pub use registry::{REGISTRY_VERSION, Registry};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::reference::PackageRef;
use crate::store::{BuildRequest, Store, StoreError};
use crate::util::hash::DirHashError;

/// The outcome of resolving one installable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub attr_path: String,
  /// The pinned reference the package was found in.
  pub resolved_ref: PackageRef,
  /// How to realize the package's output.
  pub derivation: BuildRequest,
}

pub trait Resolver {
  /// Resolve `attr_path` within `reference`.
  fn resolve(&self, store: &dyn Store, reference: &PackageRef, attr_path: &str) -> Result<Resolution, ResolveError>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("'{reference}' does not provide attribute '{attr_path}'")]
  MissingAttribute { reference: String, attr_path: String },

  #[error("unknown registry id '{0}'")]
  UnknownId(String),

  #[error("registry entry '{id}' -> '{target}' is invalid: {reason}")]
  InvalidRegistryEntry {
    id: String,
    target: String,
    reason: String,
  },

  #[error("failed to read registry '{path}': {source}")]
  ReadRegistry {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse registry '{path}': {source}")]
  ParseRegistry {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("registry '{path}' has unsupported version {version}")]
  UnsupportedRegistryVersion { path: PathBuf, version: u32 },

  #[error("package source '{0}' does not exist")]
  SourceNotFound(PathBuf),

  #[error("failed to read package source '{path}': {source}")]
  ReadSource {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read package index '{path}': {source}")]
  ReadIndex {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse package index '{path}': {source}")]
  ParseIndex {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("'{reference}' is pinned to revision {expected}, but the source is at {actual}")]
  RevisionMismatch {
    reference: String,
    expected: String,
    actual: String,
  },

  #[error("failed to hash {path}: {source}")]
  Hash {
    path: PathBuf,
    #[source]
    source: DirHashError,
  },

  #[error(transparent)]
  Store(#[from] StoreError),
}
