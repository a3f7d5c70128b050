use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::immutable::ImmutableError;
use crate::store_lock::StoreLockError;
use crate::util::hash::{ContentHash, DirHashError, Hashable};

/// Current path-info record format version.
pub const PATH_INFO_VERSION: u32 = 1;

/// A request to realize one package output.
///
/// `out_path` is fixed at resolution time: it is the content address of the
/// tree found at `src`, so a build whose source changed afterwards is
/// rejected rather than silently producing a different object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
  pub name: String,
  pub src: PathBuf,
  pub out_path: PathBuf,
}

/// Registration record for a store object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathInfo {
  pub version: u32,
  pub path: PathBuf,
  pub nar_hash: ContentHash,
  pub references: BTreeSet<PathBuf>,
  /// Content-address descriptor, e.g. `fixed:r:sha256:<hash>`.
  pub ca: String,
}

impl PathInfo {
  pub fn new(path: PathBuf, nar_hash: ContentHash, references: BTreeSet<PathBuf>) -> Self {
    let ca = make_fixed_output_ca(&nar_hash);
    Self {
      version: PATH_INFO_VERSION,
      path,
      nar_hash,
      references,
      ca,
    }
  }
}

/// Content-address descriptor of a recursively hashed tree.
pub fn make_fixed_output_ca(hash: &ContentHash) -> String {
  format!("fixed:r:{}", hash)
}

/// Input to a store object name: everything the address depends on.
#[derive(Debug, Serialize)]
pub(crate) struct FixedOutputDescriptor<'a> {
  pub kind: &'static str,
  pub name: &'a str,
  pub hash: &'a str,
  pub references: Vec<String>,
}

impl Hashable for FixedOutputDescriptor<'_> {}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to build '{name}': {message}")]
  BuildFailed { name: String, message: String },

  #[error("invalid store object name '{0}'")]
  InvalidName(String),

  #[error("'{0}' is not a path in this store")]
  NotInStore(PathBuf),

  #[error("{path} is not the address of its content, expected {expected}")]
  AddressMismatch { path: PathBuf, expected: PathBuf },

  #[error("content of {path} does not match its address: expected {expected}, got {actual}")]
  HashMismatch {
    path: PathBuf,
    expected: String,
    actual: String,
  },

  #[error("failed to hash {path}: {source}")]
  Hash {
    path: PathBuf,
    #[source]
    source: DirHashError,
  },

  #[error("failed to copy {from} into the store: {source}")]
  Copy {
    from: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read path info {path}: {source}")]
  ReadInfo {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write path info for {path}: {source}")]
  WriteInfo {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize path info: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to create store directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Lock(#[from] StoreLockError),

  #[error(transparent)]
  Immutable(#[from] ImmutableError),
}
