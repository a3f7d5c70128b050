//! The content-addressed package store.
//!
//! Profiles never own package contents; they point into the store. The
//! [`Store`] trait is the interface the profile operations consume, and
//! [`LocalStore`] is the directory-backed implementation.
//!
//! # Layout
//!
//! ```text
//! store/
//! ├── .lock                   # held while registering objects
//! ├── obj/                    # immutable, content-addressed objects
//! │   └── <hash>-<name>/
//! └── info/                   # one PathInfo record per object
//!     └── <hash>-<name>.json
//! ```

mod local;
mod types;

pub use local::LocalStore;
pub use types::*;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::util::hash::ContentHash;

/// Operations the profile layer needs from a store.
pub trait Store {
  /// Root directory of the store.
  fn store_dir(&self) -> &Path;

  /// Whether `path` is syntactically a store object path.
  ///
  /// This does not check that the object exists.
  fn is_store_path(&self, path: &str) -> bool;

  /// Whether `path` is a registered, complete store object.
  fn is_valid_path(&self, path: &Path) -> bool;

  /// Realize every request, skipping outputs that are already valid.
  ///
  /// All requests of one operation are passed together; the call fails if
  /// any of them cannot be built.
  fn build_paths(&self, requests: &[BuildRequest]) -> Result<(), StoreError>;

  /// The path a tree with content hash `hash` is stored under.
  fn make_fixed_output_path(
    &self,
    name: &str,
    hash: &ContentHash,
    references: &BTreeSet<PathBuf>,
  ) -> Result<PathBuf, StoreError>;

  /// Copy `tree` into the store as the object described by `info`.
  fn add_to_store(&self, info: &PathInfo, tree: &Path) -> Result<(), StoreError>;
}
