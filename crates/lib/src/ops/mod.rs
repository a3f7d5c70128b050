//! Profile operations.
//!
//! Every mutating operation follows the same transaction: load the current
//! manifest, derive a new one, build it into the store, and publish the
//! result exactly once. A failure at any step before publishing leaves the
//! profile as it was.

mod info;
mod install;
mod remove;
mod upgrade;

pub use info::{ElementInfo, info};
pub use install::{InstallResult, InstalledPackage, install};
pub use remove::{RemoveResult, remove};
pub use upgrade::{UpgradeResult, UpgradedPackage, upgrade};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::buildenv::EnvironmentBuilder;
use crate::manifest::{ManifestError, ProfileManifest};
use crate::matcher::MatcherError;
use crate::profile::{self, BuildError, GenerationError, ProfilePointer};
use crate::reference::ReferenceError;
use crate::resolve::{ResolveError, Resolver};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ProfileError {
  #[error("'{0}' is not a package reference; only '<reference>#<attribute>' can be installed")]
  UnsupportedInstallable(String),

  #[error(transparent)]
  Reference(#[from] ReferenceError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Matcher(#[from] MatcherError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Generation(#[from] GenerationError),
}

/// The profile being operated on and the collaborators that act on it.
#[derive(Clone, Copy)]
pub struct ProfileContext<'a> {
  /// The profile link; its target holds the current manifest.
  pub profile: &'a Path,
  pub store: &'a dyn Store,
  pub resolver: &'a dyn Resolver,
  pub env: &'a dyn EnvironmentBuilder,
  pub pointer: &'a dyn ProfilePointer,
}

impl ProfileContext<'_> {
  fn load(&self) -> Result<ProfileManifest, ProfileError> {
    Ok(ProfileManifest::load(self.profile)?)
  }

  /// Build `manifest` and publish it, returning the new profile object.
  fn commit(&self, manifest: &ProfileManifest) -> Result<PathBuf, ProfileError> {
    let artifact = profile::build(manifest, self.store, self.env)?;
    let generation = self.pointer.publish(&artifact)?;
    tracing::info!(
      profile = %self.profile.display(),
      generation = %generation.display(),
      artifact = %artifact.display(),
      "published profile"
    );
    Ok(artifact)
  }
}
