use std::path::PathBuf;

use tracing::{debug, info};

use super::{ProfileContext, ProfileError};
use crate::manifest::{ProfileElement, ProfileElementSource};
use crate::reference::Installable;
use crate::store::BuildRequest;

/// A package added by [`install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
  /// The installable as given, e.g. `pkgs#hello`.
  pub what: String,
  pub out_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
  pub installed: Vec<InstalledPackage>,
  /// The published profile object.
  pub profile: PathBuf,
}

/// Add one element per installable to the end of the profile.
///
/// All installables are parsed before anything is resolved, and all
/// resolved packages are built in a single batch before the profile is.
pub fn install(ctx: &ProfileContext<'_>, installables: &[String]) -> Result<InstallResult, ProfileError> {
  let mut references = Vec::with_capacity(installables.len());
  for arg in installables {
    match Installable::parse(arg, |s| ctx.store.is_store_path(s))? {
      Installable::Reference { reference, attr_path } => references.push((reference, attr_path)),
      Installable::Path(_) => return Err(ProfileError::UnsupportedInstallable(arg.clone())),
    }
  }

  let mut manifest = ctx.load()?;

  let mut resolutions = Vec::with_capacity(references.len());
  for (reference, attr_path) in references {
    let resolution = ctx.resolver.resolve(ctx.store, &reference, &attr_path)?;
    debug!(
      reference = %reference,
      resolved = %resolution.resolved_ref,
      attr_path = %resolution.attr_path,
      "resolved installable"
    );
    resolutions.push((reference, resolution));
  }

  let requests: Vec<BuildRequest> = resolutions.iter().map(|(_, r)| r.derivation.clone()).collect();
  ctx.store.build_paths(&requests)?;

  let mut installed = Vec::with_capacity(resolutions.len());
  for (reference, resolution) in resolutions {
    let out_path = resolution.derivation.out_path;
    installed.push(InstalledPackage {
      what: format!("{}#{}", reference, resolution.attr_path),
      out_path: out_path.clone(),
    });
    manifest.elements.push(ProfileElement::from_source(
      [out_path].into(),
      ProfileElementSource {
        original_ref: reference,
        resolved_ref: resolution.resolved_ref,
        attr_path: resolution.attr_path,
      },
    ));
  }

  let profile = ctx.commit(&manifest)?;
  info!(count = installed.len(), "installed packages");
  Ok(InstallResult { installed, profile })
}
