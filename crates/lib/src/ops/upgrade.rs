use std::path::PathBuf;

use tracing::{debug, info};

use super::{ProfileContext, ProfileError};
use crate::manifest::ProfileElementSource;
use crate::matcher::{self, parse_matchers};
use crate::reference::PackageRef;
use crate::resolve::Resolution;
use crate::store::BuildRequest;

/// An element moved to a newer revision by [`upgrade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradedPackage {
  pub index: usize,
  pub attr_path: String,
  pub from: PackageRef,
  pub to: PackageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeResult {
  pub upgraded: Vec<UpgradedPackage>,
  /// The published profile object.
  pub profile: PathBuf,
}

/// Re-resolve the selected elements and move them to what they resolve to now.
///
/// Elements without provenance, and elements installed from a pinned
/// reference, are left alone, as are elements whose reference still resolves
/// to the revision they were installed from. Upgraded elements keep their
/// position and active flag. Every element is resolved before anything is
/// built, so a single failure leaves the whole profile untouched.
pub fn upgrade(ctx: &ProfileContext<'_>, selectors: &[String]) -> Result<UpgradeResult, ProfileError> {
  let mut manifest = ctx.load()?;
  let matchers = parse_matchers(selectors, ctx.store)?;

  let mut pending: Vec<(usize, Resolution)> = Vec::new();
  for (index, element) in manifest.elements.iter().enumerate() {
    if !matcher::matches(element, index, &matchers) {
      continue;
    }
    let Some(source) = &element.source else {
      debug!(index, "element has no source, skipping");
      continue;
    };
    if source.original_ref.is_immutable() {
      debug!(index, reference = %source.original_ref, "pinned reference, skipping");
      continue;
    }

    debug!(index, attr_path = %source.attr_path, "checking for updates");
    let resolution = ctx
      .resolver
      .resolve(ctx.store, &source.original_ref, &source.attr_path)?;
    if resolution.resolved_ref == source.resolved_ref {
      debug!(index, attr_path = %source.attr_path, "already up to date");
      continue;
    }
    pending.push((index, resolution));
  }

  let requests: Vec<BuildRequest> = pending.iter().map(|(_, r)| r.derivation.clone()).collect();
  ctx.store.build_paths(&requests)?;

  let mut upgraded = Vec::with_capacity(pending.len());
  for (index, resolution) in pending {
    let element = &mut manifest.elements[index];
    let Some(old) = element.source.take() else {
      continue;
    };

    info!(
      attr_path = %resolution.attr_path,
      from = %old.resolved_ref,
      to = %resolution.resolved_ref,
      "upgrading"
    );
    upgraded.push(UpgradedPackage {
      index,
      attr_path: resolution.attr_path.clone(),
      from: old.resolved_ref,
      to: resolution.resolved_ref.clone(),
    });

    element.store_paths = [resolution.derivation.out_path].into();
    element.source = Some(ProfileElementSource {
      original_ref: old.original_ref,
      resolved_ref: resolution.resolved_ref,
      attr_path: resolution.attr_path,
    });
  }

  let profile = ctx.commit(&manifest)?;
  Ok(UpgradeResult { upgraded, profile })
}
