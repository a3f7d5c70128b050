use std::path::PathBuf;

use tracing::{debug, info};

use super::{ProfileContext, ProfileError};
use crate::manifest::ProfileManifest;
use crate::matcher::{self, parse_matchers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveResult {
  pub removed: usize,
  pub kept: usize,
  /// The published profile object.
  pub profile: PathBuf,
}

/// Drop every element selected by `selectors`, keeping the rest in order.
///
/// The profile is rebuilt and published even when nothing matched.
pub fn remove(ctx: &ProfileContext<'_>, selectors: &[String]) -> Result<RemoveResult, ProfileError> {
  let old = ctx.load()?;
  let matchers = parse_matchers(selectors, ctx.store)?;

  for (selector, m) in selectors.iter().zip(&matchers) {
    if !old.elements.iter().enumerate().any(|(i, e)| m.matches(e, i)) {
      debug!(selector = %selector, "selector matched no elements");
    }
  }

  let new = ProfileManifest {
    elements: old
      .elements
      .iter()
      .enumerate()
      .filter(|(i, element)| !matcher::matches(element, *i, &matchers))
      .map(|(_, element)| element.clone())
      .collect(),
  };

  let removed = old.len() - new.len();
  let kept = new.len();
  info!(removed, kept, "removing packages");

  let profile = ctx.commit(&new)?;
  Ok(RemoveResult { removed, kept, profile })
}
