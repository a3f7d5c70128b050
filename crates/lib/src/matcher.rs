//! Element selection for remove and upgrade.
//!
//! Each selector string becomes exactly one [`Matcher`], classified in this
//! order:
//!
//! 1. a non-negative integer selects the element at that position,
//! 2. a store path selects elements containing that path,
//! 3. anything else is a case-insensitive regular expression that must match
//!    an element's whole attribute path.
//!
//! An element is selected when any matcher matches it. Selectors that match
//! nothing are not an error.

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::debug;

use crate::manifest::ProfileElement;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum MatcherError {
  #[error("invalid element pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },
}

/// A compiled selector.
#[derive(Debug, Clone)]
pub enum Matcher {
  Index(usize),
  StorePath(String),
  Pattern(Regex),
}

impl Matcher {
  /// Classify and compile one selector.
  pub fn parse(selector: &str, store: &dyn Store) -> Result<Self, MatcherError> {
    if let Ok(index) = selector.parse::<usize>() {
      return Ok(Matcher::Index(index));
    }

    if store.is_store_path(selector) {
      return Ok(Matcher::StorePath(selector.to_string()));
    }

    let anchored = format!("^(?:{})$", selector);
    let regex = RegexBuilder::new(&anchored)
      .case_insensitive(true)
      .build()
      .map_err(|e| MatcherError::InvalidPattern {
        pattern: selector.to_string(),
        source: e,
      })?;
    Ok(Matcher::Pattern(regex))
  }

  /// Whether this matcher selects `element` at position `index`.
  pub fn matches(&self, element: &ProfileElement, index: usize) -> bool {
    match self {
      Matcher::Index(n) => *n == index,
      Matcher::StorePath(path) => element.store_paths.iter().any(|p| p.as_os_str() == path.as_str()),
      Matcher::Pattern(regex) => element
        .source
        .as_ref()
        .is_some_and(|source| regex.is_match(&source.attr_path)),
    }
  }
}

/// Compile every selector, failing on the first invalid pattern.
pub fn parse_matchers(selectors: &[String], store: &dyn Store) -> Result<Vec<Matcher>, MatcherError> {
  let matchers = selectors
    .iter()
    .map(|selector| Matcher::parse(selector, store))
    .collect::<Result<Vec<_>, _>>()?;
  debug!(count = matchers.len(), "compiled element matchers");
  Ok(matchers)
}

/// Whether any of `matchers` selects `element` at position `index`.
pub fn matches(element: &ProfileElement, index: usize, matchers: &[Matcher]) -> bool {
  matchers.iter().any(|matcher| matcher.matches(element, index))
}
