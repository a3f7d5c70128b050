//! Package references and installables.
//!
//! A [`PackageRef`] names a package source, either indirectly through the
//! registry (`pkgs`, `pkgs/<rev>`) or directly by location
//! (`path:/srv/pkgs`, `path:/srv/pkgs?rev=<rev>`). A reference carrying a
//! revision is pinned: it denotes exactly one source tree.
//!
//! An [`Installable`] is a command-line argument to `install`: either a
//! reference plus attribute path (`pkgs#hello`) or a bare path.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Attribute path used when an installable names no attribute.
pub const DEFAULT_ATTR_PATH: &str = "default";

const PATH_SCHEME: &str = "path:";
const REV_PARAM: &str = "rev=";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
  #[error("empty package reference")]
  Empty,

  #[error("invalid package reference '{reference}': {reason}")]
  Invalid { reference: String, reason: String },
}

/// A reference to a package source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageRef {
  /// A registry id, optionally pinned to a revision.
  Indirect { id: String, rev: Option<String> },
  /// An absolute source directory, optionally pinned to a revision.
  Path { path: PathBuf, rev: Option<String> },
}

impl PackageRef {
  /// Whether this reference denotes exactly one source revision.
  pub fn is_immutable(&self) -> bool {
    self.rev().is_some()
  }

  pub fn rev(&self) -> Option<&str> {
    match self {
      PackageRef::Indirect { rev, .. } | PackageRef::Path { rev, .. } => rev.as_deref(),
    }
  }
}

fn is_rev(s: &str) -> bool {
  !s.is_empty() && s.len() <= 64 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

fn is_registry_id(s: &str) -> bool {
  s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl FromStr for PackageRef {
  type Err = ReferenceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = |reason: &str| ReferenceError::Invalid {
      reference: s.to_string(),
      reason: reason.to_string(),
    };

    if s.is_empty() {
      return Err(ReferenceError::Empty);
    }

    if let Some(rest) = s.strip_prefix(PATH_SCHEME) {
      let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (rest, None),
      };
      if location.is_empty() {
        return Err(invalid("missing directory"));
      }
      let path = PathBuf::from(location);
      if !path.is_absolute() {
        return Err(invalid("path references must be absolute"));
      }
      let rev = match query {
        None => None,
        Some(query) => {
          let rev = query
            .strip_prefix(REV_PARAM)
            .ok_or_else(|| invalid("only the 'rev' parameter is supported"))?;
          if !is_rev(rev) {
            return Err(invalid("revision must be lowercase hex"));
          }
          Some(rev.to_string())
        }
      };
      return Ok(PackageRef::Path { path, rev });
    }

    let (id, rev) = match s.split_once('/') {
      Some((id, rev)) => (id, Some(rev)),
      None => (s, None),
    };
    if !is_registry_id(id) {
      return Err(invalid("not a registry id or 'path:' reference"));
    }
    if let Some(rev) = rev
      && !is_rev(rev)
    {
      return Err(invalid("revision must be lowercase hex"));
    }

    Ok(PackageRef::Indirect {
      id: id.to_string(),
      rev: rev.map(str::to_string),
    })
  }
}

impl fmt::Display for PackageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackageRef::Indirect { id, rev: None } => write!(f, "{}", id),
      PackageRef::Indirect { id, rev: Some(rev) } => write!(f, "{}/{}", id, rev),
      PackageRef::Path { path, rev: None } => write!(f, "{}{}", PATH_SCHEME, path.display()),
      PackageRef::Path { path, rev: Some(rev) } => {
        write!(f, "{}{}?{}{}", PATH_SCHEME, path.display(), REV_PARAM, rev)
      }
    }
  }
}

/// A parsed `install` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installable {
  /// `<reference>#<attrPath>`.
  Reference { reference: PackageRef, attr_path: String },
  /// Anything naming a path directly rather than through a reference.
  Path(String),
}

impl Installable {
  /// Classify a command-line argument.
  ///
  /// `is_store_path` is the store's syntactic store-path check; arguments it
  /// accepts, and arguments that look like filesystem paths, become
  /// [`Installable::Path`].
  pub fn parse(arg: &str, is_store_path: impl Fn(&str) -> bool) -> Result<Self, ReferenceError> {
    if is_store_path(arg) || arg.starts_with('/') || arg.starts_with('.') {
      return Ok(Installable::Path(arg.to_string()));
    }

    let (reference, attr_path) = match arg.split_once('#') {
      Some((reference, attr_path)) => (reference, attr_path),
      None => (arg, DEFAULT_ATTR_PATH),
    };
    let attr_path = if attr_path.is_empty() {
      DEFAULT_ATTR_PATH
    } else {
      attr_path
    };

    Ok(Installable::Reference {
      reference: reference.parse()?,
      attr_path: attr_path.to_string(),
    })
  }
}
