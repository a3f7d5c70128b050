//! Profile generations.
//!
//! # Layout
//!
//! ```text
//! <dir>/
//! ├── default -> default-3-link       # the profile; swapped atomically
//! ├── default-1-link -> <store>/obj/<hash>-profile
//! ├── default-2-link -> <store>/obj/<hash>-profile
//! └── default-3-link -> <store>/obj/<hash>-profile
//! ```
//!
//! Generation links are never rewritten. Publishing creates the next one and
//! renames a fresh profile link over the old.
//!
//! Concurrent publishers never share a number: a publisher that finds its
//! number taken moves on to the next free one. The profile link ends up at
//! whichever generation was swapped in last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::platform::link::{replace_symlink, symlink};

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("invalid profile path '{0}'")]
  InvalidProfilePath(PathBuf),

  #[error("failed to create profile directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to list generations in {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to link {path}: {source}")]
  Link {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Makes a built profile the current state of a profile.
pub trait ProfilePointer {
  /// Publish `artifact` and return the link it was published under.
  fn publish(&self, artifact: &Path) -> Result<PathBuf, GenerationError>;
}

/// One numbered generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  pub number: u64,
  pub link: PathBuf,
  pub target: PathBuf,
}

/// Numbered generation links beside a profile symlink.
#[derive(Debug, Clone)]
pub struct Generations {
  profile: PathBuf,
}

impl Generations {
  pub fn new(profile: impl Into<PathBuf>) -> Self {
    Self {
      profile: profile.into(),
    }
  }

  pub fn profile(&self) -> &Path {
    &self.profile
  }

  fn parts(&self) -> Result<(&Path, &str), GenerationError> {
    let invalid = || GenerationError::InvalidProfilePath(self.profile.clone());
    let dir = self.profile.parent().ok_or_else(invalid)?;
    let name = self.profile.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    Ok((dir, name))
  }

  fn link_name(name: &str, number: u64) -> String {
    format!("{}-{}-link", name, number)
  }

  fn parse_number(name: &str, file_name: &str) -> Option<u64> {
    file_name
      .strip_prefix(name)?
      .strip_prefix('-')?
      .strip_suffix("-link")?
      .parse()
      .ok()
  }

  /// Link `artifact` under the first free generation number from `first` on.
  fn link_generation(dir: &Path, name: &str, first: u64, artifact: &Path) -> Result<u64, GenerationError> {
    let mut number = first;
    loop {
      let link = dir.join(Self::link_name(name, number));
      match symlink(artifact, &link) {
        Ok(()) => return Ok(number),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
          debug!(generation = number, "generation taken, trying the next");
          number += 1;
        }
        Err(e) => return Err(GenerationError::Link { path: link, source: e }),
      }
    }
  }

  /// All generations, oldest first.
  pub fn list(&self) -> Result<Vec<Generation>, GenerationError> {
    let (dir, name) = self.parts()?;
    let read_err = |e| GenerationError::ReadDir {
      path: dir.to_path_buf(),
      source: e,
    };

    let entries = match fs::read_dir(dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(read_err(e)),
    };

    let mut generations = Vec::new();
    for entry in entries {
      let entry = entry.map_err(read_err)?;
      let file_name = entry.file_name();
      let Some(number) = file_name.to_str().and_then(|f| Self::parse_number(name, f)) else {
        continue;
      };
      let link = entry.path();
      let target = fs::read_link(&link).map_err(|e| GenerationError::Link {
        path: link.clone(),
        source: e,
      })?;
      generations.push(Generation { number, link, target });
    }

    generations.sort_by_key(|g| g.number);
    Ok(generations)
  }

  /// The generation the profile currently points at, if any.
  pub fn current(&self) -> Result<Option<u64>, GenerationError> {
    let (_, name) = self.parts()?;
    match fs::read_link(&self.profile) {
      Ok(target) => Ok(
        target
          .file_name()
          .and_then(|f| f.to_str())
          .and_then(|f| Self::parse_number(name, f)),
      ),
      Err(e) if e.kind() == io::ErrorKind::NotFound || e.kind() == io::ErrorKind::InvalidInput => Ok(None),
      Err(e) => Err(GenerationError::Link {
        path: self.profile.clone(),
        source: e,
      }),
    }
  }
}

impl ProfilePointer for Generations {
  fn publish(&self, artifact: &Path) -> Result<PathBuf, GenerationError> {
    let (dir, name) = self.parts()?;
    fs::create_dir_all(dir).map_err(|e| GenerationError::CreateDir {
      path: dir.to_path_buf(),
      source: e,
    })?;

    let generations = self.list()?;
    let link_name = match generations.last() {
      Some(last) if last.target == artifact => {
        debug!(generation = last.number, "artifact unchanged, reusing generation");
        Self::link_name(name, last.number)
      }
      last => {
        let number = Self::link_generation(dir, name, last.map_or(1, |g| g.number + 1), artifact)?;
        info!(generation = number, artifact = %artifact.display(), "created generation");
        Self::link_name(name, number)
      }
    };

    // Relative, so the profile directory can be moved as a whole.
    replace_symlink(Path::new(&link_name), &self.profile).map_err(|e| GenerationError::Link {
      path: self.profile.clone(),
      source: e,
    })?;

    Ok(dir.join(link_name))
  }
}
