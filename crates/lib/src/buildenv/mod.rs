//! Merging package outputs into a single symlink tree.
//!
//! Every entry of every active package becomes a symlink at the same relative
//! position in the output. Where two packages both provide a directory, the
//! directory is materialized in the output and merged entry by entry. Where
//! two packages provide the same non-directory entry, the package with the
//! lower priority value wins; equal priorities are a conflict unless both
//! entries are the same file.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::platform::link::symlink;

/// One package output to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  pub path: PathBuf,
  pub active: bool,
  /// Lower values win file collisions.
  pub priority: u32,
}

impl Package {
  pub fn new(path: impl Into<PathBuf>, active: bool, priority: u32) -> Self {
    Self {
      path: path.into(),
      active,
      priority,
    }
  }
}

#[derive(Debug, Error)]
pub enum BuildEnvError {
  #[error("packages '{existing}' and '{new}' both provide '{path}' with equal priority")]
  Conflict {
    path: PathBuf,
    existing: PathBuf,
    new: PathBuf,
  },

  #[error("package output '{0}' is not a directory")]
  NotADirectory(PathBuf),

  #[error("failed to link {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Builds a profile environment from package outputs.
pub trait EnvironmentBuilder {
  /// Merge the active `packages` into the existing, empty directory `out`.
  fn merge(&self, out: &Path, packages: &[Package]) -> Result<(), BuildEnvError>;
}

/// The symlink-farm builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkEnvBuilder;

impl EnvironmentBuilder for SymlinkEnvBuilder {
  fn merge(&self, out: &Path, packages: &[Package]) -> Result<(), BuildEnvError> {
    let mut farm = Farm {
      out,
      priorities: HashMap::new(),
      links: 0,
    };

    for package in packages.iter().filter(|p| p.active) {
      if !package.path.is_dir() {
        return Err(BuildEnvError::NotADirectory(package.path.clone()));
      }
      farm.add_dir(&package.path, Path::new(""), package.priority)?;
    }

    info!(packages = packages.len(), links = farm.links, "merged environment");
    Ok(())
  }
}

struct Farm<'a> {
  out: &'a Path,
  /// Priority of the package each output symlink came from, by relative path.
  priorities: HashMap<PathBuf, u32>,
  links: usize,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> BuildEnvError + '_ {
  move |source| BuildEnvError::Io {
    path: path.to_path_buf(),
    source,
  }
}

impl Farm<'_> {
  /// Link the entries of `src_dir` below `rel` in the output.
  fn add_dir(&mut self, src_dir: &Path, rel: &Path, priority: u32) -> Result<(), BuildEnvError> {
    let mut entries = fs::read_dir(src_dir)
      .map_err(io_err(src_dir))?
      .map(|entry| entry.map(|e| e.file_name()))
      .collect::<Result<Vec<_>, _>>()
      .map_err(io_err(src_dir))?;
    entries.sort();

    for name in entries {
      self.add_entry(&src_dir.join(&name), &rel.join(&name), priority)?;
    }
    Ok(())
  }

  fn add_entry(&mut self, src: &Path, rel: &Path, priority: u32) -> Result<(), BuildEnvError> {
    let dst = self.out.join(rel);

    let existing = match dst.symlink_metadata() {
      Err(e) if e.kind() == io::ErrorKind::NotFound => return self.link(src, rel, priority),
      Err(e) => return Err(io_err(&dst)(e)),
      Ok(metadata) => metadata,
    };

    let src_is_dir = src.is_dir();

    if existing.is_dir() {
      // Already split into a real directory by an earlier collision.
      if src_is_dir {
        return self.add_dir(src, rel, priority);
      }
      return Err(BuildEnvError::Conflict {
        path: rel.to_path_buf(),
        existing: dst,
        new: src.to_path_buf(),
      });
    }

    let existing_target = fs::read_link(&dst).map_err(io_err(&dst))?;
    if existing_target == src {
      return Ok(());
    }
    let existing_priority = self.priorities.get(rel).copied().unwrap_or(priority);

    if src_is_dir && existing_target.is_dir() {
      debug!(path = %rel.display(), "splitting shared directory");
      fs::remove_file(&dst).map_err(io_err(&dst))?;
      fs::create_dir(&dst).map_err(io_err(&dst))?;
      self.priorities.remove(rel);
      self.links -= 1;
      self.add_dir(&existing_target, rel, existing_priority)?;
      return self.add_dir(src, rel, priority);
    }

    if same_file(&existing_target, src) {
      return Ok(());
    }

    if priority < existing_priority {
      debug!(
        path = %rel.display(),
        winner = %src.display(),
        loser = %existing_target.display(),
        "overriding by priority"
      );
      fs::remove_file(&dst).map_err(io_err(&dst))?;
      self.links -= 1;
      return self.link(src, rel, priority);
    }

    if priority > existing_priority {
      debug!(path = %rel.display(), ignored = %src.display(), "keeping higher-priority entry");
      return Ok(());
    }

    Err(BuildEnvError::Conflict {
      path: rel.to_path_buf(),
      existing: existing_target,
      new: src.to_path_buf(),
    })
  }

  fn link(&mut self, src: &Path, rel: &Path, priority: u32) -> Result<(), BuildEnvError> {
    let dst = self.out.join(rel);
    symlink(src, &dst).map_err(io_err(&dst))?;
    self.priorities.insert(rel.to_path_buf(), priority);
    self.links += 1;
    Ok(())
  }
}

/// Whether two paths resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
  match (fs::canonicalize(a), fs::canonicalize(b)) {
    (Ok(a), Ok(b)) => a == b,
    _ => false,
  }
}
