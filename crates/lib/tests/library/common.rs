//! Shared setup for library tests.

use std::fs;
use std::path::{Path, PathBuf};

use prof_lib::buildenv::SymlinkEnvBuilder;
use prof_lib::ops::ProfileContext;
use prof_lib::profile::Generations;
use prof_lib::resolve::{LocalResolver, PACKAGE_INDEX_FILENAME, Registry};
use prof_lib::store::LocalStore;
use tempfile::TempDir;

/// A store, a package source registered as `pkgs`, and a profile, all under
/// one temporary directory.
pub struct Sandbox {
  pub temp: TempDir,
  pub store: LocalStore,
  pub resolver: LocalResolver,
  pub env: SymlinkEnvBuilder,
  pub generations: Generations,
  pub profile: PathBuf,
}

impl Sandbox {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let store = LocalStore::new(temp.path().join("store"));
    let profile = temp.path().join("profiles").join("default");

    let mut registry = Registry::default();
    registry
      .entries
      .insert("pkgs".to_string(), format!("path:{}", temp.path().join("pkgs").display()));

    Self {
      store,
      resolver: LocalResolver::new(registry),
      env: SymlinkEnvBuilder,
      generations: Generations::new(&profile),
      profile,
      temp,
    }
  }

  pub fn ctx(&self) -> ProfileContext<'_> {
    ProfileContext {
      profile: &self.profile,
      store: &self.store,
      resolver: &self.resolver,
      env: &self.env,
      pointer: &self.generations,
    }
  }

  pub fn source_dir(&self) -> PathBuf {
    self.temp.path().join("pkgs")
  }

  /// Write package `attr` into the `pkgs` source with the given files, and
  /// register it in the source's index.
  pub fn write_package(&self, attr: &str, files: &[(&str, &str)]) {
    let dir = self.source_dir();
    let src = dir.join(attr);
    if src.exists() {
      fs::remove_dir_all(&src).unwrap();
    }
    for (rel, content) in files {
      write_file(&src.join(rel), content);
    }

    let index_path = dir.join(PACKAGE_INDEX_FILENAME);
    let mut index: serde_json::Value = fs::read_to_string(&index_path)
      .map(|s| serde_json::from_str(&s).unwrap())
      .unwrap_or_else(|_| serde_json::json!({ "packages": {} }));
    index["packages"][attr] = serde_json::json!({ "name": attr, "src": attr });
    fs::write(&index_path, serde_json::to_string_pretty(&index).unwrap()).unwrap();
  }
}

pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

pub fn args(args: &[&str]) -> Vec<String> {
  args.iter().map(|s| s.to_string()).collect()
}
