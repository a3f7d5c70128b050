//! Shared test helpers for CLI integration tests.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the store, the
/// registry, a package source registered as `pkgs`, and the profile.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    let registry = serde_json::json!({
      "version": 1,
      "entries": { "pkgs": format!("path:{}", env.source_path().display()) },
    });
    env.write_file("registry.json", &registry.to_string());
    env
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  /// Store path (isolated per test).
  pub fn store_path(&self) -> PathBuf {
    self.dir("store")
  }

  /// The `pkgs` package source.
  pub fn source_path(&self) -> PathBuf {
    self.dir("pkgs")
  }

  pub fn registry_path(&self) -> PathBuf {
    self.temp.path().join("registry.json")
  }

  /// The profile link; its parent holds the generations.
  pub fn profile_path(&self) -> PathBuf {
    self.dir("profiles").join("default")
  }

  /// Add package `attr` with the given files to the `pkgs` source.
  pub fn write_package(&self, attr: &str, files: &[(&str, &str)]) {
    let src = self.source_path().join(attr);
    if src.exists() {
      fs::remove_dir_all(&src).unwrap();
    }
    for (rel, content) in files {
      let path = src.join(rel);
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(path, content).unwrap();
    }

    let index_path = self.source_path().join("packages.json");
    let mut index: serde_json::Value = fs::read_to_string(&index_path)
      .map(|s| serde_json::from_str(&s).unwrap())
      .unwrap_or_else(|_| serde_json::json!({ "packages": {} }));
    index["packages"][attr] = serde_json::json!({ "name": attr, "src": attr });
    fs::write(&index_path, index.to_string()).unwrap();
  }

  /// Get a pre-configured Command for the prof binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `PROF_STORE`: Isolated store
  /// - `PROF_REGISTRY`: Registry with `pkgs` pointing at the test source
  /// - `PROF_PROFILE`: Isolated profile
  /// - `XDG_DATA_HOME` / `XDG_CONFIG_HOME` / `APPDATA`: Isolated fallbacks
  pub fn prof_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("prof");
    cmd.env("PROF_STORE", self.store_path());
    cmd.env("PROF_REGISTRY", self.registry_path());
    cmd.env("PROF_PROFILE", self.profile_path());
    cmd.env("XDG_DATA_HOME", self.dir("data"));
    cmd.env("XDG_CONFIG_HOME", self.dir("config"));
    cmd.env("APPDATA", self.dir("data")); // For Windows
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
