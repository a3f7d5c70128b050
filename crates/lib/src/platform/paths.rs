//! Default locations for the store, profiles and registry.
//!
//! Every location can be overridden through an environment variable, which
//! is how tests and alternate installations isolate themselves:
//!
//! | Variable        | Default                                   |
//! |-----------------|-------------------------------------------|
//! | `PROF_STORE`    | `{data_dir}/store`                        |
//! | `PROF_PROFILE`  | `{data_dir}/profiles/default`             |
//! | `PROF_REGISTRY` | `{config_dir}/registry.json`              |

use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").expect("USERPROFILE not set");
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").expect("HOME not set");
  PathBuf::from(home)
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  let appdata = std::env::var("APPDATA").expect("APPDATA not set");
  PathBuf::from(appdata).join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  let appdata = std::env::var("APPDATA").expect("APPDATA not set");
  PathBuf::from(appdata).join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Root of the content-addressed store.
pub fn store_dir() -> PathBuf {
  env_path("PROF_STORE").unwrap_or_else(|| data_dir().join("store"))
}

/// Directory holding profile links and their generations.
pub fn profiles_dir() -> PathBuf {
  data_dir().join("profiles")
}

/// The profile used when none is given on the command line.
pub fn default_profile_path() -> PathBuf {
  env_path("PROF_PROFILE").unwrap_or_else(|| profiles_dir().join("default"))
}

/// The registry mapping short reference ids to package sources.
pub fn registry_path() -> PathBuf {
  env_path("PROF_REGISTRY").unwrap_or_else(|| config_dir().join("registry.json"))
}
