//! Implementation of the `prof install` command.

use std::path::Path;

use anyhow::{Context, Result};

use prof_lib::ops::install;

use super::Session;
use crate::output::{print_stat, print_success, symbols};

/// Install `installables` into the profile at `profile`.
///
/// Prints one line per installed package and the new profile object.
pub fn cmd_install(profile: &Path, installables: &[String]) -> Result<()> {
  let session = Session::open(profile)?;
  let result = install(&session.context(profile), installables).context("Install failed")?;

  for package in &result.installed {
    print_success(&format!(
      "installed {} {} {}",
      package.what,
      symbols::ARROW,
      package.out_path.display()
    ));
  }
  print_stat("Profile", &result.profile.display().to_string());

  Ok(())
}
