//! Implementation of the `prof upgrade` command.

use std::path::Path;

use anyhow::{Context, Result};

use prof_lib::ops::upgrade;

use super::Session;
use crate::output::{print_info, print_stat, print_success, symbols};

/// Upgrade the selected elements of the profile at `profile`.
///
/// Elements that are already current are not mentioned.
pub fn cmd_upgrade(profile: &Path, elements: &[String]) -> Result<()> {
  let session = Session::open(profile)?;
  let result = upgrade(&session.context(profile), elements).context("Upgrade failed")?;

  for package in &result.upgraded {
    print_success(&format!(
      "upgraded '{}' {} {} {}",
      package.attr_path,
      package.from,
      symbols::ARROW,
      package.to
    ));
  }
  print_info(&format!("upgraded {} packages", result.upgraded.len()));
  print_stat("Profile", &result.profile.display().to_string());

  Ok(())
}
