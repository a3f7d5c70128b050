use std::path::Path;

use anyhow::{Context, Result};

use prof_lib::ops::remove;

use super::Session;
use crate::output::{print_info, print_stat};

pub fn cmd_remove(profile: &Path, elements: &[String]) -> Result<()> {
  let session = Session::open(profile)?;
  let result = remove(&session.context(profile), elements).context("Remove failed")?;

  print_info(&format!(
    "removed {} packages, kept {} packages",
    result.removed, result.kept
  ));
  print_stat("Profile", &result.profile.display().to_string());

  Ok(())
}
