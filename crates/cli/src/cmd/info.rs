use std::path::Path;

use anyhow::{Context, Result};

use prof_lib::ops::info;

use crate::output::{OutputFormat, print_json};

/// List the elements of the profile at `profile`, one per line.
pub fn cmd_info(profile: &Path, output: OutputFormat) -> Result<()> {
  let elements = info(profile).with_context(|| format!("Failed to read profile {}", profile.display()))?;

  if output.is_json() {
    print_json(&elements)?;
  } else {
    for element in &elements {
      println!("{}", element);
    }
  }

  Ok(())
}
