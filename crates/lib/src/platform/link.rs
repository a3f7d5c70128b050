//! Symlink helpers.
//!
//! Profiles are symlink farms and generations are symlinks, so both the
//! environment builder and the generation pointer go through these.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a symlink at `link` pointing to `target`.
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

/// Create a symlink at `link` pointing to `target`.
///
/// Windows distinguishes file and directory links, so the target must exist
/// for the right kind to be chosen. A relative target is looked up from the
/// link's directory, as it will be when the link is followed.
#[cfg(windows)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
  let resolved = match link.parent() {
    Some(parent) if target.is_relative() => parent.join(target),
    _ => target.to_path_buf(),
  };
  if resolved.is_dir() {
    std::os::windows::fs::symlink_dir(target, link)
  } else {
    std::os::windows::fs::symlink_file(target, link)
  }
}

/// Point `link` at `target`, replacing whatever `link` was.
///
/// The new link is created beside the old one and renamed over it, so
/// readers see either the old target or the new one and never a missing link.
pub fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
  let file_name = link
    .file_name()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "link path has no file name"))?;
  let temp_link = link.with_file_name(format!(
    ".{}.tmp-{}-{}",
    file_name.to_string_lossy(),
    std::process::id(),
    TEMP_LINK_COUNTER.fetch_add(1, Ordering::Relaxed)
  ));

  match std::fs::remove_file(&temp_link) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }

  symlink(target, &temp_link)?;
  if let Err(e) = std::fs::rename(&temp_link, link) {
    let _ = std::fs::remove_file(&temp_link);
    return Err(e);
  }
  Ok(())
}
