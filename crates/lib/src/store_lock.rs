//! Exclusive lock over a store directory.
//!
//! The local store holds this lock while it registers objects, so two
//! processes adding the same path never interleave their copies. Profile
//! publication is not covered: concurrent mutations of one profile race at
//! the generation swap and the last one wins.
//!
//! The lock file records who holds it. A process that finds the lock taken
//! logs the holder and then blocks until it is released.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const LOCK_FILENAME: &str = ".lock";

/// Who holds a store lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockHolder {
  pub pid: u32,
  pub acquired_at_unix: u64,
  pub operation: String,
}

#[derive(Debug, Error)]
pub enum StoreLockError {
  #[error("failed to create store directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to lock {path}: {source}")]
  Lock {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to record lock holder in {path}: {source}")]
  Record {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A held lock on a store directory, released on drop.
pub struct StoreLock {
  file: File,
  path: PathBuf,
}

impl StoreLock {
  /// Lock `store` for `operation`, waiting for any current holder.
  pub fn acquire(store: &Path, operation: &str) -> Result<Self, StoreLockError> {
    std::fs::create_dir_all(store).map_err(|e| StoreLockError::CreateDir {
      path: store.to_path_buf(),
      source: e,
    })?;

    let path = store.join(LOCK_FILENAME);
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&path)
      .map_err(|e| StoreLockError::Open {
        path: path.clone(),
        source: e,
      })?;

    let lock_err = |e| StoreLockError::Lock {
      path: path.clone(),
      source: e,
    };
    match lock(&file, false) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
        match read_holder(&path) {
          Some(holder) => info!(
            pid = holder.pid,
            operation = %holder.operation,
            since = holder.acquired_at_unix,
            "waiting for store lock"
          ),
          None => info!(path = %path.display(), "waiting for store lock"),
        }
        lock(&file, true).map_err(lock_err)?;
      }
      Err(e) => return Err(lock_err(e)),
    }

    let held = StoreLock { file, path };
    held.record(operation)?;
    debug!(path = %held.path.display(), operation, "acquired store lock");
    Ok(held)
  }

  fn record(&self, operation: &str) -> Result<(), StoreLockError> {
    let holder = LockHolder {
      pid: std::process::id(),
      acquired_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      operation: operation.to_string(),
    };
    let record_err = |e| StoreLockError::Record {
      path: self.path.clone(),
      source: e,
    };

    let mut file = &self.file;
    file.set_len(0).map_err(record_err)?;
    file.seek(SeekFrom::Start(0)).map_err(record_err)?;
    serde_json::to_writer(&mut file, &holder).map_err(|e| record_err(io::Error::other(e)))?;
    file.flush().map_err(record_err)
  }

  /// The recorded holder of this lock.
  pub fn holder(&self) -> io::Result<LockHolder> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

fn read_holder(path: &Path) -> Option<LockHolder> {
  let contents = std::fs::read_to_string(path).ok()?;
  serde_json::from_str(&contents).ok()
}

#[cfg(unix)]
fn lock(file: &File, blocking: bool) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = if blocking {
    FlockOperation::LockExclusive
  } else {
    FlockOperation::NonBlockingLockExclusive
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock(file: &File, blocking: bool) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = if blocking {
    LOCKFILE_EXCLUSIVE_LOCK
  } else {
    LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY
  };

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized,
  // and the handle is owned by `file` for the duration of the call.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    // ERROR_LOCK_VIOLATION
    if err.raw_os_error() == Some(33) {
      return Err(io::Error::from(io::ErrorKind::WouldBlock));
    }
    Err(err)
  } else {
    Ok(())
  }
}
