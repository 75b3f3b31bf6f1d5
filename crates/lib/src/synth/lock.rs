//! File-based locking of the shared provider artifact.
//!
//! Several stacks may be synthesized into the same output directory at once,
//! from threads of one process or from separate processes. The provider
//! artifact is read, merged and rewritten by each of them, so that sequence
//! runs under an exclusive OS lock on a sibling lock file. The lock is
//! released when the [`ProviderLock`] is dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::PROVIDER_LOCK_FILENAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub stack: String,
}

#[derive(Debug, Error)]
pub enum ProviderLockError {
  #[error("failed to open lock file {path}: {source}")]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to acquire lock {path}: {source}")]
  LockFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),
}

/// Exclusive lock over the provider artifact of one output directory.
pub struct ProviderLock {
  file: File,
  lock_path: PathBuf,
}

impl ProviderLock {
  /// Block until the exclusive lock for `out_dir` is held.
  ///
  /// The output directory must already exist.
  pub fn acquire(out_dir: &Path, stack: &str) -> Result<Self, ProviderLockError> {
    let lock_path = out_dir.join(PROVIDER_LOCK_FILENAME);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(|source| ProviderLockError::OpenFile {
        path: lock_path.clone(),
        source,
      })?;

    lock_exclusive(&file).map_err(|source| ProviderLockError::LockFailed {
      path: lock_path.clone(),
      source,
    })?;
    debug!(path = %lock_path.display(), stack, "acquired provider lock");

    Self::write_metadata(&file, stack)?;

    Ok(ProviderLock { file, lock_path })
  }

  fn write_metadata(file: &File, stack: &str) -> Result<(), ProviderLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      stack: stack.to_string(),
    };

    file.set_len(0).map_err(ProviderLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| ProviderLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(ProviderLockError::WriteMetadata)?;

    Ok(())
  }

  /// Reads the lock metadata from the held file handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

impl Drop for ProviderLock {
  fn drop(&mut self) {
    debug!(path = %self.lock_path.display(), "released provider lock");
  }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::LockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, LOCKFILE_EXCLUSIVE_LOCK, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
