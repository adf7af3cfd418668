// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Advisory per-buffer lock files.
//!
//! A held `flock` on `<temp>/zerobuffer/locks/<name>.lock` marks "someone
//! currently owns this buffer". The kernel releases the lock when the
//! owner exits for any reason, which is exactly what stale-resource scans
//! exploit: a lock file whose lock can be grabbed non-blocking has no
//! live owner.
//!
//! The lock never guards data correctness; the ring protocol does that.

use crate::{Result, ZeroBufferError};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Held advisory lock on a buffer's lock file.
///
/// Dropping the handle releases the lock and best-effort unlinks the file.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Create (if needed) and exclusively lock the file at `path`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when another process holds the lock,
    /// `Backend` for any other OS failure.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ZeroBufferError::Backend)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .map_err(ZeroBufferError::Backend)?;

        // SAFETY: file.as_raw_fd() is a valid descriptor owned by `file`
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                return Err(ZeroBufferError::AlreadyExists(
                    path.display().to_string(),
                ));
            }
            return Err(ZeroBufferError::Backend(err));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Try to reclaim a lock file with no live owner.
    ///
    /// Attempts a non-blocking exclusive lock; success proves nobody holds
    /// it, so the file is removed and `true` returned. A held lock or a
    /// missing file returns `false`.
    #[must_use]
    pub fn try_remove_stale(path: &Path) -> bool {
        let Ok(file) = OpenOptions::new().write(true).open(path) else {
            return false;
        };

        // SAFETY: file.as_raw_fd() is a valid descriptor owned by `file`
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret < 0 {
            // Live owner (or transient failure); leave it alone
            return false;
        }

        // Lock drops with `file`; the inode is unlinked first
        fs::remove_file(path).is_ok()
    }

    /// Path of the locked file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // SAFETY: the descriptor is valid until `self.file` drops below
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::debug!("[ZB] Failed to unlink lock file {}: {e}", self.path.display());
            }
        }
    }
}
