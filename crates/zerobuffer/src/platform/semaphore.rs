// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Named POSIX counting semaphores.
//!
//! Wraps `sem_open` / `sem_post` / `sem_timedwait` / `sem_trywait` /
//! `sem_unlink` behind a timeout-oriented API:
//!
//! - `wait(None)` blocks until posted
//! - `wait(Some(t))` blocks up to `t` and reports `false` on timeout
//! - `wait(Some(0))` degenerates to a non-blocking `try_wait`
//!
//! On Linux the timed path uses `sem_timedwait` against `CLOCK_REALTIME`.
//! macOS has no `sem_timedwait`, so the timed path polls `sem_trywait`
//! with a short sleep, trading a little latency for portability.

use crate::{Result, ZeroBufferError};
use std::ffi::CString;
use std::io;
use std::time::Duration;

/// Named counting semaphore handle.
///
/// The handle closes on drop; the name persists until `unlink`.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: String,
}

// SAFETY: sem_t handles from sem_open may be used from any thread of the
// opening process; the kernel object carries the synchronization.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a new named semaphore, failing if the name is taken.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when a semaphore with this name is present,
    /// `Backend` for any other OS failure.
    pub fn create_exclusive(name: &str, initial: u32) -> Result<Self> {
        let c_name = to_c_name(name)?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - O_CREAT|O_EXCL creates a fresh semaphore or fails with EEXIST
        // - 0o600 mode and the initial count are valid variadic arguments
        // - sem_open returns SEM_FAILED on error (checked below)
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600,
                initial,
            )
        };

        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(ZeroBufferError::AlreadyExists(name.to_string()));
            }
            return Err(ZeroBufferError::Backend(err));
        }

        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    /// Open an existing named semaphore.
    ///
    /// # Errors
    ///
    /// `BufferNotFound` when no semaphore has this name,
    /// `Backend` for any other OS failure.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = to_c_name(name)?;

        // SAFETY: c_name is a valid CString; without O_CREAT the mode and
        // value arguments are ignored; SEM_FAILED is checked below
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };

        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(ZeroBufferError::BufferNotFound(name.to_string()));
            }
            return Err(ZeroBufferError::Backend(err));
        }

        Ok(Self {
            sem,
            name: name.to_string(),
        })
    }

    /// Unlink a named semaphore. Not-found is success (idempotent cleanup).
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = to_c_name(name)?;

        // SAFETY: c_name is a valid CString; sem_unlink only touches the
        // namespace, open handles stay usable
        let ret = unsafe { libc::sem_unlink(c_name.as_ptr()) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ZeroBufferError::Backend(err));
            }
        }

        Ok(())
    }

    /// Increment the semaphore, waking one waiter.
    pub fn post(&self) -> Result<()> {
        // SAFETY: self.sem is a valid handle from sem_open (invariant of Self)
        let ret = unsafe { libc::sem_post(self.sem) };
        if ret < 0 {
            return Err(ZeroBufferError::Backend(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Decrement the semaphore, blocking until posted or until `timeout`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - acquired
    /// * `Ok(false)` - timed out
    pub fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        match timeout {
            None => self.wait_forever(),
            Some(t) if t.is_zero() => self.try_wait(),
            Some(t) => self.wait_timed(t),
        }
    }

    /// Non-blocking decrement attempt.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - acquired
    /// * `Ok(false)` - count was zero
    pub fn try_wait(&self) -> Result<bool> {
        loop {
            // SAFETY: self.sem is a valid handle from sem_open
            let ret = unsafe { libc::sem_trywait(self.sem) };
            if ret == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(ZeroBufferError::Backend(err)),
            }
        }
    }

    /// Get the semaphore name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn wait_forever(&self) -> Result<bool> {
        loop {
            // SAFETY: self.sem is a valid handle from sem_open
            let ret = unsafe { libc::sem_wait(self.sem) };
            if ret == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(ZeroBufferError::Backend(err));
        }
    }

    #[cfg(target_os = "linux")]
    fn wait_timed(&self, timeout: Duration) -> Result<bool> {
        // sem_timedwait takes an absolute CLOCK_REALTIME deadline
        let mut now = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: now is a valid out-parameter for clock_gettime
        let ret = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };
        if ret < 0 {
            return Err(ZeroBufferError::Backend(io::Error::last_os_error()));
        }

        let mut deadline = libc::timespec {
            tv_sec: now.tv_sec + timeout.as_secs() as libc::time_t,
            tv_nsec: now.tv_nsec + libc::c_long::from(timeout.subsec_nanos()),
        };
        if deadline.tv_nsec >= 1_000_000_000 {
            deadline.tv_sec += 1;
            deadline.tv_nsec -= 1_000_000_000;
        }

        loop {
            // SAFETY: self.sem is valid; deadline is a fully initialized timespec
            let ret = unsafe { libc::sem_timedwait(self.sem, &deadline) };
            if ret == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ETIMEDOUT) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(ZeroBufferError::Backend(err)),
            }
        }
    }

    // macOS has no sem_timedwait; poll sem_trywait instead
    #[cfg(not(target_os = "linux"))]
    fn wait_timed(&self, timeout: Duration) -> Result<bool> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.try_wait()? {
                return Ok(true);
            }
            if std::time::Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: self.sem is a valid handle; Drop runs once and the handle
        // is not used afterwards. The name is NOT unlinked here.
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

/// Validate and convert a POSIX semaphore name
fn to_c_name(name: &str) -> Result<CString> {
    if !name.starts_with('/') || (name.len() > 1 && name[1..].contains('/')) {
        return Err(ZeroBufferError::InvalidName(format!(
            "POSIX name must start with '/' and contain no other '/': {name}"
        )));
    }
    if name.len() > 255 {
        return Err(ZeroBufferError::InvalidName(format!(
            "POSIX name too long (max 255): {name}"
        )));
    }
    CString::new(name).map_err(|_| ZeroBufferError::InvalidName(name.to_string()))
}
