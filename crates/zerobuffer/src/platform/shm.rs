// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! POSIX shared memory segment management.
//!
//! Safe wrappers around `shm_open`, `ftruncate`, and `mmap` for creating
//! and mapping named shared memory segments.
//!
//! # Segment Lifecycle
//!
//! 1. The buffer creator calls `SharedMemory::create_exclusive()`
//! 2. The peer calls `SharedMemory::open()` (size discovered via `fstat`)
//! 3. The mapping is automatically unmapped on drop
//! 4. `SharedMemory::unlink()` removes the name; stale reclamation decides when
//!
//! Unlike a replace-on-create scheme, `create_exclusive` never unlinks an
//! existing segment: a collision is reported as `AlreadyExists` so the
//! caller can run liveness checks before reclaiming anything.

use crate::{Result, ZeroBufferError};
use std::ffi::CString;
use std::io;
use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// POSIX shared memory segment wrapper.
///
/// Automatically unmaps the memory region on drop.
/// Does NOT automatically unlink the segment (lifecycle's responsibility).
pub struct SharedMemory {
    /// Pointer to mapped memory region
    ptr: *mut u8,
    /// Size of the mapping
    size: usize,
    /// Segment name (for unlink)
    name: String,
}

// SAFETY: SharedMemory points to shared memory accessed from multiple
// threads/processes. The structures layered on top (OIEB) synchronize
// through atomic operations.
unsafe impl Send for SharedMemory {}
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    /// Create a new shared memory segment, failing if the name is taken.
    ///
    /// The segment is zero-initialized by the kernel (`ftruncate` on a
    /// fresh segment produces zero pages).
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when a segment with this name is present,
    /// `Backend` for any other OS failure.
    pub fn create_exclusive(name: &str, size: usize) -> Result<Self> {
        let c_name = to_c_name(name)?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - O_CREAT|O_RDWR|O_EXCL creates a new segment or fails with EEXIST
        // - 0o600 is a valid permission mask (owner read/write only)
        // - shm_open returns a valid fd on success or -1 on error (checked below)
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_CREAT | libc::O_RDWR | libc::O_EXCL, 0o600) };

        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::AlreadyExists {
                return Err(ZeroBufferError::AlreadyExists(name.to_string()));
            }
            return Err(ZeroBufferError::Backend(err));
        }

        // SAFETY:
        // - fd is a valid descriptor from the successful shm_open above
        // - ftruncate fails gracefully if size exceeds system limits
        let ret = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is still valid; error path, fd not reused after close
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(ZeroBufferError::Backend(err));
        }

        let ptr = map(fd, size);

        // SAFETY: fd is valid; the mapping (if any) holds its own reference
        unsafe { libc::close(fd) };

        let ptr = ptr.map_err(|e| {
            // SAFETY: c_name is valid; failed create rolls the name back
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
            e
        })?;

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// Open an existing shared memory segment, mapping its full extent.
    ///
    /// The segment size is discovered via `fstat`, so the caller needs no
    /// prior knowledge of how large the creator made it.
    ///
    /// # Errors
    ///
    /// `BufferNotFound` when no segment has this name,
    /// `Backend` for any other OS failure.
    pub fn open(name: &str) -> Result<Self> {
        let c_name = to_c_name(name)?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - O_RDWR opens an existing segment for read/write; mode is ignored
        // - shm_open returns a valid fd on success or -1 on error (checked below)
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(ZeroBufferError::BufferNotFound(name.to_string()));
            }
            return Err(ZeroBufferError::Backend(err));
        }

        // Discover the segment size
        // SAFETY:
        // - fd is a valid descriptor from the successful shm_open above
        // - stat is a properly sized, writable out-parameter
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::fstat(fd, &mut stat) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is valid; error path, fd not reused after close
            unsafe { libc::close(fd) };
            return Err(ZeroBufferError::Backend(err));
        }
        let size = stat.st_size as usize;

        let ptr = map(fd, size);

        // SAFETY: fd is valid; the mapping (if any) holds its own reference
        unsafe { libc::close(fd) };

        Ok(Self {
            ptr: ptr?,
            size,
            name: name.to_string(),
        })
    }

    /// Unlink (delete) a shared memory segment by name.
    ///
    /// The segment disappears once every process unmaps it. Not-found is
    /// treated as success (idempotent cleanup).
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = to_c_name(name)?;

        // SAFETY:
        // - c_name is a valid null-terminated CString created above
        // - shm_unlink only touches the filesystem namespace
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ZeroBufferError::Backend(err));
            }
        }

        Ok(())
    }

    /// Check if a segment with the given name exists
    #[must_use]
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = to_c_name(name) else {
            return false;
        };

        // SAFETY: c_name is a valid CString; O_RDONLY probes existence only
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };

        if fd >= 0 {
            // SAFETY: fd is valid (>= 0) and not used after this close
            unsafe { libc::close(fd) };
            true
        } else {
            false
        }
    }

    /// Get raw pointer to the mapped memory
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Get the size of the mapping
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the segment name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish all prior stores to the other process.
    ///
    /// Shared anonymous memory on the supported targets only needs a
    /// memory barrier, not an `msync`, for cross-process visibility.
    #[inline]
    pub fn flush(&self) {
        fence(Ordering::SeqCst);
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        // SAFETY:
        // - self.ptr came from a successful mmap with exactly self.size bytes
        // - Drop runs once; the pointer is not used afterwards
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
        }
        // The name is NOT unlinked here; stale reclamation owns that decision.
    }
}

/// Map `size` bytes of `fd` read/write, shared
fn map(fd: libc::c_int, size: usize) -> Result<*mut u8> {
    // SAFETY:
    // - null hint lets the kernel choose the address
    // - PROT_READ|PROT_WRITE with MAP_SHARED is a valid shared mapping
    // - fd is valid per the caller; offset 0 maps from the start
    // - MAP_FAILED is checked below
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(ZeroBufferError::Backend(io::Error::last_os_error()));
    }

    Ok(ptr as *mut u8)
}

/// Validate and convert a POSIX resource name
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

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/zb_shm_test_{ts}")
    }

    #[test]
    fn test_create_and_open() {
        let name = unique_name();
        let size = 4096;

        let seg1 = SharedMemory::create_exclusive(&name, size).expect("create");
        assert_eq!(seg1.size(), size);

        // SAFETY: seg1 was just created with 4096 bytes; offsets 0 and 1 are valid
        unsafe {
            *seg1.as_ptr() = 0x42;
            *seg1.as_ptr().add(1) = 0x43;
        }
        seg1.flush();

        // Same segment from "another process"; size comes from fstat
        let seg2 = SharedMemory::open(&name).expect("open");
        assert_eq!(seg2.size(), size);

        // SAFETY: seg2 maps the same 4096-byte segment written above
        unsafe {
            assert_eq!(*seg2.as_ptr(), 0x42);
            assert_eq!(*seg2.as_ptr().add(1), 0x43);
        }

        drop(seg1);
        drop(seg2);
        SharedMemory::unlink(&name).ok();
    }

    #[test]
    fn test_create_exclusive_collision() {
        let name = unique_name();

        let _seg1 = SharedMemory::create_exclusive(&name, 4096).expect("create");
        let result = SharedMemory::create_exclusive(&name, 4096);
        assert!(matches!(result, Err(ZeroBufferError::AlreadyExists(_))));

        SharedMemory::unlink(&name).ok();
    }

    #[test]
    fn test_open_nonexistent() {
        let result = SharedMemory::open("/zb_shm_nonexistent_12345");
        assert!(matches!(result, Err(ZeroBufferError::BufferNotFound(_))));
    }

    #[test]
    fn test_created_segment_is_zeroed() {
        let name = unique_name();
        let seg = SharedMemory::create_exclusive(&name, 4096).expect("create");

        // SAFETY: seg maps 4096 freshly-truncated bytes
        let bytes = unsafe { std::slice::from_raw_parts(seg.as_ptr(), seg.size()) };
        assert!(bytes.iter().all(|&b| b == 0));

        SharedMemory::unlink(&name).ok();
    }

    #[test]
    fn test_exists() {
        let name = unique_name();

        assert!(!SharedMemory::exists(&name));
        let _seg = SharedMemory::create_exclusive(&name, 4096).expect("create");
        assert!(SharedMemory::exists(&name));

        SharedMemory::unlink(&name).ok();
    }

    #[test]
    fn test_unlink_idempotent() {
        let name = unique_name();

        let _seg = SharedMemory::create_exclusive(&name, 4096).expect("create");
        assert!(SharedMemory::unlink(&name).is_ok());
        assert!(SharedMemory::unlink(&name).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(SharedMemory::open("no-leading-slash").is_err());
        assert!(SharedMemory::open("/nested/name").is_err());
    }
}
