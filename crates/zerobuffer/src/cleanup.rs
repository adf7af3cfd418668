// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Stale-resource reclamation.
//!
//! Buffers left behind by crashed processes keep their shared memory
//! segment, both semaphores and a lock file alive in the OS namespace.
//! Every buffer creation scans the lock directory and reclaims what
//! provably has no live owner:
//!
//! 1. Grab each lock file non-blocking; success proves the owner is gone
//! 2. Probe both PIDs recorded in the buffer's OIEB
//! 3. Unlink segment and semaphores only when both are zero or dead
//!
//! Step 3 is the stale-reclamation rule: named resources are removed only
//! by a process that holds the advisory lock and has verified both PIDs.

use crate::layout::{Oieb, OIEB_SIZE};
use crate::platform::{process_exists, FileLock, NamedSemaphore, SharedMemory};
use crate::{lock_dir, segment_name, sem_read_name, sem_write_name};
use std::fs;

/// Scan the lock directory and reclaim every buffer with no live owner.
///
/// Returns the number of buffers reclaimed. Runs automatically at buffer
/// creation; harmless to call at any other time.
pub fn reclaim_stale_buffers() -> usize {
    let dir = lock_dir();
    let Ok(entries) = fs::read_dir(&dir) else {
        return 0;
    };

    let mut cleaned = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
            continue;
        };

        if !FileLock::try_remove_stale(&path) {
            // Live owner holds the flock; not ours to touch
            continue;
        }

        if remove_buffer_if_dead(&name) {
            log::info!("[ZB] Reclaimed stale buffer '{name}'");
            cleaned += 1;
        }
    }

    cleaned
}

/// Unlink a buffer's segment and semaphores if both recorded PIDs are
/// zero or dead. Returns `true` when the resources were removed.
///
/// The caller must have established ownership (advisory lock reclaimed or
/// a create-exclusive collision on a name it is entitled to).
pub(crate) fn remove_buffer_if_dead(name: &str) -> bool {
    let seg_name = segment_name(name);

    match SharedMemory::open(&seg_name) {
        Ok(shm) if shm.size() as u64 >= OIEB_SIZE => {
            // SAFETY:
            // - the mapping holds at least OIEB_SIZE bytes (checked above)
            // - mmap alignment satisfies Oieb; the PID fields are atomics
            let oieb = unsafe { &*(shm.as_ptr() as *const Oieb) };
            let reader = oieb.reader_pid();
            let writer = oieb.writer_pid();

            if process_exists(reader) || process_exists(writer) {
                log::debug!(
                    "[ZB] Buffer '{name}' has a live attachment (reader={reader}, writer={writer}); skipping"
                );
                return false;
            }

            drop(shm);
            unlink_buffer_resources(name);
            true
        }
        Ok(_) => {
            // Truncated segment cannot carry a control block; remove it
            unlink_buffer_resources(name);
            true
        }
        Err(crate::ZeroBufferError::BufferNotFound(_)) => {
            // Segment already gone; clear any leftover semaphores
            unlink_buffer_resources(name);
            true
        }
        Err(e) => {
            log::debug!("[ZB] Could not inspect buffer '{name}' for reclamation: {e}");
            false
        }
    }
}

/// Best-effort unlink of a buffer's named resources
fn unlink_buffer_resources(name: &str) {
    if let Err(e) = SharedMemory::unlink(&segment_name(name)) {
        log::debug!("[ZB] Segment unlink failed for '{name}': {e}");
    }
    if let Err(e) = NamedSemaphore::unlink(&sem_write_name(name)) {
        log::debug!("[ZB] Semaphore unlink failed for '{name}': {e}");
    }
    if let Err(e) = NamedSemaphore::unlink(&sem_read_name(name)) {
        log::debug!("[ZB] Semaphore unlink failed for '{name}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BufferLayout;
    use crate::lock_path;
    use crate::platform::current_pid;

    fn unique_name() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("zb_cleanup_test_{ts}")
    }

    /// Fabricate a crashed buffer: segment + semaphores + unheld lock file
    fn plant_dead_buffer(name: &str, reader_pid: u64, writer_pid: u64) {
        let layout = BufferLayout::new(0, 1024);
        let shm =
            SharedMemory::create_exclusive(&segment_name(name), layout.total_size() as usize)
                .expect("segment");
        // SAFETY: freshly created segment, sized for the full layout
        unsafe {
            std::ptr::write(shm.as_ptr() as *mut Oieb, Oieb::new(&layout, reader_pid));
        }
        let oieb = unsafe { &*(shm.as_ptr() as *const Oieb) };
        oieb.set_writer_pid(writer_pid);

        NamedSemaphore::create_exclusive(&sem_write_name(name), 0).expect("sem w");
        NamedSemaphore::create_exclusive(&sem_read_name(name), 0).expect("sem r");

        let path = lock_path(name);
        fs::create_dir_all(path.parent().unwrap()).expect("lock dir");
        fs::write(&path, b"").expect("lock file");
    }

    // Above any real pid_max, so provably not a running process
    const DEAD_PID: u64 = 0xFFFF_FFFF;

    #[test]
    fn test_reclaims_dead_buffer() {
        let name = unique_name();
        plant_dead_buffer(&name, DEAD_PID, 0);

        // Another concurrent creator may win the race; either way the
        // resources must be gone afterwards.
        reclaim_stale_buffers();

        assert!(!SharedMemory::exists(&segment_name(&name)));
        assert!(!lock_path(&name).exists());
        assert!(NamedSemaphore::open(&sem_write_name(&name)).is_err());
        assert!(NamedSemaphore::open(&sem_read_name(&name)).is_err());
    }

    #[test]
    fn test_skips_live_buffer() {
        let name = unique_name();
        // Our own PID is alive, so the buffer must survive the scan
        plant_dead_buffer(&name, current_pid(), 0);

        reclaim_stale_buffers();

        assert!(SharedMemory::exists(&segment_name(&name)));

        // Manual cleanup
        unlink_buffer_resources(&name);
        fs::remove_file(lock_path(&name)).ok();
    }

    #[test]
    fn test_reclaims_orphan_lock_without_segment() {
        let name = unique_name();
        let path = lock_path(&name);
        fs::create_dir_all(path.parent().unwrap()).expect("lock dir");
        fs::write(&path, b"").expect("lock file");

        reclaim_stale_buffers();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_buffer_if_dead_both_zero() {
        let name = unique_name();
        plant_dead_buffer(&name, 0, 0);
        fs::remove_file(lock_path(&name)).ok();

        assert!(remove_buffer_if_dead(&name));
        assert!(!SharedMemory::exists(&segment_name(&name)));
    }
}
