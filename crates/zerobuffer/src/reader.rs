// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Reader engine.
//!
//! The reader owns the buffer: it creates the shared memory segment, both
//! semaphores and the advisory lock, and is the side that consumes frames.
//!
//! # Read Protocol
//!
//! 1. Wait on "data-available" with the caller's timeout
//! 2. Read the frame header at `payload_read_pos`
//! 3. A wrap marker credits the wasted tail back and jumps to offset 0
//!    without posting "space-available" (the writer's single post per
//!    commit covers marker + frame)
//! 4. Expose the payload as a borrowed [`Frame`]; the record's space is
//!    credited and "space-available" posted only when the view drops
//!
//! A timed-out wait probes the writer's PID: alive means "no frame yet"
//! (`Ok(None)`), dead or never-attached means `WriterDead`.

use crate::cleanup;
use crate::config::BufferConfig;
use crate::frame::Frame;
use crate::layout::{BufferLayout, FrameHeader, Oieb, FRAME_HEADER_SIZE};
use crate::metrics::{global_metrics, ReaderMetrics};
use crate::platform::{current_pid, process_exists, FileLock, NamedSemaphore, SharedMemory};
use crate::{
    lock_path, segment_name, sem_read_name, sem_write_name, validate_buffer_name, Result,
    ZeroBufferError,
};
use std::sync::atomic::{fence, Ordering};
use std::time::{Duration, Instant};

/// Poll interval for `is_writer_connected`
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reader end of a zero-copy buffer; the buffer's creator and owner.
///
/// Dropping the reader clears its PID and releases the advisory lock but
/// leaves the named segment and semaphores for the next creator's stale
/// scan, so a still-attached writer can observe the dead reader.
///
/// Not internally synchronized: one thread drives the API.
pub struct Reader {
    shm: SharedMemory,
    /// "data-available": waited on for the next frame
    sem_data: NamedSemaphore,
    /// "space-available": posted once per released frame view
    sem_space: NamedSemaphore,
    /// Held for the buffer's lifetime; dropping unlinks the lock file
    _lock: FileLock,
    layout: BufferLayout,
    buffer_name: String,
    /// Sequence of the most recently returned frame, 0 before any
    last_sequence: u64,
    /// Per-reader counters
    pub metrics: ReaderMetrics,
}

impl Reader {
    /// Create a new buffer and take ownership of it.
    ///
    /// Runs the stale-resource scan first, then creates the segment
    /// exclusively, initializes the control block, and creates both
    /// semaphores. A create collision is probed once: resources whose
    /// recorded PIDs are all dead are reclaimed and creation retried;
    /// live ones fail with `ReaderAlreadyConnected`.
    pub fn new(buffer_name: &str, config: BufferConfig) -> Result<Self> {
        validate_buffer_name(buffer_name)?;
        config.validate()?;

        let layout = BufferLayout::new(config.metadata_size, config.payload_size);

        let reclaimed = cleanup::reclaim_stale_buffers();
        if reclaimed > 0 {
            log::debug!("[ZB] Reclaimed {reclaimed} stale buffer(s) before creating '{buffer_name}'");
        }

        let lock = FileLock::acquire(&lock_path(buffer_name)).map_err(|e| match e {
            ZeroBufferError::AlreadyExists(_) => {
                ZeroBufferError::ReaderAlreadyConnected(buffer_name.to_string())
            }
            other => other,
        })?;

        let seg_name = segment_name(buffer_name);
        let total = layout.total_size() as usize;

        let shm = match SharedMemory::create_exclusive(&seg_name, total) {
            Ok(shm) => shm,
            Err(ZeroBufferError::AlreadyExists(_)) => {
                // Possibly stale: we hold the advisory lock, so probe the
                // recorded PIDs and retry once.
                if !cleanup::remove_buffer_if_dead(buffer_name) {
                    return Err(ZeroBufferError::ReaderAlreadyConnected(
                        buffer_name.to_string(),
                    ));
                }
                SharedMemory::create_exclusive(&seg_name, total).map_err(|e| match e {
                    ZeroBufferError::AlreadyExists(_) => {
                        ZeroBufferError::ReaderAlreadyConnected(buffer_name.to_string())
                    }
                    other => other,
                })?
            }
            Err(e) => return Err(e),
        };

        // SAFETY:
        // - the segment was created with layout.total_size() >= OIEB_SIZE bytes
        // - mmap returns page-aligned memory, satisfying Oieb's alignment
        // - no peer can have mapped the segment between create and init
        unsafe {
            std::ptr::write(shm.as_ptr() as *mut Oieb, Oieb::new(&layout, current_pid()));
        }
        shm.flush();

        // We hold the advisory lock and just created the segment
        // exclusively, so any same-named semaphore is a stale leftover.
        let sem_data = match create_fresh_semaphore(&sem_write_name(buffer_name)) {
            Ok(sem) => sem,
            Err(e) => {
                SharedMemory::unlink(&seg_name).ok();
                return Err(e);
            }
        };
        let sem_space = match create_fresh_semaphore(&sem_read_name(buffer_name)) {
            Ok(sem) => sem,
            Err(e) => {
                NamedSemaphore::unlink(&sem_write_name(buffer_name)).ok();
                SharedMemory::unlink(&seg_name).ok();
                return Err(e);
            }
        };

        log::info!(
            "[ZB] Reader created buffer '{}' (metadata {} bytes, payload {} bytes)",
            buffer_name,
            layout.metadata_size(),
            layout.payload_size()
        );

        Ok(Self {
            shm,
            sem_data,
            sem_space,
            _lock: lock,
            layout,
            buffer_name: buffer_name.to_string(),
            last_sequence: 0,
            metrics: ReaderMetrics::new(),
        })
    }

    /// The control block at offset 0
    #[inline]
    fn oieb(&self) -> &Oieb {
        // SAFETY:
        // - the mapping holds the Oieb this reader initialized at offset 0
        // - mmap alignment satisfies the struct; mutable fields are atomics
        // - the reference cannot outlive &self, which owns the mapping
        unsafe { &*(self.shm.as_ptr() as *const Oieb) }
    }

    /// Raw pointer `offset` bytes into the payload ring
    #[inline]
    fn payload_ptr(&self, offset: u64) -> *const u8 {
        debug_assert!(offset < self.layout.payload_size());
        // SAFETY: payload_offset + offset < total_size (layout invariant
        // plus the debug_assert above)
        unsafe {
            self.shm
                .as_ptr()
                .add((self.layout.payload_offset() + offset) as usize)
        }
    }

    /// Frame header at ring offset `pos` (record offsets are not 8-byte
    /// aligned in general, hence the unaligned read)
    #[inline]
    fn read_header(&self, pos: u64) -> FrameHeader {
        // SAFETY: callers guarantee pos + FRAME_HEADER_SIZE <= payload_size,
        // so the 16-byte read stays inside the ring
        unsafe { std::ptr::read_unaligned(self.payload_ptr(pos) as *const FrameHeader) }
    }

    /// Borrowed view of the metadata payload, excluding the 8-byte length
    /// prefix. Empty until the writer publishes metadata.
    #[must_use]
    pub fn get_metadata(&self) -> &[u8] {
        let written = self.oieb().metadata_written();
        if written <= 8 {
            return &[];
        }
        let len = (written - 8) as usize;

        // SAFETY:
        // - metadata_written > 8 means the writer published prefix + len
        //   bytes inside the metadata block, all within the mapping
        // - metadata is write-once, so the bytes are immutable from here on
        unsafe {
            std::slice::from_raw_parts(
                self.shm
                    .as_ptr()
                    .add(BufferLayout::metadata_offset() as usize + 8),
                len,
            )
        }
    }

    /// Block up to `timeout` for the next logical frame.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - the next frame, in commit order
    /// * `Ok(None)` - timeout expired with the writer alive
    ///
    /// # Errors
    ///
    /// `WriterDead` when the wait expired and the writer PID is zero or
    /// dead; `InvalidFrameSize` when a header decodes to a length outside
    /// `(0, payload_size]`.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<Option<Frame<'_>>> {
        global_metrics().inc_sem_waits();
        let acquired = self.sem_data.wait(Some(timeout))?;
        if !acquired {
            let pid = self.oieb().writer_pid();
            if pid == 0 || !process_exists(pid) {
                return Err(ZeroBufferError::WriterDead);
            }
            self.metrics.empty_reads.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }
        // Pair with the writer's pre-post barrier
        fence(Ordering::Acquire);

        let payload_size = self.layout.payload_size();
        let oieb = self.oieb();
        let mut pos = oieb.read_pos();

        // Tail too small for a header: the writer wrapped implicitly, so
        // mirror it (credit the tail, no count bump, no post)
        if payload_size - pos < FRAME_HEADER_SIZE {
            oieb.credit_payload(payload_size - pos);
            oieb.set_read_pos(0);
            pos = 0;
        }

        let mut header = self.read_header(pos);
        if header.is_wrap_marker() {
            // Jump to ring start. No "space-available" post here: the
            // writer's single post per commit covers marker + frame.
            let wasted = payload_size - pos;
            oieb.credit_payload(wasted);
            oieb.inc_read_count();
            oieb.set_read_pos(0);
            pos = 0;
            self.metrics.wrap_jumps.fetch_add(1, Ordering::Relaxed);
            header = self.read_header(0);
        }

        // Defensive: unreachable under a correct peer. The record must
        // also fit between pos and the ring end, or the view would leave
        // the mapping.
        if header.payload_size == 0
            || header.payload_size > payload_size
            || header.record_size() > payload_size - pos
        {
            return Err(ZeroBufferError::InvalidFrameSize(header.payload_size));
        }

        let len = header.payload_size as usize;
        let data_ptr = self.payload_ptr(pos + FRAME_HEADER_SIZE);

        // Advance position and count now; free bytes are credited only
        // when the returned view drops (the RAII hook point).
        oieb.set_read_pos((pos + header.record_size()) % payload_size);
        oieb.inc_read_count();

        self.last_sequence = header.sequence_number;
        self.metrics.frames_read.fetch_add(1, Ordering::Relaxed);
        global_metrics().inc_frames_read();
        global_metrics().inc_sem_posts(); // the view's release post

        Ok(Some(Frame::new(
            data_ptr,
            len,
            header.sequence_number,
            self.oieb(),
            &self.sem_space,
        )))
    }

    /// Poll until a live writer is attached or `timeout` expires.
    ///
    /// `None` checks exactly once.
    #[must_use]
    pub fn is_writer_connected(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let pid = self.oieb().writer_pid();
            if pid != 0 && process_exists(pid) {
                return true;
            }
            match deadline {
                None => return false,
                Some(d) if Instant::now() >= d => return false,
                Some(_) => std::thread::sleep(CONNECT_POLL_INTERVAL),
            }
        }
    }

    /// Sequence number of the most recently returned frame, 0 before any.
    ///
    /// Wrap markers carry no sequence and never show up here.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Logical frames returned so far (wrap markers excluded)
    #[inline]
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.metrics.frames_read()
    }

    /// Records consumed as the OIEB counts them (logical frames plus
    /// wrap markers)
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.oieb().read_count()
    }

    /// Name of the owned buffer
    #[must_use]
    pub fn buffer_name(&self) -> &str {
        &self.buffer_name
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        // Clear the PID but keep the named resources: a still-attached
        // writer must be able to observe the dead reader, and the next
        // creator's stale scan unlinks everything.
        self.oieb().set_reader_pid(0);
        self.shm.flush();
        log::debug!("[ZB] Reader released buffer '{}'", self.buffer_name);
    }
}

/// Create a semaphore, clearing any stale leftover under the same name.
///
/// Only valid while holding the buffer's advisory lock.
fn create_fresh_semaphore(name: &str) -> Result<NamedSemaphore> {
    let _ = NamedSemaphore::unlink(name);
    NamedSemaphore::create_exclusive(name, 0)
}
