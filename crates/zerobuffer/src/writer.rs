// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Writer engine.
//!
//! Connects to a reader-created buffer and publishes frames into the
//! payload ring.
//!
//! # Commit Protocol
//!
//! 1. Allocate: wait until `payload_free_bytes` covers the record (plus
//!    any wasted tail when the record must wrap)
//! 2. Wrap if needed: emit a wrap marker, debit the tail, jump to offset 0
//! 3. Write the `FrameHeader` and let the caller fill the payload in place
//! 4. Commit: advance `payload_write_pos`, bump `payload_written_count`,
//!    debit `payload_free_bytes`, barrier, post "data-available" once
//!
//! A full ring suspends the allocation on "space-available", gated by
//! `write_timeout` per suspension; expiry probes the reader's PID and
//! surfaces either `BufferFull` (reader alive) or `ReaderDead`.

use crate::config::DEFAULT_WRITE_TIMEOUT;
use crate::frame::FrameBuffer;
use crate::layout::{BufferLayout, FrameHeader, Oieb, FRAME_HEADER_SIZE, OIEB_SIZE};
use crate::metrics::{global_metrics, WriterMetrics};
use crate::platform::{current_pid, process_exists, NamedSemaphore, SharedMemory};
use crate::{
    segment_name, sem_read_name, sem_write_name, validate_buffer_name, Result, ZeroBufferError,
};
use std::sync::atomic::{fence, Ordering};
use std::time::Duration;

/// Frame allocated but not yet committed
struct PendingFrame {
    /// Ring offset of the frame header
    pos: u64,
    /// Header + payload size in bytes
    record: u64,
}

/// Writer end of a zero-copy buffer.
///
/// At most one writer may be attached to a buffer at a time; the OIEB's
/// `writer_pid` slot enforces this. The writer clears its PID on drop but
/// never unlinks the named resources (the reader side owns their
/// lifetime).
///
/// Not internally synchronized: one thread drives the API.
pub struct Writer {
    shm: SharedMemory,
    /// "data-available": posted once per committed frame
    sem_data: NamedSemaphore,
    /// "space-available": waited on when the ring is full
    sem_space: NamedSemaphore,
    layout: BufferLayout,
    buffer_name: String,
    next_sequence: u64,
    pending_frame: Option<PendingFrame>,
    pending_metadata: Option<usize>,
    write_timeout: Duration,
    /// Per-writer counters
    pub metrics: WriterMetrics,
}

impl Writer {
    /// Connect to an existing buffer.
    ///
    /// Verifies the control block (size and major version), rejects a
    /// second live writer, then claims the writer slot.
    ///
    /// # Errors
    ///
    /// `BufferNotFound` when no reader created the buffer,
    /// `IncompatibleVersion` on a control-block mismatch,
    /// `WriterAlreadyConnected` when another live writer holds the slot.
    pub fn new(buffer_name: &str) -> Result<Self> {
        validate_buffer_name(buffer_name)?;

        let shm = SharedMemory::open(&segment_name(buffer_name))?;
        if (shm.size() as u64) < OIEB_SIZE {
            return Err(ZeroBufferError::BufferNotReady(
                "segment smaller than control block",
            ));
        }

        // SAFETY:
        // - shm maps at least OIEB_SIZE bytes (checked above)
        // - the creator placed an Oieb at offset 0; mmap returns page-aligned
        //   memory, satisfying the struct's alignment
        // - all mutable Oieb fields are atomics, safe to share across processes
        let oieb = unsafe { &*(shm.as_ptr() as *const Oieb) };

        if oieb.oieb_size() != OIEB_SIZE || !oieb.validate() {
            let v = oieb.version();
            return Err(ZeroBufferError::IncompatibleVersion {
                expected_major: crate::layout::ProtocolVersion::CURRENT.major,
                major: v.major,
                minor: v.minor,
                patch: v.patch,
            });
        }

        let layout = BufferLayout::new(oieb.metadata_size(), oieb.payload_size());
        if layout.total_size() != shm.size() as u64 {
            return Err(ZeroBufferError::BufferNotReady(
                "segment size disagrees with control block",
            ));
        }

        let existing = oieb.writer_pid();
        if existing != 0 && process_exists(existing) {
            return Err(ZeroBufferError::WriterAlreadyConnected(
                buffer_name.to_string(),
            ));
        }

        let sem_data = NamedSemaphore::open(&sem_write_name(buffer_name))?;
        let sem_space = NamedSemaphore::open(&sem_read_name(buffer_name))?;

        oieb.set_writer_pid(current_pid());
        shm.flush();

        log::info!(
            "[ZB] Writer attached to buffer '{}' (payload {} bytes)",
            buffer_name,
            layout.payload_size()
        );

        Ok(Self {
            shm,
            sem_data,
            sem_space,
            layout,
            buffer_name: buffer_name.to_string(),
            next_sequence: 1,
            pending_frame: None,
            pending_metadata: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            metrics: WriterMetrics::new(),
        })
    }

    /// The control block at offset 0
    #[inline]
    fn oieb(&self) -> &Oieb {
        // SAFETY:
        // - the mapping holds a validated Oieb at offset 0 (checked in new())
        // - mmap alignment satisfies the struct; mutable fields are atomics
        // - the reference cannot outlive &self, which owns the mapping
        unsafe { &*(self.shm.as_ptr() as *const Oieb) }
    }

    /// Raw pointer `offset` bytes into the payload ring
    #[inline]
    fn payload_ptr(&self, offset: u64) -> *mut u8 {
        debug_assert!(offset < self.layout.payload_size());
        // SAFETY:
        // - payload_offset + offset < total_size (layout invariant plus the
        //   debug_assert above), so the pointer stays inside the mapping
        unsafe {
            self.shm
                .as_ptr()
                .add((self.layout.payload_offset() + offset) as usize)
        }
    }

    /// Write the buffer's metadata, at most once per buffer lifetime.
    ///
    /// Stores an 8-byte length prefix followed by `data` into the metadata
    /// block. `metadata_written_bytes` records prefix + payload.
    ///
    /// # Errors
    ///
    /// `MetadataAlreadyWritten`, `MetadataTooLarge`, or `BufferNotReady`
    /// while a two-phase metadata write is in flight.
    pub fn set_metadata(&mut self, data: &[u8]) -> Result<()> {
        if self.pending_metadata.is_some() {
            return Err(ZeroBufferError::BufferNotReady(
                "metadata buffer already acquired",
            ));
        }
        self.check_metadata_fits(data.len())?;

        // SAFETY:
        // - the metadata block spans [metadata_offset, metadata_offset + metadata_size)
        //   and 8 + data.len() fits (checked in check_metadata_fits)
        // - only this writer touches the block (metadata is write-once and the
        //   reader reads it only after metadata_written_bytes publishes it)
        unsafe {
            let base = self
                .shm
                .as_ptr()
                .add(BufferLayout::metadata_offset() as usize);
            let prefix = (data.len() as u64).to_le_bytes();
            std::ptr::copy_nonoverlapping(prefix.as_ptr(), base, 8);
            std::ptr::copy_nonoverlapping(data.as_ptr(), base.add(8), data.len());
        }

        self.shm.flush();
        self.oieb()
            .set_metadata_written(8 + data.len() as u64);

        log::debug!(
            "[ZB] Metadata written to '{}': {} bytes",
            self.buffer_name,
            data.len()
        );
        Ok(())
    }

    /// Two-phase metadata write: borrow a writable region of `size` bytes.
    ///
    /// Fill the buffer, then publish with [`Writer::commit_metadata`].
    pub fn get_metadata_buffer(&mut self, size: usize) -> Result<FrameBuffer<'_>> {
        if self.pending_metadata.is_some() {
            return Err(ZeroBufferError::BufferNotReady(
                "metadata buffer already acquired",
            ));
        }
        self.check_metadata_fits(size)?;

        self.pending_metadata = Some(size);

        // SAFETY:
        // - [metadata_offset + 8, metadata_offset + 8 + size) is inside the
        //   metadata block (checked in check_metadata_fits)
        // - the returned slice borrows &mut self, so no aliasing writer access
        //   exists until it is dropped
        let data = unsafe {
            std::slice::from_raw_parts_mut(
                self.shm
                    .as_ptr()
                    .add(BufferLayout::metadata_offset() as usize + 8),
                size,
            )
        };
        Ok(FrameBuffer::new(data))
    }

    /// Publish the metadata region acquired with `get_metadata_buffer`.
    pub fn commit_metadata(&mut self) -> Result<()> {
        let size = self
            .pending_metadata
            .take()
            .ok_or(ZeroBufferError::BufferNotReady("no metadata buffer acquired"))?;

        // SAFETY: the metadata block holds at least 8 bytes whenever a
        // metadata acquire succeeded
        unsafe {
            let base = self
                .shm
                .as_ptr()
                .add(BufferLayout::metadata_offset() as usize);
            let prefix = (size as u64).to_le_bytes();
            std::ptr::copy_nonoverlapping(prefix.as_ptr(), base, 8);
        }

        self.shm.flush();
        self.oieb().set_metadata_written(8 + size as u64);

        log::debug!(
            "[ZB] Metadata committed to '{}': {size} bytes",
            self.buffer_name
        );
        Ok(())
    }

    fn check_metadata_fits(&self, len: usize) -> Result<()> {
        if self.oieb().metadata_written() != 0 {
            return Err(ZeroBufferError::MetadataAlreadyWritten);
        }
        let total = 8 + len as u64;
        if total > self.layout.metadata_size() {
            return Err(ZeroBufferError::MetadataTooLarge {
                size: len,
                capacity: self.layout.metadata_size() as usize,
            });
        }
        Ok(())
    }

    /// Allocate a `size`-byte frame in the ring.
    ///
    /// Returns a writable view over the payload region and the sequence
    /// number the frame will carry once committed. The allocation blocks
    /// while the ring lacks space, gated by [`Writer::write_timeout`] per
    /// suspension.
    ///
    /// # Errors
    ///
    /// `FrameTooLarge` when the record can never fit,
    /// `BufferFull` when the wait expired with the reader alive,
    /// `ReaderDead` when the wait expired and the reader is gone,
    /// `BufferNotReady` when a previous allocation is still uncommitted.
    pub fn get_frame_buffer(&mut self, size: usize) -> Result<(FrameBuffer<'_>, u64)> {
        if self.pending_frame.is_some() {
            return Err(ZeroBufferError::BufferNotReady(
                "frame already acquired; commit it first",
            ));
        }
        if size == 0 {
            // zero-length records are reserved for wrap markers
            return Err(ZeroBufferError::InvalidFrameSize(0));
        }

        let payload_size = self.layout.payload_size();
        let record = FRAME_HEADER_SIZE + size as u64;
        if record > payload_size {
            return Err(ZeroBufferError::FrameTooLarge {
                size,
                capacity: payload_size as usize,
            });
        }

        let (write_pos, space_to_end, needs_wrap) = self.wait_for_space(record)?;

        let oieb = self.oieb();
        let mut pos = write_pos;
        if needs_wrap {
            if space_to_end >= FRAME_HEADER_SIZE {
                // SAFETY:
                // - write_pos leaves at least FRAME_HEADER_SIZE bytes to the
                //   ring end (checked above), so the 16-byte marker fits
                // - record offsets are not 8-byte aligned in general, hence
                //   the unaligned write
                unsafe {
                    std::ptr::write_unaligned(
                        self.payload_ptr(pos) as *mut FrameHeader,
                        FrameHeader::WRAP_MARKER,
                    );
                }
                oieb.inc_written_count();
                self.metrics.wrap_markers.fetch_add(1, Ordering::Relaxed);
                global_metrics().inc_wrap_markers();
            }
            // The wasted tail (marker included) counts as consumed; the
            // reader credits it back when it takes the jump.
            oieb.debit_payload(space_to_end);
            oieb.set_write_pos(0);
            pos = 0;
            debug_assert!(oieb.payload_free() >= record);
        }

        let sequence = self.next_sequence;
        // SAFETY: pos + record <= payload_size after the wrap handling, so
        // header and payload stay inside the ring; unaligned for the same
        // reason as the marker above
        unsafe {
            std::ptr::write_unaligned(
                self.payload_ptr(pos) as *mut FrameHeader,
                FrameHeader {
                    payload_size: size as u64,
                    sequence_number: sequence,
                },
            );
        }

        self.pending_frame = Some(PendingFrame { pos, record });

        // SAFETY:
        // - [pos + 16, pos + 16 + size) is inside the ring (pos + record <=
        //   payload_size)
        // - the region was allocated out of payload_free_bytes, so the reader
        //   holds no live view over it
        // - the slice borrows &mut self; no aliasing access until it drops
        let data = unsafe {
            std::slice::from_raw_parts_mut(
                self.payload_ptr(pos).add(FRAME_HEADER_SIZE as usize),
                size,
            )
        };
        Ok((FrameBuffer::new(data), sequence))
    }

    /// Publish the frame written into the last acquired buffer.
    ///
    /// Advances `payload_write_pos`, bumps `payload_written_count`, debits
    /// `payload_free_bytes`, flushes, then posts "data-available" exactly
    /// once.
    pub fn commit_frame(&mut self) -> Result<()> {
        let pending = self
            .pending_frame
            .take()
            .ok_or(ZeroBufferError::BufferNotReady("no frame acquired"))?;

        let payload_size = self.layout.payload_size();
        let oieb = self.oieb();

        oieb.set_write_pos((pending.pos + pending.record) % payload_size);
        oieb.inc_written_count();
        oieb.debit_payload(pending.record);

        // Frame bytes must be visible before the reader wakes
        self.shm.flush();
        self.sem_data.post()?;

        self.next_sequence += 1;
        self.metrics.frames_written.fetch_add(1, Ordering::Relaxed);
        global_metrics().inc_frames_written();
        global_metrics().inc_sem_posts();
        Ok(())
    }

    /// Convenience: allocate, copy `data` in, and commit.
    ///
    /// Returns the sequence number assigned to the frame.
    pub fn write_frame(&mut self, data: &[u8]) -> Result<u64> {
        let sequence = {
            let (mut buf, sequence) = self.get_frame_buffer(data.len())?;
            buf.copy_from_slice(data);
            sequence
        };
        self.commit_frame()?;
        Ok(sequence)
    }

    /// Wait until the ring has room for `record` bytes (tail waste
    /// included when wrapping). Returns the allocation geometry.
    fn wait_for_space(&mut self, record: u64) -> Result<(u64, u64, bool)> {
        let payload_size = self.layout.payload_size();
        let mut blocked = false;

        loop {
            let oieb = self.oieb();
            let write_pos = oieb.write_pos();
            let space_to_end = payload_size - write_pos;
            let needs_wrap = space_to_end < record;
            let required = if needs_wrap {
                space_to_end + record
            } else {
                record
            };

            if oieb.payload_free() >= required {
                return Ok((write_pos, space_to_end, needs_wrap));
            }

            if !blocked {
                blocked = true;
                self.metrics.blocking_writes.fetch_add(1, Ordering::Relaxed);
            }

            global_metrics().inc_sem_waits();
            let acquired = self.sem_space.wait(Some(self.write_timeout))?;
            if !acquired {
                self.metrics.wait_timeouts.fetch_add(1, Ordering::Relaxed);
                return if self.is_reader_connected() {
                    Err(ZeroBufferError::BufferFull)
                } else {
                    Err(ZeroBufferError::ReaderDead)
                };
            }
            // The reader may have freed non-contiguous space; re-read the
            // accounting from scratch.
            fence(Ordering::Acquire);
        }
    }

    /// Is a live reader attached?
    #[must_use]
    pub fn is_reader_connected(&self) -> bool {
        let pid = self.oieb().reader_pid();
        pid != 0 && process_exists(pid)
    }

    /// Sequence number the next committed frame will carry
    #[inline]
    #[must_use]
    pub fn pending_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Logical frames committed so far (wrap markers excluded)
    #[inline]
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Records committed as the OIEB counts them (logical frames plus
    /// wrap markers)
    #[must_use]
    pub fn written_count(&self) -> u64 {
        self.oieb().written_count()
    }

    /// Gate on each suspension in the backpressure loop
    #[inline]
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Change the backpressure gate
    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    /// Name of the attached buffer
    #[must_use]
    pub fn buffer_name(&self) -> &str {
        &self.buffer_name
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.oieb().set_writer_pid(0);
        self.shm.flush();
        log::debug!("[ZB] Writer detached from buffer '{}'", self.buffer_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::reader::Reader;

    fn unique_name() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("zb_writer_test_{ts}")
    }

    #[test]
    fn test_connect_missing_buffer() {
        let result = Writer::new("zb_writer_test_missing");
        assert!(matches!(result, Err(ZeroBufferError::BufferNotFound(_))));
    }

    #[test]
    fn test_connect_and_write() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 10240)).expect("reader");

        let mut writer = Writer::new(&name).expect("writer");
        assert_eq!(writer.pending_sequence(), 1);
        assert_eq!(writer.frames_written(), 0);

        let seq = writer.write_frame(b"hello").expect("write");
        assert_eq!(seq, 1);
        assert_eq!(writer.pending_sequence(), 2);
        assert_eq!(writer.frames_written(), 1);
        assert_eq!(writer.written_count(), 1);
        assert_eq!(writer.metrics.frames_written(), 1);
    }

    #[test]
    fn test_second_writer_rejected() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 10240)).expect("reader");

        let mut writer_a = Writer::new(&name).expect("writer a");
        writer_a.write_frame(b"before").expect("write");

        let result = Writer::new(&name);
        assert!(matches!(
            result,
            Err(ZeroBufferError::WriterAlreadyConnected(_))
        ));

        // Writer A is unperturbed
        let seq = writer_a.write_frame(b"after").expect("write");
        assert_eq!(seq, 2);
    }

    #[test]
    fn test_writer_slot_reclaimed_after_drop() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 10240)).expect("reader");

        let writer_a = Writer::new(&name).expect("writer a");
        drop(writer_a);

        // The slot was cleared, so a new writer may attach
        let _writer_b = Writer::new(&name).expect("writer b");
    }

    #[test]
    fn test_frame_too_large() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        // record = 16 + size must not exceed the ring
        let result = writer.get_frame_buffer(1024 - 15);
        assert!(matches!(result, Err(ZeroBufferError::FrameTooLarge { .. })));

        // Largest frame that fits
        assert!(writer.get_frame_buffer(1024 - 16).is_ok());
    }

    #[test]
    fn test_zero_size_frame_rejected() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        assert!(matches!(
            writer.get_frame_buffer(0),
            Err(ZeroBufferError::InvalidFrameSize(0))
        ));
    }

    #[test]
    fn test_commit_without_acquire() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        assert!(matches!(
            writer.commit_frame(),
            Err(ZeroBufferError::BufferNotReady(_))
        ));
    }

    #[test]
    fn test_double_acquire_rejected() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        {
            let (_buf, seq) = writer.get_frame_buffer(64).expect("acquire");
            assert_eq!(seq, 1);
        }
        assert!(matches!(
            writer.get_frame_buffer(64),
            Err(ZeroBufferError::BufferNotReady(_))
        ));

        // Committing the first acquire unblocks the writer again
        writer.commit_frame().expect("commit");
        assert!(writer.get_frame_buffer(64).is_ok());
    }

    #[test]
    fn test_metadata_once() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(256, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        writer.set_metadata(b"first").expect("metadata");
        assert!(matches!(
            writer.set_metadata(b"second"),
            Err(ZeroBufferError::MetadataAlreadyWritten)
        ));
    }

    #[test]
    fn test_metadata_too_large() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(64, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        // 8-byte prefix + 57 bytes exceeds the 64-byte block
        let result = writer.set_metadata(&[0u8; 57]);
        assert!(matches!(
            result,
            Err(ZeroBufferError::MetadataTooLarge { .. })
        ));

        // Prefix + 56 bytes fits exactly
        writer.set_metadata(&[0u8; 56]).expect("metadata");
    }

    #[test]
    fn test_metadata_rejected_without_block() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        assert!(matches!(
            writer.set_metadata(b"x"),
            Err(ZeroBufferError::MetadataTooLarge { .. })
        ));
    }

    #[test]
    fn test_two_phase_metadata() {
        let name = unique_name();
        let reader = Reader::new(&name, BufferConfig::new(256, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        {
            let mut buf = writer.get_metadata_buffer(16).expect("acquire");
            buf.copy_from_slice(&[0xAB; 16]);
        }
        writer.commit_metadata().expect("commit");

        assert_eq!(reader.get_metadata(), &[0xAB; 16][..]);
        assert!(matches!(
            writer.set_metadata(b"late"),
            Err(ZeroBufferError::MetadataAlreadyWritten)
        ));
    }

    #[test]
    fn test_commit_metadata_without_acquire() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(256, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        assert!(matches!(
            writer.commit_metadata(),
            Err(ZeroBufferError::BufferNotReady(_))
        ));
    }

    #[test]
    fn test_is_reader_connected() {
        let name = unique_name();
        let reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let writer = Writer::new(&name).expect("writer");

        assert!(writer.is_reader_connected());
        drop(reader);
        assert!(!writer.is_reader_connected());
    }

    #[test]
    fn test_write_timeout_accessor() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 1024)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");

        assert_eq!(writer.write_timeout(), DEFAULT_WRITE_TIMEOUT);
        writer.set_write_timeout(Duration::from_millis(20));
        assert_eq!(writer.write_timeout(), Duration::from_millis(20));
    }

    #[test]
    fn test_full_buffer_times_out_with_live_reader() {
        let name = unique_name();
        let _reader = Reader::new(&name, BufferConfig::new(0, 256)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");
        writer.set_write_timeout(Duration::from_millis(50));

        // 2 x 116-byte records fill 232 of 256 bytes; the third cannot fit
        writer.write_frame(&[1u8; 100]).expect("write 1");
        writer.write_frame(&[2u8; 100]).expect("write 2");

        let result = writer.write_frame(&[3u8; 100]);
        assert!(matches!(result, Err(ZeroBufferError::BufferFull)));
        assert!(writer.metrics.blocking_writes() >= 1);
        assert!(writer.metrics.wait_timeouts() >= 1);
    }

    #[test]
    fn test_full_buffer_with_dead_reader() {
        let name = unique_name();
        let reader = Reader::new(&name, BufferConfig::new(0, 256)).expect("reader");
        let mut writer = Writer::new(&name).expect("writer");
        writer.set_write_timeout(Duration::from_millis(50));

        writer.write_frame(&[1u8; 100]).expect("write 1");
        writer.write_frame(&[2u8; 100]).expect("write 2");
        drop(reader);

        let result = writer.write_frame(&[3u8; 100]);
        assert!(matches!(result, Err(ZeroBufferError::ReaderDead)));
    }
}
