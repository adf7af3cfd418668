// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Borrowed frame views.
//!
//! [`Frame`] is the reader's zero-copy window onto one committed record in
//! the payload ring. The ring bytes under the view stay reserved until the
//! view drops: only then is the record's size credited back to
//! `payload_free_bytes` and "space-available" posted, so the writer can
//! never overwrite bytes a live view still exposes.
//!
//! [`FrameBuffer`] is the writer's scratch view over a freshly allocated
//! region, filled in place before `commit_frame`.

use crate::layout::{Oieb, FRAME_HEADER_SIZE};
use crate::platform::NamedSemaphore;
use std::ops::{Deref, DerefMut};

/// Borrowed, read-only view of one committed frame in the payload ring.
///
/// Dropping the view releases the record's ring space exactly once. The
/// borrow on the reader means a view can never outlive the mapping it
/// points into, and the reader cannot advance while a view is alive.
pub struct Frame<'a> {
    ptr: *const u8,
    len: usize,
    sequence: u64,
    oieb: &'a Oieb,
    space_sem: &'a NamedSemaphore,
}

impl<'a> Frame<'a> {
    /// View over `len` payload bytes at `ptr`, releasing through `oieb`
    /// and `space_sem` on drop.
    pub(crate) fn new(
        ptr: *const u8,
        len: usize,
        sequence: u64,
        oieb: &'a Oieb,
        space_sem: &'a NamedSemaphore,
    ) -> Self {
        Self {
            ptr,
            len,
            sequence,
            oieb,
            space_sem,
        }
    }

    /// Payload bytes (zero copy)
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY:
        // - ptr/len describe a committed record inside the mapped payload
        //   ring (invariant of the reader that constructed this view)
        // - the record's bytes stay reserved until this view drops, so the
        //   writer cannot touch them while the slice is alive
        // - the mapping outlives 'a (the view borrows the reader)
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Owned copy, for callers that cannot honor the borrow
    #[must_use]
    pub fn copy_to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Sequence number assigned at commit (starts at 1)
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Payload length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the payload is empty (never true for a committed frame)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Deref for Frame<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let record = FRAME_HEADER_SIZE + self.len as u64;

        // credit_payload's AcqRel fetch_add publishes the credit before
        // the post can wake the writer
        self.oieb.credit_payload(record);
        if let Err(e) = self.space_sem.post() {
            log::warn!("[ZB] space-available post failed on frame release: {e}");
        }
    }
}

impl std::fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("len", &self.len)
            .finish()
    }
}

/// Writable view over a freshly allocated frame region.
///
/// Handed out by `Writer::get_frame_buffer`; the caller fills it and then
/// calls `commit_frame` to publish. Derefs to `[u8]`.
pub struct FrameBuffer<'a> {
    data: &'a mut [u8],
}

impl<'a> FrameBuffer<'a> {
    pub(crate) fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Region length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Deref for FrameBuffer<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl DerefMut for FrameBuffer<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BufferLayout;

    fn unique_name() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/zb_frame_test_{ts}")
    }

    #[test]
    fn test_release_credits_and_posts_once() {
        let layout = BufferLayout::new(0, 1024);
        let oieb = Oieb::new(&layout, 1);
        let sem_name = unique_name();
        let sem = NamedSemaphore::create_exclusive(&sem_name, 0).expect("sem");

        let payload = [7u8; 100];
        // Simulate the writer having consumed a 116-byte record
        oieb.debit_payload(116);

        {
            let frame = Frame::new(payload.as_ptr(), 100, 1, &oieb, &sem);
            assert_eq!(frame.sequence(), 1);
            assert_eq!(frame.len(), 100);
            assert_eq!(&*frame, &[7u8; 100][..]);
            // Space not yet credited while the view is alive
            assert_eq!(oieb.payload_free(), 1024 - 116);
            assert!(!sem.try_wait().expect("try_wait"));
        }

        // Released: full capacity back, exactly one post
        assert_eq!(oieb.payload_free(), 1024);
        assert!(sem.try_wait().expect("try_wait"));
        assert!(!sem.try_wait().expect("try_wait"));

        NamedSemaphore::unlink(&sem_name).ok();
    }

    #[test]
    fn test_copy_to_vec() {
        let layout = BufferLayout::new(0, 1024);
        let oieb = Oieb::new(&layout, 1);
        let sem_name = unique_name();
        let sem = NamedSemaphore::create_exclusive(&sem_name, 0).expect("sem");

        let payload: Vec<u8> = (0..64).collect();
        let frame = Frame::new(payload.as_ptr(), 64, 3, &oieb, &sem);

        let owned = frame.copy_to_vec();
        assert_eq!(owned, payload);

        drop(frame);
        NamedSemaphore::unlink(&sem_name).ok();
    }

    #[test]
    fn test_frame_buffer_deref() {
        let mut backing = [0u8; 32];
        let mut buf = FrameBuffer::new(&mut backing);

        assert_eq!(buf.len(), 32);
        buf.copy_from_slice(&[9u8; 32]);
        assert_eq!(&*buf, &[9u8; 32][..]);
    }
}
