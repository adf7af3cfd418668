// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Ring buffer counters.
//!
//! Per-instance metrics ride on the writer/reader engines; a process-wide
//! [`RingMetrics`] aggregates across every buffer the process touches.
//! All counters use `Relaxed` ordering for minimal overhead and are
//! eventually consistent across threads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-writer counters.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Frames committed
    pub frames_written: AtomicU64,
    /// Wrap markers emitted
    pub wrap_markers: AtomicU64,
    /// Frame allocations that had to wait on "space-available"
    pub blocking_writes: AtomicU64,
    /// Waits that expired without the reader freeing enough space
    pub wait_timeouts: AtomicU64,
}

impl WriterMetrics {
    /// Fresh counters, all zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames committed
    #[inline]
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    /// Allocations that blocked at least once
    #[inline]
    #[must_use]
    pub fn blocking_writes(&self) -> u64 {
        self.blocking_writes.load(Ordering::Relaxed)
    }

    /// Wrap markers emitted
    #[inline]
    #[must_use]
    pub fn wrap_markers(&self) -> u64 {
        self.wrap_markers.load(Ordering::Relaxed)
    }

    /// Expired backpressure waits
    #[inline]
    #[must_use]
    pub fn wait_timeouts(&self) -> u64 {
        self.wait_timeouts.load(Ordering::Relaxed)
    }
}

/// Per-reader counters.
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// Frames returned to the caller
    pub frames_read: AtomicU64,
    /// Wrap markers consumed
    pub wrap_jumps: AtomicU64,
    /// `read_frame` calls that timed out with the writer alive
    pub empty_reads: AtomicU64,
}

impl ReaderMetrics {
    /// Fresh counters, all zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames returned to the caller
    #[inline]
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read.load(Ordering::Relaxed)
    }

    /// Wrap markers consumed
    #[inline]
    #[must_use]
    pub fn wrap_jumps(&self) -> u64 {
        self.wrap_jumps.load(Ordering::Relaxed)
    }

    /// Timed-out reads with a live writer
    #[inline]
    #[must_use]
    pub fn empty_reads(&self) -> u64 {
        self.empty_reads.load(Ordering::Relaxed)
    }
}

/// Process-wide ring metrics.
#[derive(Debug, Default)]
pub struct RingMetrics {
    /// Frames committed across all writers
    pub frames_written: AtomicU64,
    /// Frames read across all readers
    pub frames_read: AtomicU64,
    /// Semaphore posts issued (both directions)
    pub sem_posts: AtomicU64,
    /// Semaphore waits entered (both directions)
    pub sem_waits: AtomicU64,
    /// Wrap markers emitted
    pub wrap_markers: AtomicU64,
}

impl RingMetrics {
    /// Fresh counters, all zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_written: AtomicU64::new(0),
            frames_read: AtomicU64::new(0),
            sem_posts: AtomicU64::new(0),
            sem_waits: AtomicU64::new(0),
            wrap_markers: AtomicU64::new(0),
        }
    }

    /// Count a committed frame
    #[inline]
    pub fn inc_frames_written(&self) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame handed to a caller
    #[inline]
    pub fn inc_frames_read(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a semaphore post
    #[inline]
    pub fn inc_sem_posts(&self) {
        self.sem_posts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a semaphore wait
    #[inline]
    pub fn inc_sem_waits(&self) {
        self.sem_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an emitted wrap marker
    #[inline]
    pub fn inc_wrap_markers(&self) {
        self.wrap_markers.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.frames_written.store(0, Ordering::Relaxed);
        self.frames_read.store(0, Ordering::Relaxed);
        self.sem_posts.store(0, Ordering::Relaxed);
        self.sem_waits.store(0, Ordering::Relaxed);
        self.wrap_markers.store(0, Ordering::Relaxed);
    }
}

/// Global metrics instance
static GLOBAL_METRICS: RingMetrics = RingMetrics::new();

/// Process-wide ring metrics
#[must_use]
pub fn global_metrics() -> &'static RingMetrics {
    &GLOBAL_METRICS
}
