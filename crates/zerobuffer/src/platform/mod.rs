// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! OS-abstracted platform primitives.
//!
//! Four small wrappers that the engines build on:
//!
//! - [`SharedMemory`] - named POSIX shared memory (`shm_open` + `mmap`)
//! - [`NamedSemaphore`] - named counting semaphore (`sem_open` family)
//! - [`FileLock`] - advisory per-buffer lock file (`flock`)
//! - [`process_exists`] - PID liveness probe (`kill(pid, 0)`)
//!
//! Every wrapper distinguishes `AlreadyExists` / `BufferNotFound` /
//! `Backend` failures so that the resource lifecycle can tell a
//! create-exclusive collision from a genuine OS error.

mod lock;
mod process;
mod semaphore;
mod shm;

pub use lock::FileLock;
pub use process::{current_pid, process_exists};
pub use semaphore::NamedSemaphore;
pub use shm::SharedMemory;
