// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Process liveness probing by PID.

use std::io;

/// Check whether a process with the given PID is currently running.
///
/// Uses `kill(pid, 0)`: no signal is delivered, but permission and
/// existence are checked. `EPERM` means the process exists but belongs to
/// another user, which still counts as alive.
///
/// PID 0 (the "not attached" marker) and values outside the kernel's PID
/// range report `false`. A recycled PID can produce a false positive;
/// callers tolerate that because the semaphore-timeout path eventually
/// fires anyway.
#[must_use]
pub fn process_exists(pid: u64) -> bool {
    if pid == 0 || pid > i32::MAX as u64 {
        return false;
    }

    // SAFETY: kill with signal 0 performs only validity/permission checks
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if ret == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Current process ID, widened for OIEB storage
#[must_use]
pub fn current_pid() -> u64 {
    std::process::id() as u64
}
