// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Buffer sizing, timeouts and environment-driven log level.

use crate::layout::FRAME_HEADER_SIZE;
use crate::{Result, ZeroBufferError};
use std::time::Duration;

/// Default gate on each writer suspension in the backpressure loop.
///
/// Total wait time may exceed one timeout when the reader frees partial
/// space repeatedly.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable selecting the log severity floor
pub const LOG_LEVEL_ENV: &str = "ZEROBUFFER_LOG_LEVEL";

/// Sizing parameters for a new buffer.
///
/// `metadata_size` may be 0 (no metadata block); `payload_size` must hold
/// at least one minimal record. Requested sizes are rounded up to the
/// 64-byte block alignment at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Requested metadata block size in bytes
    pub metadata_size: u64,
    /// Requested payload ring size in bytes
    pub payload_size: u64,
}

impl BufferConfig {
    /// Config with the given metadata and payload sizes
    #[must_use]
    pub fn new(metadata_size: u64, payload_size: u64) -> Self {
        Self {
            metadata_size,
            payload_size,
        }
    }

    /// Reject configurations the ring cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.payload_size <= FRAME_HEADER_SIZE {
            return Err(ZeroBufferError::InvalidConfig(format!(
                "payload_size {} cannot hold a single record (need > {FRAME_HEADER_SIZE})",
                self.payload_size
            )));
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            metadata_size: 1024,
            payload_size: 1024 * 1024,
        }
    }
}

/// Log severity floor from `ZEROBUFFER_LOG_LEVEL`.
///
/// Recognized tokens (case-insensitive): `TRACE`, `DEBUG`, `INFO`,
/// `WARNING`, `ERROR`, `FATAL`. `FATAL` maps to `Error` (the `log` facade
/// has no fatal level). Unset or unrecognized values default to `Info`.
#[must_use]
pub fn log_level_from_env() -> log::LevelFilter {
    match std::env::var(LOG_LEVEL_ENV) {
        Ok(value) => parse_log_level(&value),
        Err(_) => log::LevelFilter::Info,
    }
}

fn parse_log_level(token: &str) -> log::LevelFilter {
    match token.trim().to_ascii_uppercase().as_str() {
        "TRACE" => log::LevelFilter::Trace,
        "DEBUG" => log::LevelFilter::Debug,
        "INFO" => log::LevelFilter::Info,
        "WARNING" => log::LevelFilter::Warn,
        "ERROR" | "FATAL" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}
