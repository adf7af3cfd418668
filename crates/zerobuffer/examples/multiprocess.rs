// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Multi-Process Demo
//!
//! Runs one end of a zero-copy buffer so two terminals can talk.
//!
//! # Usage
//!
//! Terminal 1 (Reader - creates the buffer):
//! ```bash
//! cargo run --example multiprocess -- read
//! ```
//!
//! Terminal 2 (Writer - connects to it):
//! ```bash
//! cargo run --example multiprocess -- write
//! ```
//!
//! The reader creates the buffer and prints every frame it receives; the
//! writer connects and publishes a numbered frame every 500 ms.

use std::time::Duration;
use zerobuffer::{BufferConfig, Reader, Writer};

const BUFFER_NAME: &str = "zb_demo_multiprocess";

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        println!("Usage: {} <read|write>", args[0]);
        println!();
        println!("  read  - Create the buffer and print incoming frames");
        println!("  write - Connect to the buffer and publish frames");
        return;
    }

    match args[1].as_str() {
        "read" => run_reader(),
        "write" => run_writer(),
        _ => {
            println!("Unknown command: {}", args[1]);
            println!("Use 'read' or 'write'");
        }
    }
}

fn run_reader() {
    println!("=== Reader Process ===");
    println!("Creating buffer '{BUFFER_NAME}'");

    let mut reader = Reader::new(BUFFER_NAME, BufferConfig::new(256, 1 << 20))
        .expect("Failed to create buffer");

    println!("Waiting for a writer...");
    if !reader.is_writer_connected(Some(Duration::from_secs(30))) {
        println!("No writer appeared within 30s, giving up");
        return;
    }
    println!("Writer connected");

    loop {
        match reader.read_frame(Duration::from_secs(5)) {
            Ok(Some(frame)) => {
                println!(
                    "frame #{}: {} bytes: {}",
                    frame.sequence(),
                    frame.len(),
                    String::from_utf8_lossy(&frame)
                );
            }
            Ok(None) => println!("(no frame within 5s, writer still alive)"),
            Err(e) => {
                println!("Stopping: {e}");
                break;
            }
        }
    }
}

fn run_writer() {
    println!("=== Writer Process ===");
    println!("Connecting to buffer '{BUFFER_NAME}'");

    let mut writer = Writer::new(BUFFER_NAME).expect("Failed to connect");
    writer
        .set_metadata(b"demo stream v1")
        .expect("Failed to set metadata");

    let mut n = 0u64;
    loop {
        n += 1;
        let msg = format!("message {n}");
        match writer.write_frame(msg.as_bytes()) {
            Ok(seq) => println!("wrote frame #{seq}"),
            Err(e) => {
                println!("Stopping: {e}");
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(500));
    }
}
