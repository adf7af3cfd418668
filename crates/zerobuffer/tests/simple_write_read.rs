// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zerobuffer contributors

//! Basic round-trip: metadata plus a single patterned frame.

use std::time::Duration;
use zerobuffer::{BufferConfig, Reader, Writer};

fn unique_name(tag: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("zb_it_{tag}_{ts}")
}

#[test]
fn test_simple_write_read() {
    let name = unique_name("simple");
    let mut reader = Reader::new(&name, BufferConfig::new(1024, 10240)).expect("reader");
    let mut writer = Writer::new(&name).expect("writer");

    writer.set_metadata(&[0u8; 100]).expect("metadata");

    let pattern: Vec<u8> = (0..1024u32).map(|i| ((i + 1) % 256) as u8).collect();
    let seq = writer.write_frame(&pattern).expect("write");
    assert_eq!(seq, 1);

    let frame = reader
        .read_frame(Duration::from_secs(5))
        .expect("read")
        .expect("frame");
    assert_eq!(frame.sequence(), 1);
    assert_eq!(frame.len(), 1024);
    assert_eq!(&*frame, &pattern[..]);
    drop(frame);

    assert_eq!(reader.get_metadata(), &[0u8; 100][..]);
}

#[test]
fn test_multi_frame_round_trip_in_order() {
    let name = unique_name("inorder");
    let mut reader = Reader::new(&name, BufferConfig::new(0, 1 << 16)).expect("reader");
    let mut writer = Writer::new(&name).expect("writer");

    let frames: Vec<Vec<u8>> = (0..20)
        .map(|i| {
            let len = 1 + (fastrand::usize(..500));
            (0..len).map(|j| ((i * 31 + j) % 256) as u8).collect()
        })
        .collect();

    for data in &frames {
        writer.write_frame(data).expect("write");
    }

    for (i, expected) in frames.iter().enumerate() {
        let frame = reader
            .read_frame(Duration::from_secs(5))
            .expect("read")
            .expect("frame");
        assert_eq!(frame.sequence(), (i + 1) as u64);
        assert_eq!(&*frame, &expected[..]);
    }
}

#[test]
fn test_zero_copy_view_points_into_ring() {
    let name = unique_name("zerocopy");
    let mut reader = Reader::new(&name, BufferConfig::new(0, 10240)).expect("reader");
    let mut writer = Writer::new(&name).expect("writer");

    writer.write_frame(b"in place").expect("write");

    let frame = reader
        .read_frame(Duration::from_secs(1))
        .expect("read")
        .expect("frame");

    // Copy accessor matches the borrowed view byte-for-byte
    let owned = frame.copy_to_vec();
    assert_eq!(owned.as_slice(), &*frame);
}

#[test]
fn test_two_phase_frame_write() {
    let name = unique_name("twophase");
    let mut reader = Reader::new(&name, BufferConfig::new(0, 10240)).expect("reader");
    let mut writer = Writer::new(&name).expect("writer");

    let seq = {
        let (mut buf, seq) = writer.get_frame_buffer(256).expect("acquire");
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        seq
    };
    writer.commit_frame().expect("commit");

    let frame = reader
        .read_frame(Duration::from_secs(1))
        .expect("read")
        .expect("frame");
    assert_eq!(frame.sequence(), seq);
    let expected: Vec<u8> = (0..256usize).map(|i| (i % 256) as u8).collect();
    assert_eq!(&*frame, &expected[..]);
}
