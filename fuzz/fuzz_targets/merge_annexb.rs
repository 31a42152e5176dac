// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]
use bytes::Bytes;
use esdemux::codec::{CodecId, Frame};
use esdemux::merge::MergeBuffer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A stream slot holds one codec for its whole life.
    let Some((&sel, data)) = data.split_first() else {
        return;
    };
    let codec = if (sel & 1) == 0 { CodecId::H264 } else { CodecId::H265 };
    let mut b = MergeBuffer::new();
    let mut in_bytes = 0;
    let mut out_bytes = 0;
    for unit in data.split(|&b| b == 0xff) {
        let dts = i64::from(unit.first().copied().unwrap_or(0) >> 6);
        in_bytes += unit.len();
        if let Some(m) = b.push(Frame::new(codec, Bytes::copy_from_slice(unit), dts, dts)) {
            out_bytes += m.data.len();
        }
    }
    if let Some(m) = b.flush() {
        out_bytes += m.data.len();
    }
    assert!(b.is_empty());
    assert!(b.flush().is_none());
    assert!(out_bytes >= in_bytes);
});
