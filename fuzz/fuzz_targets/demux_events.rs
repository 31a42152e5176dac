// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]
use std::collections::HashSet;

use esdemux::codec::{Frame, Track, TrackType};
use esdemux::demux::{DemuxOptions, Demuxer};
use esdemux::parser::{ContainerParser, ParserEvents};
use esdemux::sink::MediaSink;
use esdemux::ContainerFamily;
use libfuzzer_sys::fuzz_target;

/// Turns each chunk of fuzz input into one parser event.
#[derive(Debug)]
struct FuzzParser;

impl ContainerParser for FuzzParser {
    fn input(&mut self, data: &[u8], events: &mut dyn ParserEvents) -> Result<usize, String> {
        let (&hdr, rest) = data.split_first().ok_or_else(|| "empty".to_owned())?;
        let stream_id = usize::from(hdr & 0b11);
        let stream_type = match (hdr >> 2) & 0b111 {
            0 => 0x1b,
            1 => 0x24,
            2 => 0x0f,
            3 => 0x90,
            4 => 0x33,
            5 => 0x02,
            _ => return Err("fault".to_owned()),
        };
        if (hdr & 0x20) != 0 {
            events.on_stream(stream_id, stream_type, rest, (hdr & 0x40) != 0);
        } else {
            let ts = i64::from(hdr >> 6) * 3600;
            events.on_unit(stream_id, stream_type, 0, ts, ts, rest);
        }
        Ok(data.len())
    }
}

#[derive(Default)]
struct CheckingSink {
    streams: HashSet<usize>,
    have_video: bool,
    completed: bool,
}

impl MediaSink for CheckingSink {
    fn add_track(&mut self, track: &Track) -> bool {
        assert!(self.streams.insert(track.stream_id().unwrap()));
        self.have_video |= track.track_type() == TrackType::Video;
        true
    }

    fn input_frame(&mut self, frame: Frame) -> bool {
        assert!(self.streams.contains(&frame.stream_id().unwrap()));
        true
    }

    fn add_track_completed(&mut self) {
        assert!(!self.completed);
        assert!(self.have_video);
        self.completed = true;
    }
}

fuzz_target!(|data: &[u8]| {
    let mut sink = CheckingSink::default();
    let merge_frame = data.first().map_or(false, |&b| (b & 1) != 0);
    let mut d = Demuxer::with_parser(
        ContainerFamily::Ps,
        Box::new(FuzzParser),
        &mut sink,
        DemuxOptions::default().merge_frame(merge_frame),
    );
    for chunk in data.split(|&b| b == 0xff) {
        let _ = d.input(chunk);
    }
    d.flush();
});
