// Copyright (C) 2022 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::str::FromStr;

use bytes::Bytes;

use crate::codec::{CodecId, Frame, Track};
use crate::parser::{ContainerParser, ParserEvents};
use crate::sink::MediaSink;

pub(crate) fn init_logging() {
    let h = mylog::Builder::new()
        .set_format(
            ::std::env::var("ESDEMUX_FORMAT")
                .map_err(|_| ())
                .and_then(|s| mylog::Format::from_str(&s))
                .unwrap_or(mylog::Format::Google),
        )
        .set_spec(::std::env::var("ESDEMUX_LOG").as_deref().unwrap_or("info"))
        .build();
    let _ = h.install();
}

/// Something a [`RecordingSink`] was told.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SinkEvent {
    Track {
        stream_id: usize,
        codec: CodecId,
    },
    Frame {
        stream_id: usize,
        codec: CodecId,
        dts: i64,
        pts: i64,
        data: Bytes,
    },
    Completed,
}

/// A sink which records everything, in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) events: Vec<SinkEvent>,
    pub(crate) tracks: Vec<Track>,
    pub(crate) frames: Vec<Frame>,
}

impl RecordingSink {
    pub(crate) fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Completed))
            .count()
    }
}

impl MediaSink for RecordingSink {
    fn add_track(&mut self, track: &Track) -> bool {
        self.events.push(SinkEvent::Track {
            stream_id: track.stream_id().expect("tracks should have stream ids"),
            codec: track.codec(),
        });
        self.tracks.push(track.clone());
        true
    }

    fn input_frame(&mut self, frame: Frame) -> bool {
        self.events.push(SinkEvent::Frame {
            stream_id: frame.stream_id().expect("frames should have stream ids"),
            codec: frame.codec(),
            dts: frame.dts(),
            pts: frame.pts(),
            data: frame.data().clone(),
        });
        self.frames.push(frame);
        true
    }

    fn add_track_completed(&mut self) {
        self.events.push(SinkEvent::Completed);
    }
}

/// Parses a toy container in which each record is one parser event.
///
/// *   `S id type finished extra_len extra...`: a stream description.
/// *   `U id type pts:i64 dts:i64 len:u16 data...`: a unit, big-endian.
/// *   `E`: a fault.
///
/// Records may not span `input` calls.
#[derive(Debug, Default)]
pub(crate) struct ScriptedParser;

impl ContainerParser for ScriptedParser {
    fn input(&mut self, mut data: &[u8], events: &mut dyn ParserEvents) -> Result<usize, String> {
        let len = data.len();
        while let Some((&tag, rest)) = data.split_first() {
            data = rest;
            match tag {
                b'S' => {
                    let (hdr, rest) = split(data, 4)?;
                    let (extra, rest) = split(rest, usize::from(hdr[3]))?;
                    events.on_stream(usize::from(hdr[0]), hdr[1], extra, hdr[2] != 0);
                    data = rest;
                }
                b'U' => {
                    let (hdr, rest) = split(data, 20)?;
                    let pts = i64::from_be_bytes(hdr[2..10].try_into().unwrap());
                    let dts = i64::from_be_bytes(hdr[10..18].try_into().unwrap());
                    let unit_len = usize::from(u16::from_be_bytes([hdr[18], hdr[19]]));
                    let (unit, rest) = split(rest, unit_len)?;
                    events.on_unit(usize::from(hdr[0]), hdr[1], 0, pts, dts, unit);
                    data = rest;
                }
                b'E' => return Err("scripted fault".to_owned()),
                _ => return Err(format!("bad tag {tag:#04x}")),
            }
        }
        Ok(len)
    }
}

fn split(data: &[u8], n: usize) -> Result<(&[u8], &[u8]), String> {
    if data.len() < n {
        return Err(format!("truncated record: want {n} bytes, have {}", data.len()));
    }
    Ok(data.split_at(n))
}

/// Encodes a stream description for [`ScriptedParser`].
pub(crate) fn stream(stream_id: u8, stream_type: u8, finished: bool) -> Vec<u8> {
    vec![b'S', stream_id, stream_type, u8::from(finished), 0]
}

/// Encodes a unit for [`ScriptedParser`], with timestamps in 90 kHz units.
pub(crate) fn unit(stream_id: u8, stream_type: u8, pts: i64, dts: i64, data: &[u8]) -> Vec<u8> {
    let mut out = vec![b'U', stream_id, stream_type];
    out.extend_from_slice(&pts.to_be_bytes());
    out.extend_from_slice(&dts.to_be_bytes());
    out.extend_from_slice(&u16::try_from(data.len()).unwrap().to_be_bytes());
    out.extend_from_slice(data);
    out
}
