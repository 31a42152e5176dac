// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reassembly of video access units split across container units.
//!
//! Program and transport streams often carry one access unit in several PES
//! packets (eg one per NAL unit), and nothing at the container level marks
//! where an access unit ends. [`MergeBuffer`] accumulates units until it sees
//! the start of the next access unit.

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use smallvec::SmallVec;

use crate::codec::{annexb, CodecId, Frame};

/// The maximum number of units to buffer before emitting regardless of content.
pub const MAX_BUFFERED_UNITS: usize = 100;

/// A merged access unit, as emitted by [`MergeBuffer`].
#[derive(Clone, Debug)]
pub struct MergedUnit {
    /// The codec of the first merged unit.
    pub codec: CodecId,

    /// The smallest decode timestamp of the merged units.
    pub dts: i64,

    /// The smallest presentation timestamp of the merged units.
    pub pts: i64,

    /// True iff any merged unit contained a keyframe.
    pub has_keyframe: bool,

    /// The number of units merged.
    pub units: usize,

    /// Annex B data; every merged unit begins with a start code unless exactly
    /// one unit was merged, in which case its data is passed through as-is.
    pub data: Bytes,
}

/// Accumulates consecutive video units of one stream into access units.
#[derive(Debug, Default)]
pub struct MergeBuffer {
    units: SmallVec<[Frame; 4]>,

    /// True iff `units` includes one which starts a picture.
    have_decodable: bool,
}

impl MergeBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of buffered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true iff nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Buffers `frame`, first returning the previously buffered access unit
    /// if `frame` begins a new one.
    pub fn push(&mut self, frame: Frame) -> Option<MergedUnit> {
        let out = if self.starts_new_unit(&frame) {
            self.flush()
        } else {
            None
        };
        self.have_decodable |= frame.is_decodable();
        self.units.push(frame);
        out
    }

    /// Returns whatever is buffered as a single access unit. A no-op when empty.
    pub fn flush(&mut self) -> Option<MergedUnit> {
        if self.units.is_empty() {
            return None;
        }
        self.have_decodable = false;
        let codec = self.units[0].codec();
        let dts = self.units.iter().map(Frame::dts).min().expect("non-empty");
        let pts = self.units.iter().map(Frame::pts).min().expect("non-empty");
        let has_keyframe = self.units.iter().any(Frame::is_keyframe);
        let units = self.units.len();
        let data = if units == 1 {
            self.units.pop().expect("non-empty").into_data()
        } else {
            let len: usize = self
                .units
                .iter()
                .map(|u| {
                    let d = u.data();
                    d.len() + if annexb::prefix_len(d) == 0 { 4 } else { 0 }
                })
                .sum();
            let mut out = BytesMut::with_capacity(len);
            for u in self.units.drain(..) {
                if annexb::prefix_len(u.data()) == 0 {
                    out.put_slice(&annexb::START_CODE);
                }
                out.put_slice(u.data());
            }
            debug_assert_eq!(len, out.len());
            out.freeze()
        };
        trace!("merged {} units into {}-byte access unit at dts {}", units, data.len(), dts);
        Some(MergedUnit {
            codec,
            dts,
            pts,
            has_keyframe,
            units,
            data,
        })
    }

    fn starts_new_unit(&self, frame: &Frame) -> bool {
        let last = match self.units.last() {
            None => return false,
            Some(l) => l,
        };
        if self.units.len() > MAX_BUFFERED_UNITS {
            return true;
        }
        if !self.have_decodable {
            // Only parameter sets, SEI, and the like so far; these precede
            // the picture they describe.
            return false;
        }
        last.dts() != frame.dts() || frame.is_decodable() || frame.is_config_frame()
    }
}
