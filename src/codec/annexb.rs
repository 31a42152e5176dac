// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Annex B byte streams, as defined in H.264 Annex B and H.265 Annex B.
//!
//! Elementary video streams within MPEG-PS/TS separate NAL units with
//! `00 00 01` or `00 00 00 01` start codes.

use super::CodecId;

/// The four-byte start code inserted before payloads which lack one.
pub(crate) const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Returns the length of the start code at the beginning of `data`, or 0.
pub(crate) fn prefix_len(data: &[u8]) -> usize {
    match data {
        [0, 0, 0, 1, ..] => 4,
        [0, 0, 1, ..] => 3,
        _ => 0,
    }
}

/// Iterates through the NAL units of an Annex B byte stream, excluding start
/// codes and trailing zero bytes.
///
/// Data before the first start code (if any) is treated as a NAL unit; some
/// PS muxers omit the leading start code.
pub(crate) struct NalUnitIter<'a> {
    remaining: &'a [u8],
}

impl<'a> NalUnitIter<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }
}

impl<'a> Iterator for NalUnitIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining.is_empty() {
                return None;
            }
            let nal = match self.remaining.windows(3).position(|w| w == [0, 0, 1]) {
                Some(pos) => {
                    let nal = &self.remaining[..pos];
                    self.remaining = &self.remaining[pos + 3..];
                    nal
                }
                None => std::mem::take(&mut self.remaining),
            };
            let end = nal.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            if end > 0 {
                return Some(&nal[..end]);
            }
        }
    }
}

/// What a single NAL unit contributes to a frame's flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum NalKind {
    /// A sequence/picture (or video) parameter set.
    ParameterSet,

    /// A coded slice.
    Vcl {
        random_access: bool,
        first_in_picture: bool,
    },

    /// SEI, access unit delimiter, filler, and the like.
    Other,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Classification {
    pub(super) is_keyframe: bool,
    pub(super) is_config_frame: bool,
    pub(super) is_decodable: bool,
}

/// Classifies an Annex B payload of the given video codec.
pub(super) fn classify(codec: CodecId, data: &[u8]) -> Classification {
    let nal_kind = match codec {
        CodecId::H264 => super::h264::nal_kind,
        CodecId::H265 => super::h265::nal_kind,
        _ => unreachable!("{codec} isn't an Annex B codec"),
    };
    let mut c = Classification::default();
    let mut saw_nal = false;
    let mut all_parameter_sets = true;
    for nal in NalUnitIter::new(data) {
        saw_nal = true;
        match nal_kind(nal) {
            NalKind::ParameterSet => {}
            NalKind::Vcl {
                random_access,
                first_in_picture,
            } => {
                all_parameter_sets = false;
                c.is_keyframe |= random_access;
                c.is_decodable |= first_in_picture;
            }
            NalKind::Other => all_parameter_sets = false,
        }
    }
    c.is_config_frame = saw_nal && all_parameter_sets;
    c
}
