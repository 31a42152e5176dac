// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Codec identities, tracks, and elementary frames.
//!
//! Container parsers report codecs as MPEG-2 systems `stream_type` values;
//! [`CodecId::from_stream_type`] maps those to the codecs this crate knows.
//! A [`Track`] is the logical identity of one elementary stream and a
//! [`Frame`] is one timestamped unit of its data.

use bytes::Bytes;
use pretty_hex::PrettyHex;

pub(crate) mod annexb;
mod h264;
mod h265;

/// Whether a codec carries video or audio.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrackType {
    Video,
    Audio,
}

/// A codec which may appear within a program or transport stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    H264,
    H265,
    H266,

    /// Chinese national standard SVAC video, as seen in some GB28181 streams.
    SvacVideo,
    Aac,
    Mp3,
    G711A,
    G711U,
    Opus,
    SvacAudio,
}

impl CodecId {
    /// Maps an MPEG-2 systems `stream_type` (ISO/IEC 13818-1 Table 2-34, plus
    /// the private assignments used by GB28181) to a codec.
    ///
    /// Returns `None` for unrecognized values; these are common in
    /// multiplexed streams and should be skipped rather than treated as errors.
    pub fn from_stream_type(stream_type: u8) -> Option<Self> {
        Some(match stream_type {
            0x1b => CodecId::H264,
            0x24 => CodecId::H265,
            0x33 => CodecId::H266,
            0x80 => CodecId::SvacVideo,
            0x0f => CodecId::Aac,
            0x03 | 0x04 => CodecId::Mp3,
            0x90 => CodecId::G711A,
            0x91 => CodecId::G711U,
            0x9b => CodecId::SvacAudio,
            0x9c => CodecId::Opus,
            _ => return None,
        })
    }

    pub fn track_type(self) -> TrackType {
        match self {
            CodecId::H264 | CodecId::H265 | CodecId::H266 | CodecId::SvacVideo => {
                TrackType::Video
            }
            CodecId::Aac
            | CodecId::Mp3
            | CodecId::G711A
            | CodecId::G711U
            | CodecId::Opus
            | CodecId::SvacAudio => TrackType::Audio,
        }
    }

    /// Returns a short human-readable name, as in RTP encoding names where one exists.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::H264 => "H264",
            CodecId::H265 => "H265",
            CodecId::H266 => "H266",
            CodecId::SvacVideo => "SVACV",
            CodecId::Aac => "mpeg4-generic",
            CodecId::Mp3 => "MP3",
            CodecId::G711A => "PCMA",
            CodecId::G711U => "PCMU",
            CodecId::Opus => "opus",
            CodecId::SvacAudio => "SVACA",
        }
    }

    /// Returns true iff frames of this codec are Annex B byte streams.
    fn is_annexb(self) -> bool {
        matches!(self, CodecId::H264 | CodecId::H265)
    }
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// The logical identity of one elementary stream within a container.
///
/// Tracks are cheap to clone; a [`crate::sink::MediaSink`] typically keeps its
/// own copy of each track it's given.
#[derive(Clone, PartialEq, Eq)]
pub struct Track {
    codec: CodecId,
    stream_id: Option<usize>,

    /// Codec-specific data from the container's stream descriptors, if any.
    extra_data: Bytes,
}

impl Track {
    /// Creates a track for the given codec, or `None` if tracks of this codec
    /// aren't supported.
    pub fn new(codec: CodecId, extra_data: Bytes) -> Option<Self> {
        match codec {
            CodecId::H266 | CodecId::SvacVideo | CodecId::SvacAudio => None,
            _ => Some(Track {
                codec,
                stream_id: None,
                extra_data,
            }),
        }
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    pub fn track_type(&self) -> TrackType {
        self.codec.track_type()
    }

    /// The container-level stream id assigned at discovery, if any.
    pub fn stream_id(&self) -> Option<usize> {
        self.stream_id
    }

    pub(crate) fn set_stream_id(&mut self, stream_id: usize) {
        debug_assert!(self.stream_id.is_none());
        self.stream_id = Some(stream_id);
    }

    pub fn extra_data(&self) -> &Bytes {
        &self.extra_data
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("codec", &self.codec)
            .field("stream_id", &self.stream_id)
            .field("extra_data", &self.extra_data.hex_dump())
            .finish()
    }
}

/// A single elementary stream unit: for video, all or part of an access unit;
/// for audio, one or more encoded samples.
///
/// Timestamps are in milliseconds.
#[derive(Clone)]
pub struct Frame {
    codec: CodecId,
    stream_id: Option<usize>,
    dts: i64,
    pts: i64,

    /// If this contains an IDR (H.264) or IRAP (H.265) picture.
    is_keyframe: bool,

    /// If this consists entirely of parameter sets.
    is_config_frame: bool,

    /// If this begins a new decodable picture. Always true for audio.
    is_decodable: bool,

    data: Bytes,
}

impl Frame {
    /// Creates a frame, classifying its content according to `codec`.
    pub fn new(codec: CodecId, data: Bytes, dts: i64, pts: i64) -> Self {
        let c = if codec.is_annexb() {
            annexb::classify(codec, &data)
        } else {
            annexb::Classification {
                is_keyframe: false,
                is_config_frame: false,
                is_decodable: true,
            }
        };
        Frame {
            codec,
            stream_id: None,
            dts,
            pts,
            is_keyframe: c.is_keyframe,
            is_config_frame: c.is_config_frame,
            is_decodable: c.is_decodable,
            data,
        }
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    pub fn track_type(&self) -> TrackType {
        self.codec.track_type()
    }

    /// The container-level stream id. Always set on frames passed to a sink.
    pub fn stream_id(&self) -> Option<usize> {
        self.stream_id
    }

    pub fn set_stream_id(&mut self, stream_id: usize) {
        self.stream_id = Some(stream_id);
    }

    pub fn dts(&self) -> i64 {
        self.dts
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn is_keyframe(&self) -> bool {
        self.is_keyframe
    }

    pub fn is_config_frame(&self) -> bool {
        self.is_config_frame
    }

    pub fn is_decodable(&self) -> bool {
        self.is_decodable
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("codec", &self.codec)
            .field("stream_id", &self.stream_id)
            .field("dts", &self.dts)
            .field("pts", &self.pts)
            .field("is_keyframe", &self.is_keyframe)
            .field("is_config_frame", &self.is_config_frame)
            .field("is_decodable", &self.is_decodable)
            .field("data", &self.data.hex_dump())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn stream_types() {
        assert_eq!(CodecId::from_stream_type(0x1b), Some(CodecId::H264));
        assert_eq!(CodecId::from_stream_type(0x24), Some(CodecId::H265));
        assert_eq!(CodecId::from_stream_type(0x0f), Some(CodecId::Aac));
        assert_eq!(CodecId::from_stream_type(0x03), Some(CodecId::Mp3));
        assert_eq!(CodecId::from_stream_type(0x04), Some(CodecId::Mp3));
        assert_eq!(CodecId::from_stream_type(0x90), Some(CodecId::G711A));
        assert_eq!(CodecId::from_stream_type(0x91), Some(CodecId::G711U));
        assert_eq!(CodecId::from_stream_type(0x9c), Some(CodecId::Opus));
        assert_eq!(CodecId::from_stream_type(0x02), None); // MPEG-2 video
        assert_eq!(CodecId::from_stream_type(0xff), None);
        assert_eq!(CodecId::H265.track_type(), TrackType::Video);
        assert_eq!(CodecId::G711A.track_type(), TrackType::Audio);
    }

    #[test]
    fn unsupported_tracks() {
        assert!(Track::new(CodecId::H266, Bytes::new()).is_none());
        assert!(Track::new(CodecId::SvacVideo, Bytes::new()).is_none());
        assert!(Track::new(CodecId::SvacAudio, Bytes::new()).is_none());
        let t = Track::new(CodecId::Aac, Bytes::from_static(b"\x14\x90")).unwrap();
        assert_eq!(t.stream_id(), None);
        assert_eq!(&t.extra_data()[..], b"\x14\x90");
    }

    #[test]
    fn audio_frame_flags() {
        let f = Frame::new(CodecId::G711A, Bytes::from_static(b"\xd5\xd5\xd5"), 40, 40);
        assert!(!f.is_keyframe());
        assert!(!f.is_config_frame());
        assert!(f.is_decodable());
        assert_eq!(f.stream_id(), None);
    }

    #[test]
    fn h264_frame_flags() {
        // SPS + PPS only.
        let f = Frame::new(
            CodecId::H264,
            Bytes::from_static(b"\x00\x00\x00\x01\x67\x64\x00\x1e\x00\x00\x00\x01\x68\xee\x3c\x80"),
            0,
            0,
        );
        assert!(f.is_config_frame());
        assert!(!f.is_keyframe());
        assert!(!f.is_decodable());

        // IDR slice with first_mb_in_slice == 0.
        let f = Frame::new(
            CodecId::H264,
            Bytes::from_static(b"\x00\x00\x00\x01\x65\x88\x84\x00"),
            0,
            0,
        );
        assert!(f.is_keyframe());
        assert!(!f.is_config_frame());
        assert!(f.is_decodable());

        // Second slice of a non-IDR picture.
        let f = Frame::new(CodecId::H264, Bytes::from_static(b"\x00\x00\x01\x41\x5a\x00"), 0, 0);
        assert!(!f.is_keyframe());
        assert!(!f.is_decodable());
    }

    #[test]
    fn h265_frame_flags() {
        // VPS, SPS, PPS.
        let f = Frame::new(
            CodecId::H265,
            Bytes::from_static(
                b"\x00\x00\x00\x01\x40\x01\x0c\
                  \x00\x00\x00\x01\x42\x01\x01\
                  \x00\x00\x00\x01\x44\x01\xc0",
            ),
            0,
            0,
        );
        assert!(f.is_config_frame());
        assert!(!f.is_keyframe());

        // IDR_W_RADL, first slice segment.
        let f = Frame::new(CodecId::H265, Bytes::from_static(b"\x00\x00\x01\x26\x01\xaf\x00"), 0, 0);
        assert!(f.is_keyframe());
        assert!(f.is_decodable());

        // TRAIL_R, not first slice segment.
        let f = Frame::new(CodecId::H265, Bytes::from_static(b"\x00\x00\x01\x02\x01\x2f\x00"), 0, 0);
        assert!(!f.is_keyframe());
        assert!(!f.is_decodable());
    }
}
