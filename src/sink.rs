// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The downstream consumer of discovered tracks and frames.

use crate::codec::{Frame, Track};

/// Consumes tracks and frames, eg to record, transcode, or re-stream them.
///
/// A [`crate::demux::Demuxer`] calls these methods synchronously from within
/// [`crate::demux::Demuxer::input`] and [`crate::demux::Demuxer::flush`].
pub trait MediaSink {
    /// Registers a newly discovered track.
    ///
    /// The demuxer calls this at most once per stream id. Returns false if the
    /// sink rejects the track; the demuxer doesn't act on rejection.
    fn add_track(&mut self, track: &Track) -> bool;

    /// Accepts one frame, already tagged with its stream id and rescaled to
    /// millisecond timestamps.
    ///
    /// Returns false if the frame was rejected or dropped; the demuxer doesn't
    /// retry.
    fn input_frame(&mut self, frame: Frame) -> bool;

    /// Signals that no further tracks will be added.
    fn add_track_completed(&mut self);

    /// Discards all tracks, eg between sessions. The demuxer never calls this.
    fn reset_tracks(&mut self) {}

    /// Outputs anything buffered within the sink. The demuxer never calls this.
    fn flush(&mut self) {}
}
