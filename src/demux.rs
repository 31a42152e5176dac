// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Demultiplexing of program/transport streams into a [`MediaSink`].

use std::collections::BTreeMap;

use bytes::Bytes;
use log::{debug, info, trace, warn};

use crate::codec::{CodecId, Frame, Track, TrackType};
use crate::error::ErrorInt;
use crate::merge::{MergeBuffer, MergedUnit};
use crate::parser::{ContainerParser, ParserEvents, ParserRegistry};
use crate::sink::MediaSink;
use crate::{transport_to_ms, ContainerFamily, Error};

/// Bytes of rejected input to include in parse errors.
const ERROR_PREFIX_BYTES: usize = 64;

/// Options for a [`Demuxer`].
#[derive(Copy, Clone, Debug, Default)]
pub struct DemuxOptions {
    merge_frame: bool,
}

impl DemuxOptions {
    /// Merges video units into complete access units before passing them to
    /// the sink.
    ///
    /// Off by default, in which case each video unit is passed along as-is,
    /// which may be only part of a picture.
    pub fn merge_frame(self, merge_frame: bool) -> Self {
        Self {
            merge_frame,
            ..self
        }
    }

    /// Returns true iff video units will be merged into access units.
    pub fn merges_frames(&self) -> bool {
        self.merge_frame
    }
}

/// Per-stream state.
#[derive(Debug, Default)]
struct StreamSlot {
    /// Set once, on the first successful track construction for this stream.
    track: Option<Track>,
    merge: MergeBuffer,
}

/// Demultiplexes one container stream into `sink`.
///
/// Feed it bytes via [`Demuxer::input`]. As the container parser describes
/// streams and delivers units, the demuxer adds [`Track`]s to the sink,
/// rescales timestamps to milliseconds, optionally merges video units into
/// whole access units (see [`DemuxOptions::merge_frame`]), and passes
/// [`Frame`]s to the sink, all synchronously within the `input` call.
///
/// Once the container has finished describing its streams *and* a video
/// track is known, the demuxer calls [`MediaSink::add_track_completed`],
/// exactly once. Some program streams claim to have finished before
/// describing their video; waiting for video tolerates them. In exchange,
/// audio-only streams never signal completion this way; callers must decide
/// when to proceed without it.
///
/// Each container stream needs its own `Demuxer`; it's not shareable across
/// threads while in use.
pub struct Demuxer<'s, S: MediaSink + ?Sized> {
    family: ContainerFamily,
    parser: Box<dyn ContainerParser>,
    state: DemuxState<'s, S>,

    /// Total bytes consumed by successful `input` calls.
    pos: u64,
}

/// The half of the demuxer which receives parser events.
struct DemuxState<'s, S: MediaSink + ?Sized> {
    sink: &'s mut S,
    options: DemuxOptions,
    slots: BTreeMap<usize, StreamSlot>,

    /// Set once `add_track_completed` has been called.
    finished: bool,
    have_video: bool,

    /// The stream whose most recent merged unit was a keyframe or config
    /// frame, if the most recent merged unit was one. The next unit passed
    /// through directly is taken to mean that stream's access unit is complete.
    boundary_stream: Option<usize>,
}

impl<'s, S: MediaSink + ?Sized> Demuxer<'s, S> {
    /// Creates a demuxer for `family` if `registry` can parse it.
    ///
    /// `sink` is borrowed for the demuxer's whole lifetime.
    pub fn new(
        family: ContainerFamily,
        registry: &ParserRegistry,
        sink: &'s mut S,
        options: DemuxOptions,
    ) -> Option<Self> {
        match registry.create(family) {
            Some(parser) => Some(Self::with_parser(family, parser, sink, options)),
            None => {
                warn!("no {} parser available in this build", family);
                None
            }
        }
    }

    /// Creates a demuxer which uses the given parser.
    pub fn with_parser(
        family: ContainerFamily,
        parser: Box<dyn ContainerParser>,
        sink: &'s mut S,
        options: DemuxOptions,
    ) -> Self {
        Demuxer {
            family,
            parser,
            state: DemuxState {
                sink,
                options,
                slots: BTreeMap::new(),
                finished: false,
                have_video: false,
                boundary_stream: None,
            },
            pos: 0,
        }
    }

    /// Feeds the next bytes of the container stream.
    ///
    /// Returns the number of bytes the parser consumed. On error, the parser
    /// rejected the input; it's up to the caller whether to continue with
    /// later data or give up on the stream. Nothing is retried here.
    pub fn input(&mut self, data: &[u8]) -> Result<usize, Error> {
        match self.parser.input(data, &mut self.state) {
            Ok(consumed) => {
                self.pos += consumed as u64;
                Ok(consumed)
            }
            Err(description) => bail!(ErrorInt::ParseError {
                family: self.family,
                pos: self.pos,
                len: data.len(),
                prefix: data[..data.len().min(ERROR_PREFIX_BYTES)].to_vec(),
                description,
            }),
        }
    }

    /// Passes any partially merged access units to the sink.
    ///
    /// Use at the end of a session or before closing a recording segment.
    /// Calling again with no intervening input does nothing.
    pub fn flush(&mut self) {
        self.state.flush_all();
    }

    /// Returns the container family this demuxer was created for.
    pub fn family(&self) -> ContainerFamily {
        self.family
    }

    /// Returns the current options.
    pub fn options(&self) -> &DemuxOptions {
        &self.state.options
    }

    /// Replaces the options. The merge option takes effect with the next unit.
    pub fn set_options(&mut self, options: DemuxOptions) {
        self.state.options = options;
    }

    /// Returns true iff the sink has been told track discovery is complete.
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Returns true iff a video track has been added.
    pub fn has_video(&self) -> bool {
        self.state.have_video
    }

    /// Returns the tracks added so far, in stream id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.state.slots.values().filter_map(|s| s.track.as_ref())
    }

    /// Borrows the bound sink.
    pub fn sink(&self) -> &S {
        &*self.state.sink
    }

    /// Mutably borrows the bound sink, eg to drain frames it has collected.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut *self.state.sink
    }
}

impl<'s, S: MediaSink + ?Sized> DemuxState<'s, S> {
    fn has_track(&self, stream_id: usize) -> bool {
        matches!(self.slots.get(&stream_id), Some(s) if s.track.is_some())
    }

    /// Adds `track` unless `stream_id` already has one.
    fn add_track(&mut self, stream_id: usize, mut track: Track) {
        let slot = self.slots.entry(stream_id).or_default();
        if slot.track.is_some() {
            return;
        }
        track.set_stream_id(stream_id);
        info!("stream {}: got {} track", stream_id, track.codec());
        if track.track_type() == TrackType::Video {
            self.have_video = true;
        }
        if !self.sink.add_track(&track) {
            debug!("stream {}: sink rejected {} track", stream_id, track.codec());
        }
        slot.track = Some(track);
    }

    fn flush_all(&mut self) {
        for (&stream_id, slot) in self.slots.iter_mut() {
            if let Some(m) = slot.merge.flush() {
                output_merged(&mut *self.sink, stream_id, m);
            }
        }
    }

    fn flush_stream(&mut self, stream_id: usize) {
        if let Some(m) = self.slots.get_mut(&stream_id).and_then(|s| s.merge.flush()) {
            output_merged(&mut *self.sink, stream_id, m);
        }
    }
}

impl<'s, S: MediaSink + ?Sized> ParserEvents for DemuxState<'s, S> {
    fn on_stream(&mut self, stream_id: usize, stream_type: u8, extra_data: &[u8], finished: bool) {
        if self.finished {
            return;
        }
        match CodecId::from_stream_type(stream_type) {
            Some(codec) if !self.has_track(stream_id) => {
                match Track::new(codec, Bytes::copy_from_slice(extra_data)) {
                    Some(track) => self.add_track(stream_id, track),
                    None => debug!("stream {}: no track support for {}", stream_id, codec),
                }
            }
            Some(_) => {}
            None => debug!(
                "stream {}: skipping unknown stream_type {:#04x}",
                stream_id, stream_type
            ),
        }
        if finished && self.have_video {
            self.finished = true;
            self.sink.add_track_completed();
            info!("track discovery complete");
        }
    }

    fn on_unit(
        &mut self,
        stream_id: usize,
        stream_type: u8,
        _flags: u32,
        pts: i64,
        dts: i64,
        data: &[u8],
    ) {
        let pts = transport_to_ms(pts);
        let dts = transport_to_ms(dts);
        let codec = match CodecId::from_stream_type(stream_type) {
            Some(c) => c,
            None => {
                trace!(
                    "stream {}: dropping unit of unknown stream_type {:#04x}",
                    stream_id,
                    stream_type
                );
                return;
            }
        };
        if !self.has_track(stream_id) {
            // Units may arrive before (or without) a stream description.
            if let Some(track) = Track::new(codec, Bytes::new()) {
                self.add_track(stream_id, track);
            }
        }
        if !self.has_track(stream_id) {
            warn!("stream {}: unsupported codec {}; dropping unit", stream_id, codec);
            return;
        }

        let frame = Frame::new(codec, Bytes::copy_from_slice(data), dts, pts);
        if codec.track_type() != TrackType::Video || !self.options.merge_frame {
            // Nothing marks the end of a video access unit, but another
            // stream's unit right after a keyframe suggests it's complete.
            if let Some(boundary) = self.boundary_stream.take() {
                self.flush_stream(boundary);
            }
            output(&mut *self.sink, stream_id, Some(frame));
            return;
        }

        self.boundary_stream = if frame.is_keyframe() || frame.is_config_frame() {
            Some(stream_id)
        } else {
            None
        };
        let Some(slot) = self.slots.get_mut(&stream_id) else {
            return;
        };
        if let Some(m) = slot.merge.push(frame) {
            output_merged(&mut *self.sink, stream_id, m);
        }
    }
}

fn output_merged<S: MediaSink + ?Sized>(sink: &mut S, stream_id: usize, m: MergedUnit) {
    trace!(
        "stream {}: {}-unit {} access unit at dts {} (keyframe={})",
        stream_id,
        m.units,
        m.codec,
        m.dts,
        m.has_keyframe
    );
    output(sink, stream_id, Some(Frame::new(m.codec, m.data, m.dts, m.pts)));
}

/// Tags `frame` with its stream id and passes it to the sink. Ignores `None`.
fn output<S: MediaSink + ?Sized>(sink: &mut S, stream_id: usize, frame: Option<Frame>) {
    if let Some(mut frame) = frame {
        frame.set_stream_id(stream_id);
        sink.input_frame(frame);
    }
}
