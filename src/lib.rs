// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MPEG-PS/TS elementary stream demultiplexing.
//!
//! A [`demux::Demuxer`] accepts raw program stream or transport stream bytes
//! (typically as carried over RTP), discovers the elementary streams within,
//! and pushes timestamped, codec-tagged [`codec::Frame`]s into a
//! [`sink::MediaSink`]. The container grammar itself is supplied by a
//! [`parser::ContainerParser`] implementation registered with a
//! [`parser::ParserRegistry`].

#![forbid(clippy::print_stderr, clippy::print_stdout)]

use std::fmt::Display;
use std::str::FromStr;

mod error;

#[cfg(test)]
mod testutil;

pub use error::Error;

/// Wraps the supplied `ErrorInt` and returns it as an `Err`.
macro_rules! bail {
    ($e:expr) => {
        return Err(crate::error::Error(std::sync::Arc::new($e)))
    };
}

pub mod codec;
pub mod demux;
pub mod merge;
pub mod parser;
pub mod sink;

use error::ErrorInt;

/// Clock rate of MPEG-2 systems `PTS`/`DTS` values, in Hz.
pub const TRANSPORT_CLOCK_RATE: i64 = 90_000;

/// Transport clock units per output (millisecond) unit.
const TICKS_PER_MS: i64 = TRANSPORT_CLOCK_RATE / 1_000;

/// Rescales a 90 kHz transport timestamp to milliseconds.
///
/// This truncates: fractional milliseconds are discarded rather than rounded,
/// so consumers should tolerate ±1 ms of jitter between streams.
#[inline]
pub fn transport_to_ms(ts: i64) -> i64 {
    ts / TICKS_PER_MS
}

/// A container format family which a [`parser::ContainerParser`] understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerFamily {
    /// MPEG-2 program stream (ISO/IEC 13818-1 section 2.5), as used by GB28181.
    Ps,

    /// MPEG-2 transport stream (ISO/IEC 13818-1 section 2.4).
    Ts,
}

impl Display for ContainerFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerFamily::Ps => f.pad("ps"),
            ContainerFamily::Ts => f.pad("ts"),
        }
    }
}

impl FromStr for ContainerFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ps" | "PS" => ContainerFamily::Ps,
            "ts" | "TS" => ContainerFamily::Ts,
            _ => bail!(ErrorInt::InvalidArgument(format!(
                "container family {s:?} not understood"
            ))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale() {
        assert_eq!(transport_to_ms(900), 10);
        assert_eq!(transport_to_ms(990), 11);
        assert_eq!(transport_to_ms(989), 10);
        assert_eq!(transport_to_ms(89), 0);
        assert_eq!(transport_to_ms(0), 0);
    }

    #[test]
    fn family_parse() {
        assert_eq!("ps".parse::<ContainerFamily>().unwrap(), ContainerFamily::Ps);
        assert_eq!("TS".parse::<ContainerFamily>().unwrap(), ContainerFamily::Ts);
        let e = "mp4".parse::<ContainerFamily>().unwrap_err();
        assert!(e.to_string().contains("mp4"), "{e}");
        assert_eq!(ContainerFamily::Ps.to_string(), "ps");
    }
}
