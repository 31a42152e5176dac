// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt::Display, sync::Arc};

use crate::ContainerFamily;
use thiserror::Error;

/// An opaque `std::error::Error + Send + Sync + 'static` implementation.
///
/// Currently the focus is on providing detailed human-readable error messages.
/// Parse errors include the byte position within the fed stream, which
/// should be enough to find the offending data in a capture.
#[derive(Clone)]
pub struct Error(pub(crate) Arc<ErrorInt>);

impl Error {
    /// Returns the stream byte position at which a parse fault's input began,
    /// if this is a parse fault.
    pub fn stream_pos(&self) -> Option<u64> {
        match &*self.0 {
            ErrorInt::ParseError { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Error)]
pub(crate) enum ErrorInt {
    /// The method's caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The container parser rejected the input.
    #[error(
        "[{family} @ {pos}, {len}-byte input] parse error: {description}\n{:?}",
        pretty_hex::PrettyHex::hex_dump(prefix)
    )]
    ParseError {
        family: ContainerFamily,
        pos: u64,
        len: usize,

        /// Leading bytes of the rejected input, for diagnostics.
        prefix: Vec<u8>,
        description: String,
    },
}
