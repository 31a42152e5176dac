// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Container grammar plumbing.
//!
//! This crate doesn't itself implement the program/transport stream
//! grammars. Instead, a [`ContainerParser`] turns raw container bytes into
//! [`ParserEvents`] notifications, and a [`ParserRegistry`] records which
//! families the current build can parse.

use std::collections::HashMap;

use crate::ContainerFamily;

/// Receives the structure a [`ContainerParser`] discovers.
///
/// Both methods are called synchronously from within [`ContainerParser::input`],
/// in stream order.
pub trait ParserEvents {
    /// Notes a stream described by the container (eg a program stream map or
    /// transport stream PMT entry).
    ///
    /// `finished` is set on the last stream of a complete description. Some
    /// program streams set it prematurely, before describing their video.
    fn on_stream(&mut self, stream_id: usize, stream_type: u8, extra_data: &[u8], finished: bool);

    /// Delivers one elementary stream unit (typically one PES packet's payload).
    ///
    /// `pts` and `dts` are in 90 kHz units. `flags` are parser-specific and
    /// informational only.
    fn on_unit(
        &mut self,
        stream_id: usize,
        stream_type: u8,
        flags: u32,
        pts: i64,
        dts: i64,
        data: &[u8],
    );
}

/// A push parser for one container family.
///
/// Implementations buffer partial packets across calls as needed.
pub trait ContainerParser: std::fmt::Debug {
    /// Parses `data`, which follows the data from previous calls, reporting
    /// structure to `events`.
    ///
    /// Returns the number of bytes consumed, or a description of the fault.
    /// After a fault, the parser must accept further calls.
    fn input(&mut self, data: &[u8], events: &mut dyn ParserEvents) -> Result<usize, String>;
}

type ParserFn = Box<dyn Fn() -> Box<dyn ContainerParser> + Send + Sync>;

/// The set of container families this build can parse.
///
/// Empty by default; register a constructor for each supported family.
#[derive(Default)]
pub struct ParserRegistry {
    constructors: HashMap<ContainerFamily, ParserFn>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser constructor for `family`, replacing any existing one.
    pub fn register<F>(mut self, family: ContainerFamily, f: F) -> Self
    where
        F: Fn() -> Box<dyn ContainerParser> + Send + Sync + 'static,
    {
        self.constructors.insert(family, Box::new(f));
        self
    }

    pub fn supports(&self, family: ContainerFamily) -> bool {
        self.constructors.contains_key(&family)
    }

    /// Creates a parser for `family`, or `None` if the family isn't registered.
    pub fn create(&self, family: ContainerFamily) -> Option<Box<dyn ContainerParser>> {
        self.constructors.get(&family).map(|f| f())
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.constructors.keys().collect();
        families.sort();
        f.debug_struct("ParserRegistry")
            .field("families", &families)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedParser;

    #[test]
    fn capability_query() {
        let r = ParserRegistry::new();
        assert!(!r.supports(ContainerFamily::Ps));
        assert!(r.create(ContainerFamily::Ps).is_none());

        let r = r.register(ContainerFamily::Ps, || {
            Box::new(ScriptedParser::default()) as Box<dyn ContainerParser>
        });
        assert!(r.supports(ContainerFamily::Ps));
        assert!(!r.supports(ContainerFamily::Ts));
        assert!(r.create(ContainerFamily::Ps).is_some());
        assert!(r.create(ContainerFamily::Ts).is_none());
        assert_eq!(format!("{r:?}"), "ParserRegistry { families: [Ps] }");
    }
}
