//! Seams between the pipeline and the codec that does the real work.
//!
//! A [`Codec`] hands out a [`BitstreamParser`] and a [`DecodingEngine`] bound to
//! the same codec identity. The pipeline only ever talks to those two traits,
//! so it can be driven by FFmpeg or by a fake.

use crate::error::{EngineError, ParseError};

/// Outcome of one parser call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed<'a> {
    /// Bytes of the offered region the parser took.
    pub consumed: usize,
    /// A complete packet, or an empty slice when none was assembled.
    ///
    /// The slice may point into the offered region or into the parser's own
    /// storage; it is only valid until the next call.
    pub packet: &'a [u8],
}

impl<'a> Parsed<'a> {
    pub fn consumed(consumed: usize) -> Self {
        Self {
            consumed,
            packet: &[],
        }
    }

    pub fn with_packet(consumed: usize, packet: &'a [u8]) -> Self {
        Self { consumed, packet }
    }

    pub fn has_packet(&self) -> bool {
        !self.packet.is_empty()
    }
}

pub trait BitstreamParser {
    /// Consumes bytes from `data`, returning how many were taken and the
    /// packet completed by them, if any.
    ///
    /// An empty `data` asks the parser to release whatever it still holds.
    fn parse<'a>(&'a mut self, data: &'a [u8]) -> Result<Parsed<'a>, ParseError>;
}

/// Result of asking the engine for a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieved {
    /// The picture slot now holds a decoded picture.
    Picture,
    /// Nothing is available until more input is submitted.
    Again,
    /// The engine has been fully drained after end of stream.
    EndOfStream,
}

pub trait DecodingEngine {
    type Picture;

    /// Allocates an empty picture slot, `None` on allocation failure.
    fn alloc_picture(&self) -> Option<Self::Picture>;

    fn open(&mut self) -> Result<(), EngineError>;

    /// Submits a packet, or signals end of stream with `None`.
    fn submit(&mut self, packet: Option<&[u8]>) -> Result<(), EngineError>;

    fn retrieve(&mut self, picture: &mut Self::Picture) -> Result<Retrieved, EngineError>;

    fn close(&mut self);
}

pub trait Codec {
    type Parser: BitstreamParser;
    type Engine: DecodingEngine;

    fn name(&self) -> &str;

    /// Zeroed bytes the parser may read past the end of a chunk.
    fn padding(&self) -> usize;

    fn new_parser(&self) -> Option<Self::Parser>;

    fn new_engine(&self) -> Option<Self::Engine>;
}

/// Picture type produced by a codec's engine.
pub type PictureOf<C> = <<C as Codec>::Engine as DecodingEngine>::Picture;
