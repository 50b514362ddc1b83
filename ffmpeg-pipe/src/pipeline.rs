use std::num::NonZeroUsize;

use crate::{
    buffer::WorkingBuffer,
    codec::{BitstreamParser, Codec, DecodingEngine, PictureOf, Retrieved},
    error::{DecodeError, ParseError, Resource, Result},
};

/// Splits an elementary stream into packets and decodes them.
///
/// Input of any size is copied into a fixed working buffer, the codec's parser
/// is driven over each chunk until it is used up, and every packet it
/// completes is submitted to the engine, which is then drained. Pictures are
/// handed to the caller's callback in the order the engine releases them.
///
/// Dropping the pipeline tears it down: end of stream is signalled to the
/// engine, which is then closed, and resources are released in the reverse
/// order they were acquired. Pictures released by that final signal are not
/// delivered; call [`finish`](Self::finish) first to collect them.
pub struct Pipeline<C: Codec> {
    // field order is drop order
    picture: PictureOf<C>,
    engine: C::Engine,
    parser: C::Parser,
    buffer: WorkingBuffer,
    codec_name: String,
    finished: bool,
    eos_sent: bool,
}

impl<C: Codec> Pipeline<C> {
    pub fn open(codec: &C, capacity: NonZeroUsize) -> Result<Self> {
        let buffer = WorkingBuffer::new(capacity, codec.padding())
            .ok_or(DecodeError::ResourceAcquisition(Resource::WorkingBuffer))?;
        let parser = codec
            .new_parser()
            .ok_or(DecodeError::ResourceAcquisition(Resource::Parser))?;
        let mut engine = codec
            .new_engine()
            .ok_or(DecodeError::ResourceAcquisition(Resource::Engine))?;
        let picture = engine
            .alloc_picture()
            .ok_or(DecodeError::ResourceAcquisition(Resource::Picture))?;

        engine.open().map_err(DecodeError::Open)?;
        log::debug!(
            "pipeline opened: codec={}, capacity={}",
            codec.name(),
            capacity
        );

        Ok(Self {
            picture,
            engine,
            parser,
            buffer,
            codec_name: codec.name().to_string(),
            finished: false,
            eos_sent: false,
        })
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Feeds `input` through the parser and engine.
    ///
    /// Parser state persists across calls, so a packet may be split between
    /// any number of them. On error, pictures already passed to `on_picture`
    /// during this call stay delivered.
    pub fn decode<F>(&mut self, input: &[u8], mut on_picture: F) -> Result<()>
    where
        F: FnMut(&PictureOf<C>),
    {
        if self.finished {
            return Err(DecodeError::Finished);
        }

        for chunk in self.buffer.chunks(input) {
            let region = self.buffer.load(chunk);
            Self::parse_region(
                &mut self.parser,
                &mut self.engine,
                &mut self.picture,
                region,
                &mut on_picture,
            )?;
        }
        Ok(())
    }

    /// Flushes the parser and the engine, delivering every picture still
    /// buffered. No further input is accepted afterwards.
    pub fn finish<F>(&mut self, mut on_picture: F) -> Result<()>
    where
        F: FnMut(&PictureOf<C>),
    {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let parsed = self.parser.parse(&[])?;
        if parsed.has_packet() {
            Self::submit(&mut self.engine, parsed.packet)?;
            Self::drain(&mut self.engine, &mut self.picture, &mut on_picture)?;
        }

        self.engine
            .submit(None)
            .map_err(DecodeError::EngineRejectedInput)?;
        self.eos_sent = true;
        let drained = Self::drain(&mut self.engine, &mut self.picture, &mut on_picture)?;
        log::debug!("{}: flushed {} pictures", self.codec_name, drained);
        Ok(())
    }

    /// Tears the pipeline down. Equivalent to dropping it.
    pub fn close(self) {}

    fn parse_region<F>(
        parser: &mut C::Parser,
        engine: &mut C::Engine,
        picture: &mut PictureOf<C>,
        mut data: &[u8],
        on_picture: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&PictureOf<C>),
    {
        while !data.is_empty() {
            let available = data.len();
            let parsed = parser.parse(data)?;
            if parsed.consumed > available {
                return Err(ParseError::Overrun {
                    consumed: parsed.consumed,
                    available,
                }
                .into());
            }
            if parsed.consumed == 0 && !parsed.has_packet() {
                return Err(ParseError::Stalled { available }.into());
            }
            data = &data[parsed.consumed..];

            if parsed.has_packet() {
                log::trace!(
                    "packet: {} bytes, {} bytes left in chunk",
                    parsed.packet.len(),
                    data.len()
                );
                Self::submit(engine, parsed.packet)?;
                Self::drain(engine, picture, on_picture)?;
            }
        }
        Ok(())
    }

    fn submit(engine: &mut C::Engine, packet: &[u8]) -> Result<()> {
        engine
            .submit(Some(packet))
            .map_err(DecodeError::EngineRejectedInput)
    }

    fn drain<F>(
        engine: &mut C::Engine,
        picture: &mut PictureOf<C>,
        on_picture: &mut F,
    ) -> Result<usize>
    where
        F: FnMut(&PictureOf<C>),
    {
        let mut count = 0;
        loop {
            match engine.retrieve(picture).map_err(DecodeError::EngineDecode)? {
                Retrieved::Picture => {
                    on_picture(&*picture);
                    count += 1;
                }
                Retrieved::Again | Retrieved::EndOfStream => return Ok(count),
            }
        }
    }
}

impl<C: Codec> Drop for Pipeline<C> {
    fn drop(&mut self) {
        if !self.eos_sent {
            if let Err(e) = self.engine.submit(None) {
                log::warn!("{}: end of stream rejected on close: {}", self.codec_name, e);
            }
        }
        self.engine.close();
        log::debug!("pipeline closed: codec={}", self.codec_name);
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
