//! Elementary-stream decoding on top of FFmpeg.
//!
//! Raw bitstream bytes go in through [`Pipeline::decode`] in chunks of any
//! size; decoded pictures come out through a callback. The pipeline is
//! generic over [`Codec`], and [`AvPipeline`] binds it to libavcodec.

use std::sync::OnceLock;

pub mod buffer;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod hw;
pub mod parser;
pub mod pipeline;

pub use buffer::{DEFAULT_CAPACITY, WorkingBuffer};
pub use codec::{BitstreamParser, Codec, DecodingEngine, Parsed, PictureOf, Retrieved};
pub use decoder::{AvCodec, AvEngine, AvPipeline, Settings, codec_id_by_name};
pub use error::{DecodeError, EngineError, ParseError, Resource, Result};
pub use frame::{PictureInfo, Yuv420};
pub use parser::AvParser;
pub use pipeline::Pipeline;

pub use ffmpeg_next;

static INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Registers FFmpeg components and routes its log level from ours. Safe to
/// call any number of times; only the first call does the work.
pub fn init() -> anyhow::Result<()> {
    INIT.get_or_init(|| {
        ffmpeg_next::init().map_err(|e| e.to_string())?;
        ffmpeg_next::util::log::set_level(ffmpeg_log_level(log::max_level()));
        Ok(())
    })
    .clone()
    .map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))
}

fn ffmpeg_log_level(level: log::LevelFilter) -> ffmpeg_next::util::log::Level {
    use ffmpeg_next::util::log::Level;
    match level {
        log::LevelFilter::Off => Level::Quiet,
        log::LevelFilter::Error => Level::Error,
        log::LevelFilter::Warn => Level::Warning,
        log::LevelFilter::Info => Level::Info,
        log::LevelFilter::Debug => Level::Verbose,
        log::LevelFilter::Trace => Level::Debug,
    }
}
