use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ffmpeg_pipe::Settings;

/// How decoded pictures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Report {
    /// One log line per picture
    Log,
    /// One JSON object per line on stdout
    Json,
    /// Count pictures only
    None,
}

/// Decodes a raw video elementary stream
#[derive(Debug, Parser)]
#[clap(name = "es-decode", version)]
pub struct Cli {
    /// Elementary stream file, or - to read stdin
    pub input: String,

    /// Codec of the stream: h264, hevc, mpeg2video, mpeg4, vp8, vp9, av1, ...
    #[clap(short = 'c', long, default_value = "h264")]
    pub codec: String,

    /// Decoder implementation to use instead of the codec's default, e.g. h264_cuvid
    #[clap(short = 'd', long)]
    pub decoder: Option<String>,

    /// Prefer a hardware decoder, falling back to software
    #[clap(long)]
    pub hw: bool,

    /// Working buffer capacity in bytes
    #[clap(long, default_value_t = 4096)]
    pub buffer_capacity: usize,

    /// Bytes read from the input per ingestion call
    #[clap(long, default_value_t = 64 * 1024)]
    pub read_size: usize,

    #[clap(long, value_enum, default_value_t = Report::Log)]
    pub report: Report,

    /// Append packed I420 pictures to this file
    #[clap(short = 'o', long)]
    pub yuv: Option<PathBuf>,

    /// Flush the decoder at end of input and report the pictures it held back
    #[clap(long)]
    pub drain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    fn parse(arg: &str) -> Self {
        if arg == "-" {
            Input::Stdin
        } else {
            Input::File(PathBuf::from(arg))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeConfig {
    pub input: Input,
    pub settings: Settings,
    pub read_size: usize,
    pub report: Report,
    pub yuv: Option<PathBuf>,
    pub drain: bool,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<DecodeConfig> {
        let buffer_capacity = NonZeroUsize::new(self.buffer_capacity)
            .ok_or_else(|| anyhow::anyhow!("buffer capacity must be positive"))?;
        if self.read_size == 0 {
            anyhow::bail!("read size must be positive");
        }
        let codec = ffmpeg_pipe::codec_id_by_name(&self.codec)
            .ok_or_else(|| anyhow::anyhow!("unknown codec: {}", self.codec))?;

        Ok(DecodeConfig {
            input: Input::parse(&self.input),
            settings: Settings {
                codec,
                decoder: self.decoder,
                hardware: self.hw,
                buffer_capacity,
            },
            read_size: self.read_size,
            report: self.report,
            yuv: self.yuv,
            drain: self.drain,
        })
    }
}
