//! Error types for the decode pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// A resource acquired while opening a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Codec,
    WorkingBuffer,
    Parser,
    Engine,
    Picture,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Codec => "codec",
            Resource::WorkingBuffer => "input buffer",
            Resource::Parser => "bitstream parser",
            Resource::Engine => "decoder context",
            Resource::Picture => "picture",
        };
        f.write_str(name)
    }
}

/// Failure reported by a decoding engine, carrying the engine's own code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    code: i32,
    message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for EngineError {}

impl From<ffmpeg_next::Error> for EngineError {
    fn from(err: ffmpeg_next::Error) -> Self {
        let message = err.to_string();
        Self::new(i32::from(err), message)
    }
}

/// Failure reported while splitting the bitstream into packets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parser failed with code {0}")]
    Failed(i32),

    #[error("parser consumed {consumed} bytes but only {available} were offered")]
    Overrun { consumed: usize, available: usize },

    #[error("parser made no progress over {available} bytes")]
    Stalled { available: usize },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Setup could not acquire one of the pipeline's resources.
    #[error("unable to acquire {0}")]
    ResourceAcquisition(Resource),

    /// The decoder context could not be opened.
    #[error("unable to open decoder: {0}")]
    Open(#[source] EngineError),

    #[error("malformed bitstream: {0}")]
    Parse(#[from] ParseError),

    #[error("decoder rejected packet: {0}")]
    EngineRejectedInput(#[source] EngineError),

    #[error("decoder failed: {0}")]
    EngineDecode(#[source] EngineError),

    /// Input was fed after the pipeline had been finished.
    #[error("pipeline already finished")]
    Finished,
}

impl DecodeError {
    /// Engine code carried by engine-side failures.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            DecodeError::Open(e)
            | DecodeError::EngineRejectedInput(e)
            | DecodeError::EngineDecode(e) => Some(e.code()),
            _ => None,
        }
    }
}
