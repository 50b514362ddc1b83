use std::num::NonZeroUsize;
use std::os::raw::c_int;
use std::ptr;

use ffmpeg_next::{Packet, codec::Id, frame};

use crate::{
    buffer::DEFAULT_CAPACITY,
    codec::{Codec, DecodingEngine, Retrieved},
    error::{DecodeError, EngineError, Resource, Result},
    hw::{find_hw_decoder, is_hw_decoder},
    parser::AvParser,
    pipeline::Pipeline,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub codec: Id,
    // decoder implementation by name, e.g. "h264_cuvid"; overrides `codec`
    pub decoder: Option<String>,
    // try cuvid/qsv/v4l2m2m before the software decoder
    pub hardware: bool,
    pub buffer_capacity: NonZeroUsize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codec: Id::H264,
            decoder: None,
            hardware: false,
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Settings {
    pub fn new(codec: Id) -> Self {
        Self {
            codec,
            ..Default::default()
        }
    }
}

/// Resolves a codec by decoder name ("h264", "hevc", "mpeg2video", ...).
pub fn codec_id_by_name(name: &str) -> Option<Id> {
    crate::init().ok()?;
    let name = match name {
        "h265" => "hevc",
        "mpeg2" => "mpeg2video",
        other => other,
    };
    ffmpeg_next::decoder::find_by_name(name).map(|codec| codec.id())
}

/// A libavcodec decoder together with the parser for its codec id.
#[derive(Clone, Copy)]
pub struct AvCodec {
    id: Id,
    decoder: ffmpeg_next::Codec,
}

impl AvCodec {
    pub fn find(settings: &Settings) -> Result<Self> {
        if let Err(e) = crate::init() {
            log::error!("{:#}", e);
            return Err(DecodeError::ResourceAcquisition(Resource::Codec));
        }

        let decoder = match settings.decoder.as_deref() {
            Some(name) => ffmpeg_next::decoder::find_by_name(name),
            None if settings.hardware => find_hw_decoder(settings.codec)
                .or_else(|| ffmpeg_next::decoder::find(settings.codec)),
            None => ffmpeg_next::decoder::find(settings.codec),
        }
        .ok_or(DecodeError::ResourceAcquisition(Resource::Codec))?;

        Ok(Self {
            id: decoder.id(),
            decoder,
        })
    }

    pub fn software(id: Id) -> Result<Self> {
        let decoder = ffmpeg_next::decoder::find(id)
            .ok_or(DecodeError::ResourceAcquisition(Resource::Codec))?;
        Ok(Self { id, decoder })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn is_hardware(&self) -> bool {
        is_hw_decoder(self.decoder.name())
    }
}

impl Codec for AvCodec {
    type Parser = AvParser;
    type Engine = AvEngine;

    fn name(&self) -> &str {
        self.decoder.name()
    }

    fn padding(&self) -> usize {
        ffmpeg_next::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize
    }

    fn new_parser(&self) -> Option<AvParser> {
        AvParser::new(self.id, self.decoder)
    }

    fn new_engine(&self) -> Option<AvEngine> {
        AvEngine::new(self.decoder)
    }
}

enum EngineState {
    Allocated(ffmpeg_next::codec::Context),
    Open(ffmpeg_next::codec::decoder::Video),
    Closed,
}

/// libavcodec decoding context driven through send/receive.
pub struct AvEngine {
    codec: ffmpeg_next::Codec,
    // reused for every submission; borrows the caller's bytes only during send
    packet: Packet,
    state: EngineState,
}

unsafe impl Send for AvEngine {}

fn invalid_state(what: &str) -> EngineError {
    let err = ffmpeg_next::Error::Other {
        errno: ffmpeg_next::util::error::EINVAL,
    };
    EngineError::new(i32::from(err), what)
}

impl AvEngine {
    pub fn new(codec: ffmpeg_next::Codec) -> Option<Self> {
        let packet = Packet::empty();
        let context = ffmpeg_next::codec::Context::new_with_codec(codec);
        if unsafe { context.as_ptr() }.is_null() {
            return None;
        }
        Some(Self {
            codec,
            packet,
            state: EngineState::Allocated(context),
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EngineState::Open(_))
    }

    fn decoder(
        &mut self,
    ) -> std::result::Result<&mut ffmpeg_next::codec::decoder::Video, EngineError> {
        match &mut self.state {
            EngineState::Open(decoder) => Ok(decoder),
            _ => Err(invalid_state("decoder is not open")),
        }
    }
}

impl DecodingEngine for AvEngine {
    type Picture = frame::Video;

    fn alloc_picture(&self) -> Option<frame::Video> {
        let picture = frame::Video::empty();
        if unsafe { picture.as_ptr() }.is_null() {
            return None;
        }
        Some(picture)
    }

    fn open(&mut self) -> std::result::Result<(), EngineError> {
        let context = match std::mem::replace(&mut self.state, EngineState::Closed) {
            EngineState::Allocated(context) => context,
            EngineState::Open(decoder) => {
                self.state = EngineState::Open(decoder);
                return Ok(());
            }
            EngineState::Closed => return Err(invalid_state("decoder is closed")),
        };

        let decoder = context.decoder().open_as(self.codec)?.video()?;
        log::info!("decoder opened: {}", self.codec.name());
        self.state = EngineState::Open(decoder);
        Ok(())
    }

    fn submit(&mut self, packet: Option<&[u8]>) -> std::result::Result<(), EngineError> {
        let Some(data) = packet else {
            self.decoder()?.send_eof()?;
            return Ok(());
        };

        let size = c_int::try_from(data.len()).map_err(|_| invalid_state("packet too large"))?;
        let EngineState::Open(decoder) = &mut self.state else {
            return Err(invalid_state("decoder is not open"));
        };
        // the packet is not refcounted, so send_packet copies the bytes
        unsafe {
            let pkt = self.packet.as_mut_ptr();
            (*pkt).data = data.as_ptr() as *mut u8;
            (*pkt).size = size;
        }
        let result = decoder.send_packet(&self.packet);
        unsafe {
            let pkt = self.packet.as_mut_ptr();
            (*pkt).data = ptr::null_mut();
            (*pkt).size = 0;
        }
        result.map_err(EngineError::from)
    }

    fn retrieve(
        &mut self,
        picture: &mut frame::Video,
    ) -> std::result::Result<Retrieved, EngineError> {
        match self.decoder()?.receive_frame(picture) {
            Ok(()) => Ok(Retrieved::Picture),
            Err(ffmpeg_next::Error::Eof) => Ok(Retrieved::EndOfStream),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(Retrieved::Again)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn close(&mut self) {
        if let EngineState::Open(_) = std::mem::replace(&mut self.state, EngineState::Closed) {
            log::debug!("decoder closed: {}", self.codec.name());
        }
    }
}

/// Pipeline over a libavcodec decoder.
pub type AvPipeline = Pipeline<AvCodec>;

impl Pipeline<AvCodec> {
    /// Opens a pipeline for `settings`, falling back to the software decoder
    /// when a hardware one was picked and fails to open.
    pub fn new(settings: &Settings) -> Result<Self> {
        let codec = AvCodec::find(settings)?;
        match Pipeline::open(&codec, settings.buffer_capacity) {
            Err(DecodeError::Open(e)) if codec.is_hardware() && settings.decoder.is_none() => {
                log::warn!(
                    "hardware decoder {} failed: {}, falling back to software",
                    codec.name(),
                    e
                );
                let codec = AvCodec::software(codec.id())?;
                Pipeline::open(&codec, settings.buffer_capacity)
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;
