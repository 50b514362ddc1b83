use std::os::raw::c_int;
use std::ptr;

use ffmpeg_next::ffi;

use crate::{
    codec::{BitstreamParser, Parsed},
    error::ParseError,
};

/// FFmpeg's bitstream parser for one codec.
pub struct AvParser {
    parser: *mut ffi::AVCodecParserContext,
    // av_parser_parse2 wants a codec context; this one belongs to the parser alone
    context: ffmpeg_next::codec::Context,
}

unsafe impl Send for AvParser {}

impl AvParser {
    pub fn new(id: ffmpeg_next::codec::Id, codec: ffmpeg_next::Codec) -> Option<Self> {
        let context = ffmpeg_next::codec::Context::new_with_codec(codec);
        if unsafe { context.as_ptr() }.is_null() {
            return None;
        }

        let codec_id: ffi::AVCodecID = id.into();
        let parser = unsafe { ffi::av_parser_init(codec_id as c_int) };
        if parser.is_null() {
            log::debug!("no bitstream parser for {:?}", id);
            return None;
        }

        Some(Self { parser, context })
    }
}

impl BitstreamParser for AvParser {
    fn parse<'a>(&'a mut self, data: &'a [u8]) -> Result<Parsed<'a>, ParseError> {
        let offered = data.len().min(c_int::MAX as usize);
        let mut out: *mut u8 = ptr::null_mut();
        let mut out_size: c_int = 0;

        let ret = unsafe {
            ffi::av_parser_parse2(
                self.parser,
                self.context.as_mut_ptr(),
                &mut out,
                &mut out_size,
                data.as_ptr(),
                offered as c_int,
                ffi::AV_NOPTS_VALUE as i64,
                ffi::AV_NOPTS_VALUE as i64,
                0,
            )
        };
        if ret < 0 {
            return Err(ParseError::Failed(ret));
        }

        // `out` points either into `data` or into the parser's own buffer,
        // both of which outlive 'a
        let packet = if out.is_null() || out_size <= 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(out, out_size as usize) }
        };
        Ok(Parsed::with_packet(ret as usize, packet))
    }
}

impl Drop for AvParser {
    fn drop(&mut self) {
        unsafe { ffi::av_parser_close(self.parser) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h264_parser() -> Option<AvParser> {
        crate::init().ok()?;
        let codec = ffmpeg_next::decoder::find(ffmpeg_next::codec::Id::H264)?;
        AvParser::new(ffmpeg_next::codec::Id::H264, codec)
    }

    #[test]
    fn test_parser_holds_incomplete_unit() {
        let Some(mut parser) = h264_parser() else {
            eprintln!("skip: h264 parser not available");
            return;
        };
        // a lone access unit delimiter: no following start code yet
        let data = [0x00, 0x00, 0x00, 0x01, 0x09, 0x10];
        let parsed = parser.parse(&data).unwrap();
        assert_eq!(parsed.consumed, data.len());
        assert!(!parsed.has_packet());
    }

    #[test]
    fn test_parser_for_unknown_codec() {
        if crate::init().is_err() {
            return;
        }
        let Some(codec) = ffmpeg_next::decoder::find(ffmpeg_next::codec::Id::H264) else {
            return;
        };
        // the parser is chosen by id; there is none for a subtitle codec
        assert!(AvParser::new(ffmpeg_next::codec::Id::SUBRIP, codec).is_none());
    }
}
