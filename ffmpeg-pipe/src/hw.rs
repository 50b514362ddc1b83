//! Hardware-accelerated decoder discovery.
//!
//! Looks up CUDA/QSV/V4L2M2M decoders for a codec; callers fall back to the
//! software decoder when none is found or when it fails to open.

use ffmpeg_next::codec::Id;

const HW_SUFFIXES: &[&str] = &["_cuvid", "_qsv", "_v4l2m2m"];

/// Candidate hardware decoder names for a codec, in order of preference.
pub fn hw_decoder_names(codec_id: Id) -> &'static [&'static str] {
    match codec_id {
        Id::H264 => &["h264_cuvid", "h264_qsv", "h264_v4l2m2m"],
        Id::HEVC => &["hevc_cuvid", "hevc_qsv", "hevc_v4l2m2m"],
        Id::VP8 => &["vp8_cuvid", "vp8_qsv", "vp8_v4l2m2m"],
        Id::VP9 => &["vp9_cuvid", "vp9_qsv", "vp9_v4l2m2m"],
        Id::AV1 => &["av1_cuvid", "av1_qsv"],
        Id::MPEG2VIDEO => &["mpeg2_cuvid", "mpeg2_qsv", "mpeg2_v4l2m2m"],
        Id::MPEG4 => &["mpeg4_cuvid", "mpeg4_v4l2m2m"],
        _ => &[],
    }
}

/// Returns the first hardware decoder FFmpeg was built with, if any.
pub fn find_hw_decoder(codec_id: Id) -> Option<ffmpeg_next::Codec> {
    for name in hw_decoder_names(codec_id) {
        if let Some(codec) = ffmpeg_next::decoder::find_by_name(name) {
            log::info!("found hardware decoder: {}", name);
            return Some(codec);
        }
    }
    None
}

pub fn is_hw_decoder(name: &str) -> bool {
    HW_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
