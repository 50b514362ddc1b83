use std::io::{self, Write};

use ffmpeg_pipe::ffmpeg_next::frame;
use ffmpeg_pipe::{PictureInfo, Yuv420};

use crate::config::Report;

/// Receives decoded pictures from the pipeline callback.
///
/// The callback cannot fail, so the first write error is kept and surfaced
/// by [`take_error`](Self::take_error) after each ingestion call.
pub struct PictureSink {
    report: Report,
    out: Box<dyn Write + Send>,
    yuv: Option<Box<dyn Write + Send>>,
    count: u64,
    skipped_yuv: u64,
    error: Option<io::Error>,
}

impl PictureSink {
    pub fn new(
        report: Report,
        out: Box<dyn Write + Send>,
        yuv: Option<Box<dyn Write + Send>>,
    ) -> Self {
        Self {
            report,
            out,
            yuv,
            count: 0,
            skipped_yuv: 0,
            error: None,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn accept(&mut self, picture: &frame::Video) {
        let info = PictureInfo::new(self.count, picture);
        self.count += 1;
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write(&info, picture) {
            self.error = Some(e);
        }
    }

    fn write(&mut self, info: &PictureInfo, picture: &frame::Video) -> io::Result<()> {
        match self.report {
            Report::Log => log::info!("{}", info),
            Report::Json => {
                serde_json::to_writer(&mut self.out, info)?;
                self.out.write_all(b"\n")?;
            }
            Report::None => {}
        }

        if let Some(yuv) = self.yuv.as_mut() {
            match Yuv420::from_frame(picture) {
                Some(view) => yuv.write_all(&view.packed())?,
                None => {
                    if self.skipped_yuv == 0 {
                        log::warn!("{} is not planar 4:2:0, not written to yuv output", info.format);
                    }
                    self.skipped_yuv += 1;
                }
            }
        }
        Ok(())
    }

    pub fn take_error(&mut self) -> io::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.take_error()?;
        self.out.flush()?;
        if let Some(yuv) = self.yuv.as_mut() {
            yuv.flush()?;
        }
        if self.skipped_yuv > 0 {
            log::warn!("{} pictures left out of yuv output", self.skipped_yuv);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use ffmpeg_pipe::ffmpeg_next::format::Pixel;

    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn bytes(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn picture(format: Pixel, level: u8) -> frame::Video {
        let mut picture = frame::Video::new(format, 4, 2);
        for plane in 0..picture.planes() {
            picture.data_mut(plane).fill(level);
        }
        picture
    }

    #[test]
    fn test_json_lines() -> anyhow::Result<()> {
        ffmpeg_pipe::init()?;
        let out = Shared::default();
        let mut sink = PictureSink::new(Report::Json, Box::new(out.clone()), None);
        sink.accept(&picture(Pixel::YUV420P, 1));
        sink.accept(&picture(Pixel::YUV420P, 2));
        sink.flush()?;
        assert_eq!(sink.count(), 2);

        let text = String::from_utf8(out.bytes())?;
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["index"], 1);
        assert_eq!(lines[0]["width"], 4);
        assert_eq!(lines[0]["format"], "YUV420P");
        Ok(())
    }

    #[test]
    fn test_yuv_output_is_packed() -> anyhow::Result<()> {
        ffmpeg_pipe::init()?;
        let yuv = Shared::default();
        let mut sink = PictureSink::new(
            Report::None,
            Box::new(io::sink()),
            Some(Box::new(yuv.clone())),
        );
        sink.accept(&picture(Pixel::YUV420P, 7));
        sink.accept(&picture(Pixel::RGB24, 9));
        sink.flush()?;

        // 4x2 luma plus two 2x1 chroma planes; the RGB picture is skipped
        assert_eq!(yuv.bytes(), vec![7; 12]);
        assert_eq!(sink.count(), 2);
        Ok(())
    }

    #[test]
    fn test_write_error_is_kept() -> anyhow::Result<()> {
        ffmpeg_pipe::init()?;
        let mut sink = PictureSink::new(Report::Json, Box::new(Broken), None);
        sink.accept(&picture(Pixel::YUV420P, 0));
        sink.accept(&picture(Pixel::YUV420P, 0));
        assert!(sink.take_error().is_err());
        assert!(sink.take_error().is_ok());
        Ok(())
    }
}
