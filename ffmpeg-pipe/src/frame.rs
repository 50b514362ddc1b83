use std::fmt::{Display, Formatter};

use bytes::{BufMut, Bytes, BytesMut};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;
use serde::Serialize;

/// Summary of a decoded picture, detached from the engine's picture slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PictureInfo {
    /// Position in delivery order, starting at zero.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    // picture type as reported by the decoder: I, P, B, ...
    pub kind: String,
    pub is_key: bool,
    pub pts: Option<i64>,
}

impl PictureInfo {
    pub fn new(index: u64, picture: &frame::Video) -> Self {
        Self {
            index,
            width: picture.width(),
            height: picture.height(),
            format: format!("{:?}", picture.format()),
            kind: format!("{:?}", picture.kind()),
            is_key: picture.is_key(),
            pts: picture.pts(),
        }
    }
}

impl Display for PictureInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "Picture index: {}, width: {}, height: {}, format: {}, kind: {}, is_key: {}, pts: {}",
            self.index,
            self.width,
            self.height,
            self.format,
            self.kind,
            self.is_key,
            self.pts
                .map(|pts| pts.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

/// Borrowed view of a planar 4:2:0 picture.
///
/// Chroma planes are half the luma size in each direction, rounded up. Rows
/// may be padded out to their stride.
#[derive(Debug, Clone, Copy)]
pub struct Yuv420<'a> {
    y: &'a [u8],
    cb: &'a [u8],
    cr: &'a [u8],
    y_stride: usize,
    c_stride: usize,
    width: usize,
    height: usize,
}

fn plane_fits(plane: &[u8], stride: usize, width: usize, rows: usize) -> bool {
    if rows == 0 || width == 0 {
        return true;
    }
    stride >= width
        && stride
            .checked_mul(rows - 1)
            .and_then(|n| n.checked_add(width))
            .is_some_and(|needed| plane.len() >= needed)
}

impl<'a> Yuv420<'a> {
    /// Builds a view, returning `None` when a plane is too short for the
    /// given geometry.
    pub fn new(
        planes: [&'a [u8]; 3],
        y_stride: usize,
        c_stride: usize,
        width: usize,
        height: usize,
    ) -> Option<Self> {
        let [y, cb, cr] = planes;
        let view = Self {
            y,
            cb,
            cr,
            y_stride,
            c_stride,
            width,
            height,
        };
        let (cw, ch) = (view.chroma_width(), view.chroma_height());
        if plane_fits(y, y_stride, width, height)
            && plane_fits(cb, c_stride, cw, ch)
            && plane_fits(cr, c_stride, cw, ch)
        {
            Some(view)
        } else {
            None
        }
    }

    /// Views a decoded picture, `None` unless it is YUV420P or YUVJ420P.
    pub fn from_frame(picture: &'a frame::Video) -> Option<Self> {
        if !matches!(picture.format(), Pixel::YUV420P | Pixel::YUVJ420P) {
            return None;
        }
        if picture.stride(1) != picture.stride(2) {
            return None;
        }
        Self::new(
            [picture.data(0), picture.data(1), picture.data(2)],
            picture.stride(0),
            picture.stride(1),
            picture.width() as usize,
            picture.height() as usize,
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn chroma_width(&self) -> usize {
        self.width.div_ceil(2)
    }

    pub fn chroma_height(&self) -> usize {
        self.height.div_ceil(2)
    }

    pub fn y(&self) -> &'a [u8] {
        self.y
    }

    pub fn cb(&self) -> &'a [u8] {
        self.cb
    }

    pub fn cr(&self) -> &'a [u8] {
        self.cr
    }

    pub fn y_stride(&self) -> usize {
        self.y_stride
    }

    pub fn c_stride(&self) -> usize {
        self.c_stride
    }

    /// Size of the picture with stride padding removed.
    pub fn packed_len(&self) -> usize {
        self.width * self.height + 2 * self.chroma_width() * self.chroma_height()
    }

    /// Copies the planes into one contiguous I420 buffer.
    pub fn packed(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.packed_len());
        put_plane(&mut out, self.y, self.y_stride, self.width, self.height);
        let (cw, ch) = (self.chroma_width(), self.chroma_height());
        put_plane(&mut out, self.cb, self.c_stride, cw, ch);
        put_plane(&mut out, self.cr, self.c_stride, cw, ch);
        out.freeze()
    }
}

fn put_plane(out: &mut BytesMut, plane: &[u8], stride: usize, width: usize, rows: usize) {
    if width == 0 {
        return;
    }
    for row in plane.chunks(stride).take(rows) {
        out.put_slice(&row[..width]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_strips_stride_padding() {
        // 3x3 luma with stride 4, 2x2 chroma with stride 3
        let y: [u8; 11] = [1, 2, 3, 0, 4, 5, 6, 0, 7, 8, 9];
        let cb: [u8; 5] = [10, 11, 0, 12, 13];
        let cr: [u8; 5] = [20, 21, 0, 22, 23];
        let view = Yuv420::new([&y[..], &cb[..], &cr[..]], 4, 3, 3, 3).unwrap();
        assert_eq!(view.chroma_width(), 2);
        assert_eq!(view.chroma_height(), 2);
        assert_eq!(view.packed_len(), 17);
        assert_eq!(
            &view.packed()[..],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 20, 21, 22, 23]
        );
    }

    #[test]
    fn test_short_plane_is_rejected() {
        let y = [0u8; 15];
        let c = [0u8; 4];
        assert!(Yuv420::new([&y[..], &c[..], &c[..]], 4, 2, 4, 4).is_none());
        // stride narrower than the row
        let y = [0u8; 16];
        assert!(Yuv420::new([&y[..], &c[..], &c[..]], 3, 2, 4, 4).is_none());
        assert!(Yuv420::new([&y[..], &c[..], &c[..]], 4, 2, 4, 4).is_some());
    }

    #[test]
    fn test_from_frame_requires_planar_420() -> anyhow::Result<()> {
        crate::init()?;
        let rgb = frame::Video::new(Pixel::RGB24, 16, 16);
        assert!(Yuv420::from_frame(&rgb).is_none());

        let mut yuv = frame::Video::new(Pixel::YUV420P, 16, 16);
        yuv.data_mut(0).fill(0x80);
        let view = Yuv420::from_frame(&yuv).unwrap();
        assert_eq!((view.width(), view.height()), (16, 16));
        assert_eq!(view.packed_len(), 16 * 16 * 3 / 2);
        assert!(view.packed()[..256].iter().all(|&b| b == 0x80));
        Ok(())
    }

    #[test]
    fn test_picture_info_display() {
        let info = PictureInfo {
            index: 3,
            width: 64,
            height: 48,
            format: "YUV420P".to_string(),
            kind: "I".to_string(),
            is_key: true,
            pts: None,
        };
        assert_eq!(
            info.to_string(),
            "Picture index: 3, width: 64, height: 48, format: YUV420P, kind: I, is_key: true, pts: none"
        );
    }
}
