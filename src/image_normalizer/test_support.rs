//! 单元测试共用的合成图片与 EXIF 构造工具。

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;

#[derive(Debug, Clone, Copy)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, value: u16) -> [u8; 2] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    fn u32(self, value: u32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }
}

/// 每个像素颜色唯一（宽高均小于 256 时），便于逐像素比对变换结果。
pub fn labelled_image(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x * 7 + y * 13) % 256) as u8;
        Rgba([r, g, b, 255])
    });
    DynamicImage::ImageRgba8(img)
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test png");
    cursor.into_inner()
}

pub fn encode_jpeg(image: &DynamicImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .expect("failed to encode test jpeg");
    cursor.into_inner()
}

/// `marker` + 长度 + `payload`。
pub fn segment(marker: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = marker.to_be_bytes().to_vec();
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// 构造 APP1/Exif 段：IFD0 含宽、高两个条目，`orientation` 为 `Some` 时追加方向条目。
///
/// 方向值之后只剩 2 字节填充与 4 字节下一 IFD 偏移。
pub fn exif_app1_segment(endian: Endian, orientation: Option<u16>) -> Vec<u8> {
    let mut entries: Vec<(u16, u16, u32, u32)> = vec![
        (0x0100, 4, 1, 640),
        (0x0101, 4, 1, 480),
    ];
    if let Some(value) = orientation {
        entries.push((0x0112, 3, 1, value as u32));
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(match endian {
        Endian::Little => b"II",
        Endian::Big => b"MM",
    });
    tiff.extend_from_slice(&endian.u16(42));
    tiff.extend_from_slice(&endian.u32(8));
    tiff.extend_from_slice(&endian.u16(entries.len() as u16));

    for (tag, kind, count, value) in entries {
        tiff.extend_from_slice(&endian.u16(tag));
        tiff.extend_from_slice(&endian.u16(kind));
        tiff.extend_from_slice(&endian.u32(count));
        if kind == 3 {
            tiff.extend_from_slice(&endian.u16(value as u16));
            tiff.extend_from_slice(&[0, 0]);
        } else {
            tiff.extend_from_slice(&endian.u32(value));
        }
    }
    tiff.extend_from_slice(&endian.u32(0));

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    segment(0xFFE1, &payload)
}

/// SOI + 段 + EOI。
pub fn jpeg_with_segments(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for seg in segments {
        out.extend_from_slice(seg);
    }
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// 把 Exif 段插入到真实 JPEG 的 SOI 之后。
pub fn with_exif_orientation(jpeg: &[u8], endian: Endian, orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a jpeg");
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&exif_app1_segment(endian, Some(orientation)));
    out.extend_from_slice(&jpeg[2..]);
    out
}
