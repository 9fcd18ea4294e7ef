//! 集成测试共用的合成图片构造工具。
#![allow(dead_code)]

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};

pub const RED: Rgb<u8> = Rgb([230, 20, 20]);
pub const BLUE: Rgb<u8> = Rgb([20, 20, 230]);

/// 左半红、右半蓝的图片。
pub fn split_image(width: u32, height: u32) -> DynamicImage {
    let img = ImageBuffer::from_fn(width, height, |x, _| if x < width / 2 { RED } else { BLUE });
    DynamicImage::ImageRgb8(img)
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).expect("failed to encode test image");
    cursor.into_inner()
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

pub fn png_data_url(width: u32, height: u32) -> String {
    let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 120, 200, 255]));
    data_url("image/png", &encode(&DynamicImage::ImageRgba8(img), ImageFormat::Png))
}

/// 在 SOI 之后插入只含方向条目的小端 APP1/Exif 段。
pub fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a jpeg");

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"II");
    payload.extend_from_slice(&42u16.to_le_bytes());
    payload.extend_from_slice(&8u32.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&0x0112u16.to_le_bytes());
    payload.extend_from_slice(&3u16.to_le_bytes());
    payload.extend_from_slice(&1u32.to_le_bytes());
    payload.extend_from_slice(&orientation.to_le_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&0u32.to_le_bytes());

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&0xFFE1u16.to_be_bytes());
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// 红色通道明显占优。
pub fn is_reddish(pixel: Rgb<u8>) -> bool {
    pixel[0] > 150 && pixel[2] < 100
}

/// 蓝色通道明显占优。
pub fn is_bluish(pixel: Rgb<u8>) -> bool {
    pixel[2] > 150 && pixel[0] < 100
}
