// 通过公开 API 验证图片规范化的端到端行为
mod common;

use common::{encode, is_bluish, is_reddish, split_image, with_orientation};
use image::ImageFormat;
use physics_note_check::image_normalizer::{
    read_orientation, ImageError, ImageNormalizer, ImageSource, NormalizerConfig, OrientationCode,
};

fn normalizer(max_dimension: u32) -> ImageNormalizer {
    let config = NormalizerConfig {
        max_dimension,
        ..NormalizerConfig::default()
    };
    ImageNormalizer::new(config).expect("normalizer init failed")
}

fn rotated_jpeg(orientation: u16) -> Vec<u8> {
    with_orientation(&encode(&split_image(400, 300), ImageFormat::Jpeg), orientation)
}

#[tokio::test]
async fn rotated_photo_is_upright_and_capped() {
    let jpeg = rotated_jpeg(6);
    assert_eq!(read_orientation(&jpeg), OrientationCode::Rotate90);

    let normalized = normalizer(256)
        .normalize(ImageSource::Bytes(jpeg))
        .await
        .expect("normalize failed");

    assert_eq!((normalized.width(), normalized.height()), (192, 256));
    assert_eq!(normalized.mime_type(), "image/jpeg");

    let decoded = image::load_from_memory(normalized.bytes())
        .expect("output should decode")
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (192, 256));

    // 源图左半（红）在顺时针旋转后位于上半部分。
    assert!(is_reddish(*decoded.get_pixel(96, 40)));
    assert!(is_bluish(*decoded.get_pixel(96, 216)));
}

#[tokio::test]
async fn upright_output_carries_no_orientation() {
    let normalized = normalizer(256)
        .normalize(ImageSource::Bytes(rotated_jpeg(8)))
        .await
        .expect("normalize failed");

    assert_eq!(&normalized.bytes()[..2], &[0xFF, 0xD8]);
    assert_eq!(read_orientation(normalized.bytes()), OrientationCode::Normal);
}

#[tokio::test]
async fn out_of_range_orientation_is_treated_as_upright() {
    let normalized = normalizer(2048)
        .normalize(ImageSource::Bytes(rotated_jpeg(9)))
        .await
        .expect("normalize failed");

    assert_eq!((normalized.width(), normalized.height()), (400, 300));
}

#[tokio::test]
async fn mirrored_photo_keeps_dimensions() {
    let normalized = normalizer(2048)
        .normalize(ImageSource::Bytes(rotated_jpeg(2)))
        .await
        .expect("normalize failed");

    assert_eq!((normalized.width(), normalized.height()), (400, 300));

    let decoded = image::load_from_memory(normalized.bytes())
        .expect("output should decode")
        .to_rgb8();
    assert!(is_bluish(*decoded.get_pixel(40, 150)));
    assert!(is_reddish(*decoded.get_pixel(360, 150)));
}

#[tokio::test]
async fn data_url_input_round_trips_to_data_uri() {
    let url = common::png_data_url(30, 20);
    let normalized = normalizer(2048)
        .normalize(ImageSource::Base64(url))
        .await
        .expect("normalize failed");

    assert!(normalized.to_data_uri().starts_with("data:image/jpeg;base64,"));
    assert_eq!((normalized.width(), normalized.height()), (30, 20));

    let bytes = normalized.into_bytes();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn corrupt_jpeg_fails_in_decode_stage() {
    let mut garbage = vec![0xFF, 0xD8, 0xFF, 0xE0];
    garbage.extend(std::iter::repeat(0u8).take(64));

    let err = normalizer(2048)
        .normalize(ImageSource::Bytes(garbage))
        .await
        .expect_err("garbage must not normalize");

    assert!(matches!(err, ImageError::Decode(_)), "unexpected error: {err}");
    assert_eq!(err.stage(), "decode");
}

#[tokio::test]
async fn non_image_payload_is_rejected_on_load() {
    let err = normalizer(2048)
        .normalize(ImageSource::Bytes(b"just some text".to_vec()))
        .await
        .expect_err("text is not an image");

    assert_eq!(err.stage(), "load");
}
