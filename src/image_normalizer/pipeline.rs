//! # 解码与重绘流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 像素 → 变换重绘 → JPEG”的副作用步骤集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 解码（`ImageCrateDecoder`）：
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素 / 内存上限快速拒绝
//! 3. 完整解码并复核尺寸
//!
//! 重绘（`RasterRenderer`）：
//! 1. 预估画布内存并申请（失败即拒绝，不产出部分结果）
//! 2. 将源图缩放到绘制矩形（未交换的尺寸）
//! 3. 对输出画布的每个像素中心做逆变换，取回源像素
//! 4. 透明像素按黑底合成后以固定质量编码为 JPEG

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageBuffer, Rgba, RgbaImage};
use std::io::Cursor;

use super::backend::{ImageDecoder, SurfaceRenderer};
use super::geometry::{Dimensions, RenderPlan};
use super::source::EncodedImage;
use super::{ImageError, NormalizerConfig};

const RGBA_CHANNELS: usize = 4;
const RGB_CHANNELS: usize = 3;

/// 基于 `image` crate 的默认解码器。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(
        &self,
        image: &EncodedImage,
        config: &NormalizerConfig,
    ) -> Result<DynamicImage, ImageError> {
        let (header_width, header_height) = inspect_dimensions_from_memory(&image.bytes)?;
        validate_pixel_limits(config, header_width, header_height)?;
        validate_decoded_memory_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&image.bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        validate_pixel_limits(config, width, height)?;
        validate_decoded_memory_limits(config, width, height)?;

        log::debug!(
            "🖼️ 解码完成 - 声明类型: {} 尺寸: {}x{}",
            image.mime_type,
            width,
            height
        );

        Ok(decoded)
    }
}

/// 仅通过内存中的图片头信息读取宽高。
///
/// 用于在完整解码前做像素限制检查。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    if reader.format().is_none() {
        return Err(ImageError::InvalidFormat("不支持的图片格式".to_string()));
    }

    reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &NormalizerConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    config: &NormalizerConfig,
    width: u32,
    height: u32,
) -> Result<(), ImageError> {
    let estimated = rgba_len(width, height)
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated as u64 > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(RGBA_CHANNELS))
}

/// 默认渲染器：`fast_image_resize` 缩放 + 逆变换采样 + JPEG 编码。
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterRenderer;

impl SurfaceRenderer for RasterRenderer {
    fn render(
        &self,
        source: &DynamicImage,
        plan: &RenderPlan,
        config: &NormalizerConfig,
    ) -> Result<Vec<u8>, ImageError> {
        let (width, height) = source.dimensions();
        if Dimensions::new(width, height)? != plan.source {
            return Err(ImageError::Render(format!(
                "源图尺寸 {}x{} 与绘制计划 {} 不一致",
                width, height, plan.source
            )));
        }

        let surface = allocate_surface(plan.output, config)?;
        let scaled = scale_to_draw_rect(source, plan.draw, config.resize_filter)?;
        let drawn = draw_through_transform(&scaled, plan, surface)?;

        encode_jpeg(&drawn, config.jpeg_quality)
    }
}

/// 申请输出画布。预估内存超限或分配失败都视为无法获取绘制表面。
fn allocate_surface(output: Dimensions, config: &NormalizerConfig) -> Result<Vec<u8>, ImageError> {
    let len = rgba_len(output.width, output.height)
        .ok_or_else(|| ImageError::Render("画布尺寸导致内存溢出风险".to_string()))?;

    if len as u64 > config.max_decoded_bytes {
        return Err(ImageError::Render(format!(
            "无法获取绘制画布：{} 需要 {:.2} MB（限制：{:.2} MB）",
            output,
            len as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    let mut surface = Vec::new();
    surface
        .try_reserve_exact(len)
        .map_err(|e| ImageError::Render(format!("无法获取绘制画布：{}", e)))?;
    surface.resize(len, 0);
    Ok(surface)
}

fn scale_to_draw_rect(
    source: &DynamicImage,
    draw: Dimensions,
    filter: FilterType,
) -> Result<RgbaImage, ImageError> {
    let (width, height) = source.dimensions();
    if width == draw.width && height == draw.height {
        return Ok(source.to_rgba8());
    }

    log::debug!("🧩 缩放：{}x{} -> {}（filter={:?}）", width, height, draw, filter);

    match resize_with_fast_image_resize(source, draw.width, draw.height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            Ok(source.resize_exact(draw.width, draw.height, filter).to_rgba8())
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ImageError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| ImageError::Render(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Render(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ImageError::Render("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// 在变换后的坐标系中把 `scaled`（绘制矩形大小）画到输出画布上。
///
/// 对每个输出像素中心应用逆矩阵，落在哪个源像素就取哪个源像素。
/// 方向变换只含 90° 倍数旋转与轴镜像，采样是精确的像素置换。
fn draw_through_transform(
    scaled: &RgbaImage,
    plan: &RenderPlan,
    mut surface: Vec<u8>,
) -> Result<RgbaImage, ImageError> {
    let (draw_width, draw_height) = scaled.dimensions();
    if draw_width != plan.draw.width || draw_height != plan.draw.height {
        return Err(ImageError::Render("绘制矩形尺寸与计划不一致".to_string()));
    }

    let inverse = plan
        .transform
        .matrix()
        .inverse()
        .ok_or_else(|| ImageError::Render("变换矩阵不可逆".to_string()))?;

    let output = plan.output;
    let max_x = draw_width as i64 - 1;
    let max_y = draw_height as i64 - 1;
    let src = scaled.as_raw();

    for (index, pixel) in surface.chunks_exact_mut(RGBA_CHANNELS).enumerate() {
        let x = (index % output.width as usize) as f64;
        let y = (index / output.width as usize) as f64;

        let (sx, sy) = inverse.apply(x + 0.5, y + 0.5);
        let sx = (sx.floor() as i64).clamp(0, max_x) as usize;
        let sy = (sy.floor() as i64).clamp(0, max_y) as usize;

        let offset = (sy * draw_width as usize + sx) * RGBA_CHANNELS;
        pixel.copy_from_slice(&src[offset..offset + RGBA_CHANNELS]);
    }

    ImageBuffer::from_raw(output.width, output.height, surface)
        .ok_or_else(|| ImageError::Render("画布缓冲长度异常".to_string()))
}

/// 透明像素按黑底合成（与浏览器画布导出 JPEG 的行为一致），再编码。
fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * RGB_CHANNELS);

    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        rgb.push(((r as u16 * alpha + 127) / 255) as u8);
        rgb.push(((g as u16 * alpha + 127) / 255) as u8);
        rgb.push(((b as u16 * alpha + 127) / 255) as u8);
    }

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality)
        .encode(&rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ImageError::Render(format!("JPEG 编码失败：{}", e)))?;

    Ok(encoded)
}
