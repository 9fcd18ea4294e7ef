//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有可调参数集中到 `NormalizerConfig`，保证运行时行为可观测、可调整、可测试。
//! 输出格式固定为 JPEG，只有质量、尺寸上限与资源限制可调。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（2048 上限、质量 95、10 秒解码超时）。
//! - `NormalizerConfigOverrides` 用于从外部（CLI / JSON）局部覆盖参数。
//! - `validate` 在配置生效前做范围校验，拒绝明显错误的组合。

use std::time::Duration;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ImageError;

/// 输出图片长边的默认上限（像素）。
pub const MAX_DIMENSION: u32 = 2048;
/// 默认 JPEG 质量（对应 0–1 刻度上的 0.95）。
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
/// 默认解码超时（毫秒）。
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 10_000;
/// 上传层允许的最大原始体积（10 MiB）。
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 图片规范化配置。
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// 输出宽/高单边最大值。
    pub max_dimension: u32,
    /// JPEG 编码质量（1–100）。
    pub jpeg_quality: u8,
    /// 等待解码完成的最长时间（毫秒）。
    pub decode_timeout_ms: u64,
    /// 原始载荷（解码 base64 之后）允许的最大字节数。
    pub max_payload_bytes: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码与绘制阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放滤镜。
    pub resize_filter: FilterType,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            decode_timeout_ms: DEFAULT_DECODE_TIMEOUT_MS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_decoded_pixels: 80_000_000,
            max_decoded_bytes: 320 * 1024 * 1024,
            resize_filter: FilterType::Triangle,
        }
    }
}

/// 外部可覆盖的参数子集。
///
/// 未提供的字段保持原值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizerConfigOverrides {
    pub max_dimension: Option<u32>,
    pub jpeg_quality: Option<u8>,
    pub decode_timeout_ms: Option<u64>,
    pub max_payload_bytes: Option<u64>,
}

impl NormalizerConfig {
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    /// 校验参数范围。
    pub fn validate(&self) -> Result<(), ImageError> {
        if !(16..=16_384).contains(&self.max_dimension) {
            return Err(ImageError::InvalidInput(format!(
                "max_dimension 必须在 16~16384 之间（当前：{}）",
                self.max_dimension
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ImageError::InvalidInput(format!(
                "jpeg_quality 必须在 1~100 之间（当前：{}）",
                self.jpeg_quality
            )));
        }
        if !(1..=120_000).contains(&self.decode_timeout_ms) {
            return Err(ImageError::InvalidInput(format!(
                "decode_timeout_ms 必须在 1~120000 毫秒之间（当前：{}）",
                self.decode_timeout_ms
            )));
        }
        if self.max_payload_bytes == 0 {
            return Err(ImageError::InvalidInput("max_payload_bytes 不能为 0".to_string()));
        }
        if self.max_decoded_bytes < 4 * 1024 * 1024 {
            return Err(ImageError::InvalidInput("max_decoded_bytes 不能小于 4MB".to_string()));
        }

        Ok(())
    }

    /// 应用局部覆盖并返回校验后的新配置。
    pub fn with_overrides(&self, overrides: &NormalizerConfigOverrides) -> Result<Self, ImageError> {
        let mut next = self.clone();

        if let Some(max_dimension) = overrides.max_dimension {
            next.max_dimension = max_dimension;
        }
        if let Some(quality) = overrides.jpeg_quality {
            next.jpeg_quality = quality;
        }
        if let Some(timeout) = overrides.decode_timeout_ms {
            next.decode_timeout_ms = timeout;
        }
        if let Some(max_payload) = overrides.max_payload_bytes {
            next.max_payload_bytes = max_payload;
        }

        next.validate()?;
        Ok(next)
    }
}
