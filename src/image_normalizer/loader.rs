//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理 Data URL / 纯 Base64 / 原始字节三种输入，并在“尽可能早”的阶段执行校验。
//! 目标是尽快失败：体积超限在 base64 解码之前就拒绝，非图片内容在解码像素之前就拒绝。
//!
//! ## 实现思路
//!
//! - Base64：格式解析 + 解码前体积估算 + 解码后体积复核。
//! - 字节：体积限制。
//! - 两者都经过 magic bytes 签名校验（`infer`），并记录声明的 MIME。

use base64::{Engine as _, engine::general_purpose};

use super::source::{EncodedImage, ImageSource};
use super::{ImageError, ImageNormalizer, NormalizerConfig};

const DATA_URL_PREFIX: &str = "data:";
const DATA_URL_BASE64_MARKER: &str = ";base64,";

impl ImageNormalizer {
    /// 按来源加载原始字节。
    pub(super) fn load_source(
        source: ImageSource,
        config: &NormalizerConfig,
    ) -> Result<EncodedImage, ImageError> {
        match source {
            ImageSource::Base64(data) => Self::load_from_base64(&data, config),
            ImageSource::Bytes(bytes) => Self::load_from_bytes(bytes, config),
        }
    }

    /// 从 Data URL 或纯 Base64 字符串加载图片原始字节。
    pub(super) fn load_from_base64(
        data: &str,
        config: &NormalizerConfig,
    ) -> Result<EncodedImage, ImageError> {
        log::debug!("📝 开始处理 base64 图片");

        let (declared_mime, bytes) = Self::parse_base64_with_limit(data, config.max_payload_bytes)?;

        if bytes.len() as u64 > config.max_payload_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_payload_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let sniffed_mime = Self::validate_image_signature(&bytes)?;

        Ok(EncodedImage {
            bytes,
            mime_type: declared_mime.unwrap_or(sniffed_mime).to_string(),
        })
    }

    /// 从内存字节加载。
    pub(super) fn load_from_bytes(
        bytes: Vec<u8>,
        config: &NormalizerConfig,
    ) -> Result<EncodedImage, ImageError> {
        if bytes.len() as u64 > config.max_payload_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_payload_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let mime_type = Self::validate_image_signature(&bytes)?.to_string();
        Ok(EncodedImage { bytes, mime_type })
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 返回 Data URL 中声明的 MIME（若有）与解码后的字节。
    fn parse_base64_with_limit(
        data: &str,
        max_payload_bytes: u64,
    ) -> Result<(Option<&str>, Vec<u8>), ImageError> {
        let normalized = data.trim();
        if normalized.is_empty() {
            return Err(ImageError::InvalidInput("图片数据为空".to_string()));
        }

        let (declared_mime, body) = match normalized.strip_prefix(DATA_URL_PREFIX) {
            Some(rest) => {
                let marker = rest
                    .find(DATA_URL_BASE64_MARKER)
                    .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;
                let mime = &rest[..marker];
                if !mime.starts_with("image/") {
                    return Err(ImageError::InvalidFormat(format!("不是图片类型：{}", mime)));
                }
                (Some(mime), &rest[marker + DATA_URL_BASE64_MARKER.len()..])
            }
            None => (None, normalized),
        };

        if body.is_empty() {
            return Err(ImageError::InvalidInput("Base64 正文为空".to_string()));
        }

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(body)?;
        if estimated_len > max_payload_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_payload_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = general_purpose::STANDARD
            .decode(body)
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))?;

        Ok((declared_mime, bytes))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片，返回识别出的 MIME。
    fn validate_image_signature(bytes: &[u8]) -> Result<&'static str, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::InvalidInput("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::InvalidFormat("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(kind.mime_type())
    }
}
