//! # 数据源与中间模型
//!
//! 将“外部输入”和“流水线结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `EncodedImage` 表示已加载但未解码的字节
//! - `NormalizedImage` 表示规范化后的 JPEG 结果

use base64::{Engine as _, engine::general_purpose};

/// 规范化输出的固定 MIME 类型。
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Data URL（`data:image/...;base64,...`）或纯 Base64 字符串。
    Base64(String),
    /// 已在内存中的原始字节。
    Bytes(Vec<u8>),
}

/// 加载阶段输出：原始字节与声明的 MIME 类型。
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) mime_type: String,
}

impl EncodedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// 规范化阶段输出：已纠正方向、已限制尺寸的 JPEG。
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl NormalizedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mime_type(&self) -> &'static str {
        OUTPUT_MIME_TYPE
    }

    /// 仅 Base64 正文，不带 `data:` 前缀。
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", OUTPUT_MIME_TYPE, self.to_base64())
    }
}
