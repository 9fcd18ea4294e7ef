//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载规范化链路中的所有失败来源，调用侧可按分支匹配。
//! 方向元数据损坏不在此列：读取器内部吞掉并回退为方向 1。
//!
//! `code()` / `stage()` 为每个分支提供稳定标识，供命令层与日志聚合使用。

/// 图片规范化统一错误类型。
///
/// 在应用边界会被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("输入无效：{0}")]
    InvalidInput(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("绘制错误：{0}")]
    Render(String),
}

impl ImageError {
    /// 稳定的机器可读错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidFormat(_) => "invalid_format",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Decode(_) => "decode_failed",
            Self::Timeout(_) => "decode_timeout",
            Self::Render(_) => "render_failed",
        }
    }

    /// 出错所在的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::InvalidFormat(_) | Self::ResourceLimit(_) => "load",
            Self::Decode(_) | Self::Timeout(_) => "decode",
            Self::Render(_) => "render",
        }
    }
}

impl From<ImageError> for String {
    fn from(error: ImageError) -> Self {
        error.to_string()
    }
}
