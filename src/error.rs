//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，在提交、提示词组装、响应解析等边界上统一返回。
//! 图片规范化错误通过 `From` 自动上转，无需手动 map。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 实现 `Serialize` 将错误序列化为字符串，方便前端直接展示。

use serde::Serialize;

use crate::image_normalizer::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 解码 / 重绘）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 提交内容不完整（未选择意图、没有任何图片等）
    #[error("提交内容无效: {0}")]
    InvalidSubmission(String),

    /// 模型返回内容无法解析或字段缺失
    #[error("模型响应格式异常: {0}")]
    InvalidResponse(String),

    /// JSON 序列化 / 反序列化失败
    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
