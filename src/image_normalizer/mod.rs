//! # 图片规范化模块（image_normalizer）
//!
//! ## 设计思路
//!
//! 将“来源加载 → 方向读取 → 解码 → 几何计算 → 重绘编码”按职责拆分为多个子模块，
//! 纯计算（方向解析、尺寸与变换）与有副作用的栅格操作严格分离。
//!
//! - `loader`：Data URL / Base64 / 字节加载与安全校验
//! - `orientation` + `byte_cursor`：JPEG 段扫描与 EXIF 方向读取
//! - `geometry`：输出尺寸与绘制变换（纯函数）
//! - `backend`：解码 / 绘制协作接口
//! - `pipeline`：默认解码器与栅格渲染器
//! - `handler`：统一编排 + 超时 + 阶段耗时日志
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! ImageSource（data URL / 字节）
//!    ↓
//! loader.rs（体积上限 + 签名校验）→ EncodedImage
//!    ↓
//! orientation.rs（方向码 1–8，失败回退 1）
//!    ↓
//! handler.rs ── spawn_blocking + timeout ──> backend::ImageDecoder
//!    ↓
//! geometry.rs（交换 / 缩放 / 变换序列）→ RenderPlan
//!    ↓
//! handler.rs ── spawn_blocking ──> backend::SurfaceRenderer
//!    ↓
//! NormalizedImage（JPEG，质量 95，长边 ≤ 2048）
//! ```

mod backend;
mod byte_cursor;
mod config;
mod error;
mod geometry;
mod handler;
mod loader;
mod orientation;
mod pipeline;
mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{ImageDecoder, SurfaceRenderer};
pub use config::{
    NormalizerConfig, NormalizerConfigOverrides, DEFAULT_DECODE_TIMEOUT_MS, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_PAYLOAD_BYTES, MAX_DIMENSION,
};
pub use error::ImageError;
pub use geometry::{
    normalize, Affine, Dimensions, DrawOp, MirrorAxis, QuarterTurn, RenderPlan, TransformPlan,
};
pub use handler::ImageNormalizer;
pub use orientation::{read_orientation, read_orientation_raw, OrientationCode};
pub use pipeline::{ImageCrateDecoder, RasterRenderer};
pub use source::{EncodedImage, ImageSource, NormalizedImage, OUTPUT_MIME_TYPE};
