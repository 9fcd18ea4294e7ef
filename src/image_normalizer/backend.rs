//! # 外部协作接口
//!
//! 解码与绘制/编码是规范化链路中仅有的两个有副作用的步骤，抽象为 trait，
//! 便于在测试中替换为可控实现（如永不完成的解码器、计数的渲染器）。
//!
//! 两者都在阻塞线程池中调用，因此要求 `Send + Sync`。

use image::DynamicImage;

use super::geometry::RenderPlan;
use super::source::EncodedImage;
use super::{ImageError, NormalizerConfig};

/// 图片解码原语：编码字节 → 像素。
pub trait ImageDecoder: Send + Sync {
    fn decode(
        &self,
        image: &EncodedImage,
        config: &NormalizerConfig,
    ) -> Result<DynamicImage, ImageError>;
}

/// 绘制与编码原语：在新画布上按 `plan` 的变换重绘源图并编码为 JPEG。
pub trait SurfaceRenderer: Send + Sync {
    fn render(
        &self,
        source: &DynamicImage,
        plan: &RenderPlan,
        config: &NormalizerConfig,
    ) -> Result<Vec<u8>, ImageError>;
}
