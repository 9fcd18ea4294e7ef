//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageNormalizer` 只负责流程编排与配置管理。处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节并校验
//! 3. 扫描方向元数据（同步，不会失败）
//! 4. 在阻塞线程池中解码，受超时保护
//! 5. 计算绘制计划（纯计算）
//! 6. 在阻塞线程池中重绘并编码
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<NormalizerConfig>>` 支持运行时调整。
//! - 单次请求内使用同一配置快照，避免处理中途配置漂移；锁不会跨越任何 await。
//! - 解码超时后直接返回，绘制画布不会被创建。
//! - 记录 `load/decode/render/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::{DynamicImage, GenericImageView};

use super::backend::{ImageDecoder, SurfaceRenderer};
use super::geometry::{self, Dimensions, QuarterTurn, RenderPlan};
use super::orientation::{self, OrientationCode};
use super::pipeline::{ImageCrateDecoder, RasterRenderer};
use super::source::{EncodedImage, ImageSource, NormalizedImage};
use super::{ImageError, NormalizerConfig};

/// 图片规范化器。
///
/// 持有配置状态与解码/绘制后端，可在多个并发请求间共享（`&self` 即可调用）。
pub struct ImageNormalizer {
    pub(super) config: Arc<RwLock<NormalizerConfig>>,
    decoder: Arc<dyn ImageDecoder>,
    renderer: Arc<dyn SurfaceRenderer>,
}

impl ImageNormalizer {
    /// 使用默认后端（`image` 解码 + 栅格重绘）创建规范化器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use physics_note_check::image_normalizer::{ImageNormalizer, NormalizerConfig};
    ///
    /// let normalizer = ImageNormalizer::new(NormalizerConfig::default())?;
    /// # Ok::<(), physics_note_check::image_normalizer::ImageError>(())
    /// ```
    pub fn new(config: NormalizerConfig) -> Result<Self, ImageError> {
        Self::with_backends(config, Arc::new(ImageCrateDecoder), Arc::new(RasterRenderer))
    }

    /// 注入自定义解码 / 绘制后端。
    pub fn with_backends(
        config: NormalizerConfig,
        decoder: Arc<dyn ImageDecoder>,
        renderer: Arc<dyn SurfaceRenderer>,
    ) -> Result<Self, ImageError> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            decoder,
            renderer,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<NormalizerConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置，先校验再生效。
    pub fn set_config(&self, next: NormalizerConfig) -> Result<(), ImageError> {
        next.validate()?;

        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已更新规范化配置（max_dim={}, quality={}, timeout={}ms, max_payload={}B）",
            next.max_dimension,
            next.jpeg_quality,
            next.decode_timeout_ms,
            next.max_payload_bytes
        );
        *config = next;

        Ok(())
    }

    /// 处理主入口：加载任意来源的图片并规范化。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use physics_note_check::image_normalizer::{ImageNormalizer, ImageSource, NormalizerConfig};
    ///
    /// # async fn demo(data_url: String) -> Result<(), physics_note_check::image_normalizer::ImageError> {
    /// let normalizer = ImageNormalizer::new(NormalizerConfig::default())?;
    /// let normalized = normalizer.normalize(ImageSource::Base64(data_url)).await?;
    /// println!("{}", normalized.to_data_uri());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn normalize(&self, source: ImageSource) -> Result<NormalizedImage, ImageError> {
        let config = self.config_snapshot()?;

        let load_start = Instant::now();
        let encoded = Self::load_source(source, &config)?;
        let load_elapsed = load_start.elapsed();

        let normalized = self.normalize_with_config(encoded, &config).await?;
        log::debug!("📥 加载耗时 {}ms", load_elapsed.as_millis());

        Ok(normalized)
    }

    /// 仅执行加载与校验，不解码。
    pub fn load(&self, source: ImageSource) -> Result<EncodedImage, ImageError> {
        let config = self.config_snapshot()?;
        Self::load_source(source, &config)
    }

    /// 规范化已加载的字节。
    pub async fn normalize_encoded(&self, encoded: EncodedImage) -> Result<NormalizedImage, ImageError> {
        let config = self.config_snapshot()?;
        self.normalize_with_config(encoded, &config).await
    }

    async fn normalize_with_config(
        &self,
        encoded: EncodedImage,
        config: &NormalizerConfig,
    ) -> Result<NormalizedImage, ImageError> {
        let total_start = Instant::now();
        let orientation = orientation::read_orientation(&encoded.bytes);

        let decode_start = Instant::now();
        let decoded = self.decode_with_timeout(encoded, config).await?;
        let decode_elapsed = decode_start.elapsed();

        let (width, height) = decoded.dimensions();
        let source = Dimensions::new(width, height)
            .map_err(|_| ImageError::InvalidInput(format!("图片尺寸无效（{}x{}）", width, height)))?;
        let plan = geometry::normalize(source, orientation, config.max_dimension)?;
        log::debug!(
            "🧭 方向 {} → 旋转 {}°，镜像 {:?}，输出宽高比 {:.3}",
            plan.transform.orientation().value(),
            plan.transform.rotation().map_or(0, QuarterTurn::degrees),
            plan.transform.mirror(),
            plan.output.aspect_ratio()
        );

        let render_start = Instant::now();
        let bytes = self.render_blocking(decoded, plan.clone(), config).await?;
        let render_elapsed = render_start.elapsed();

        log::info!(
            "✅ 图片规范化完成 - 方向: {} 原始尺寸: {} 输出尺寸: {} 输出体积: {}KB decode={}ms render={}ms total={}ms",
            orientation.value(),
            plan.source,
            plan.output,
            bytes.len() / 1024,
            decode_elapsed.as_millis(),
            render_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(NormalizedImage {
            bytes,
            width: plan.output.width,
            height: plan.output.height,
        })
    }

    /// 在阻塞线程池中解码；超过 `decode_timeout` 即返回超时错误。
    ///
    /// 超时后解码线程仍会跑完，但结果被丢弃，不会进入绘制阶段。
    async fn decode_with_timeout(
        &self,
        encoded: EncodedImage,
        config: &NormalizerConfig,
    ) -> Result<DynamicImage, ImageError> {
        let decoder = Arc::clone(&self.decoder);
        let task_config = config.clone();

        let handle =
            tokio::task::spawn_blocking(move || decoder.decode(&encoded, &task_config));

        match tokio::time::timeout(config.decode_timeout(), handle).await {
            Ok(joined) => {
                joined.map_err(|e| ImageError::Decode(format!("解码线程执行失败：{}", e)))?
            }
            Err(_) => {
                log::warn!("⏱️ 图片解码超时（{}ms）", config.decode_timeout_ms);
                Err(ImageError::Timeout(format!(
                    "图片加载超时（{:.1} 秒）",
                    config.decode_timeout_ms as f64 / 1000.0
                )))
            }
        }
    }

    async fn render_blocking(
        &self,
        decoded: DynamicImage,
        plan: RenderPlan,
        config: &NormalizerConfig,
    ) -> Result<Vec<u8>, ImageError> {
        let renderer = Arc::clone(&self.renderer);
        let task_config = config.clone();

        tokio::task::spawn_blocking(move || renderer.render(&decoded, &plan, &task_config))
            .await
            .map_err(|e| ImageError::Render(format!("绘制线程执行失败：{}", e)))?
    }

    /// 只读取方向码，不解码。
    pub fn orientation_of(encoded: &EncodedImage) -> OrientationCode {
        orientation::read_orientation(&encoded.bytes)
    }
}
