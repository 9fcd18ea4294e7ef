//! # 提交聚合模块
//!
//! ## 设计思路
//!
//! 一次提交最多包含三张图片（问题、模范解答、学生笔记），各自独立规范化。
//! 三者并发执行、互不共享可变状态；任意一张失败即整次提交失败，不转发部分结果。
//!
//! ## 实现思路
//!
//! 使用 `tokio::try_join!` 在同一任务内并发推进三个规范化 future：
//! 解码与重绘本身在阻塞线程池中运行，因此三张图片实际并行处理。

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_normalizer::{ImageError, ImageNormalizer, ImageSource, NormalizedImage};

/// 图片在提交中的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageRole {
    Problem,
    Solution,
    StudentWork,
}

impl ImageRole {
    pub const ALL: [ImageRole; 3] = [Self::Problem, Self::Solution, Self::StudentWork];

    /// 与前端字段一致的稳定键名。
    pub fn key(self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::Solution => "solution",
            Self::StudentWork => "studentWork",
        }
    }

    /// 提示词中“提供的资料”一栏使用的说明。
    pub fn material_label(self) -> &'static str {
        match self {
            Self::Problem => "問題文の画像",
            Self::Solution => "模範解答・解説の画像",
            Self::StudentWork => "生徒のノートの画像",
        }
    }
}

impl std::str::FromStr for ImageRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.key().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AppError::InvalidSubmission(format!("未知图片角色：{}", value)))
    }
}

/// 前端上传的原始图片（Data URL）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadedImages {
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub student_work: Option<String>,
}

impl UploadedImages {
    pub fn get(&self, role: ImageRole) -> Option<&str> {
        match role {
            ImageRole::Problem => self.problem.as_deref(),
            ImageRole::Solution => self.solution.as_deref(),
            ImageRole::StudentWork => self.student_work.as_deref(),
        }
    }

    pub fn set(&mut self, role: ImageRole, data: String) {
        let slot = match role {
            ImageRole::Problem => &mut self.problem,
            ImageRole::Solution => &mut self.solution,
            ImageRole::StudentWork => &mut self.student_work,
        };
        *slot = Some(data);
    }

    /// 已提供的角色，按固定顺序排列。
    pub fn roles(&self) -> Vec<ImageRole> {
        ImageRole::ALL
            .into_iter()
            .filter(|role| self.get(*role).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roles().is_empty()
    }
}

/// 一次提交中全部规范化完成的图片。
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    images: Vec<(ImageRole, NormalizedImage)>,
}

impl NormalizedSet {
    pub fn get(&self, role: ImageRole) -> Option<&NormalizedImage> {
        self.images
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, image)| image)
    }

    pub fn roles(&self) -> Vec<ImageRole> {
        self.images.iter().map(|(role, _)| *role).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageRole, &NormalizedImage)> {
        self.images.iter().map(|(role, image)| (*role, image))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// 并发规范化一次提交中的所有图片。
///
/// 没有任何图片时返回 `InvalidSubmission`；任意一张失败则整体失败。
pub async fn normalize_all(
    normalizer: &ImageNormalizer,
    uploads: UploadedImages,
) -> Result<NormalizedSet, AppError> {
    if uploads.is_empty() {
        return Err(AppError::InvalidSubmission("至少需要一张图片".to_string()));
    }

    let UploadedImages {
        problem,
        solution,
        student_work,
    } = uploads;

    let (problem, solution, student_work) = tokio::try_join!(
        normalize_role(normalizer, ImageRole::Problem, problem),
        normalize_role(normalizer, ImageRole::Solution, solution),
        normalize_role(normalizer, ImageRole::StudentWork, student_work),
    )?;

    let images: Vec<(ImageRole, NormalizedImage)> =
        [problem, solution, student_work].into_iter().flatten().collect();

    log::info!(
        "📦 提交图片规范化完成 - {} 张（{}）",
        images.len(),
        images
            .iter()
            .map(|(role, image)| format!("{}={}x{}", role.key(), image.width(), image.height()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(NormalizedSet { images })
}

async fn normalize_role(
    normalizer: &ImageNormalizer,
    role: ImageRole,
    data: Option<String>,
) -> Result<Option<(ImageRole, NormalizedImage)>, ImageError> {
    let Some(data) = data else {
        return Ok(None);
    };

    match normalizer.normalize(ImageSource::Base64(data)).await {
        Ok(image) => Ok(Some((role, image))),
        Err(err) => {
            log::warn!("❌ {} 图片规范化失败 [{}]: {}", role.key(), err.code(), err);
            Err(err)
        }
    }
}
