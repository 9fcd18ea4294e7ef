//! # 物理笔记点评：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        前端 / CLI（上传三张图片 + 选择意图）             │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ UploadedImages (data URL)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ submission ── 三张图片并发规范化（try_join!）        │
//! │  │   └─ image_normalizer                                 │
//! │  │       ├─ loader       载荷上限 + 签名校验             │
//! │  │       ├─ orientation  JPEG/EXIF 方向码                │
//! │  │       ├─ geometry     尺寸 + 变换（纯函数）           │
//! │  │       └─ pipeline     解码 · 重绘 · JPEG 编码         │
//! │  │                                                       │
//! │  ├─ intent ────── 六种意图 → 提示词模板                  │
//! │  ├─ analysis ──── 请求体组装 · 模型响应校验              │
//! │  └─ error ─────── AppError (统一错误类型)                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有对外入口的返回类型 |
//! | [`image_normalizer`] | 按 EXIF 方向摆正、限制长边 2048 并重新编码为 JPEG |
//! | [`submission`] | 图片角色、上传集合、并发规范化 |
//! | [`intent`] | 意图枚举与提示词拼接 |
//! | [`analysis`] | 推理请求体与结构化响应解析 |

pub mod analysis;
pub mod error;
pub mod image_normalizer;
pub mod intent;
pub mod submission;
