//! # 照片加载模块（photo）
//!
//! ## 设计思路
//!
//! 该模块将“来源识别 → 加载校验 → 解码缩放”按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：编排整条加载流水线
//! - `loader`：负责上传/Base64/文件加载与类型校验
//! - `pipeline`：负责解码、像素限制、工作分辨率降采样与通用缩放
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! StudioSession::upload
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + MIME/签名/体积校验）
//!    └─ pipeline.rs（解码 + 像素限制 + 降采样）
//!    ↓
//! LoadedPhoto（RGBA 画布数据）
//! ```

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use config::{PhotoConfig, PreviewProfile, ResizeFilter};
pub use error::ImageError;
pub use handler::PhotoLoader;
pub use pipeline::{fit_within, resize_rgba};
pub use source::{LoadedPhoto, PhotoSource};

pub(crate) use pipeline::to_rgba;
