//! # 配置模块
//!
//! ## 设计思路
//!
//! 将照片加载阶段所有“可调策略”集中到 `PhotoConfig`，保证运行时行为可观测、可调整、可测试。
//! 预览档位（quality / balanced / speed）作为高层语义，映射到底层的工作分辨率参数。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `PreviewProfile` 负责档位字符串解析与反向输出。
//! - `apply_preview_profile` 将档位转换为具体阈值。
//! - `infer_preview_profile` 用于从当前配置反推档位（给前端展示状态）。

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ImageError;

/// 缩放滤镜（可序列化版本，分别映射到 `image` 与 `fast_image_resize`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Triangle => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Gaussian => fr::FilterType::Mitchell,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 照片加载配置。
///
/// 字段覆盖了读取、解码与工作分辨率三个阶段。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 是否把超大照片降到工作分辨率再进入编辑画布。
    pub adaptive_resize: bool,
    /// 工作分辨率像素上限。
    pub preview_target_pixels: u64,
    /// 工作分辨率宽/高单边最大值。
    pub preview_max_dimension: u32,
    /// 降采样滤镜策略。
    pub resize_filter: ResizeFilter,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            adaptive_resize: true,
            preview_target_pixels: 5_000_000,
            preview_max_dimension: 2560,
            resize_filter: ResizeFilter::Triangle,
        }
    }
}

/// 预览档位（面向产品/用户语义）。
///
/// - `Quality`：按原始分辨率编辑
/// - `Balanced`：质量与交互帧率平衡
/// - `Speed`：优先交互帧率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewProfile {
    Quality,
    Balanced,
    Speed,
}

impl PreviewProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use shade_style::photo::PreviewProfile;
    ///
    /// let p = PreviewProfile::parse("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), shade_style::photo::ImageError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知预览档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl PhotoConfig {
    /// 基于当前参数反推预览档位。
    pub(crate) fn infer_preview_profile(&self) -> PreviewProfile {
        if !self.adaptive_resize
            && self.preview_max_dimension >= 8192
            && self.preview_target_pixels >= self.max_decoded_pixels
        {
            return PreviewProfile::Quality;
        }

        if self.preview_target_pixels <= 2_000_000 || self.preview_max_dimension <= 1920 {
            return PreviewProfile::Speed;
        }

        PreviewProfile::Balanced
    }

    /// 应用指定预览档位到实际参数。
    pub(crate) fn apply_preview_profile(&mut self, profile: PreviewProfile) {
        match profile {
            PreviewProfile::Quality => {
                self.adaptive_resize = false;
                self.preview_target_pixels = self.max_decoded_pixels;
                self.preview_max_dimension = 8192;
                self.resize_filter = ResizeFilter::CatmullRom;
            }
            PreviewProfile::Balanced => {
                self.adaptive_resize = true;
                self.preview_target_pixels = 5_000_000;
                self.preview_max_dimension = 2560;
                self.resize_filter = ResizeFilter::Triangle;
            }
            PreviewProfile::Speed => {
                self.adaptive_resize = true;
                self.preview_target_pixels = 2_000_000;
                self.preview_max_dimension = 1920;
                self.resize_filter = ResizeFilter::Nearest;
            }
        }
    }

    /// 校验配置取值范围。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::InvalidFormat("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(ImageError::InvalidFormat("max_decoded_bytes 不能小于 8MB".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ImageError::InvalidFormat("max_decoded_pixels 必须大于 0".to_string()));
        }
        if !(64..=16_384).contains(&self.preview_max_dimension) {
            return Err(ImageError::InvalidFormat(
                "preview_max_dimension 必须在 64~16384 之间".to_string(),
            ));
        }
        if self.preview_target_pixels < 4096 {
            return Err(ImageError::InvalidFormat(
                "preview_target_pixels 不能小于 4096".to_string(),
            ));
        }
        Ok(())
    }
}
