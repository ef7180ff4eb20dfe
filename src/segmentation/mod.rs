//! # 人体分割模块（segmentation）
//!
//! ## 设计思路
//!
//! 自动掩码只覆盖“身体”而不覆盖头部/面部：
//! 1. 把照片缩小到最长边 ≤ 512（只缩小不放大）
//! 2. 交给预训练分割模型，得到每个像素属于 "person" 的概率
//! 3. 找到概率 > 阈值的最高一行，从那里往下排除人体高度的 40%
//! 4. 剩余的人体像素 alpha = round(p × 255)，其余全透明
//! 5. 回采样到原图尺寸，保证掩码与照片尺寸一致
//!
//! ## 实现思路
//!
//! - `Segmenter` trait 是与模型之间的接缝，默认实现为 candle 上的 SegFormer（见 `segformer`），
//!   测试中用桩实现替换。
//! - 任何失败（下载、推理、无 person 标签、无人体像素）都退化为 `None`，只记日志，不重试。

mod config;
mod error;
mod segformer;

use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;

use crate::mask::MaskBuffer;
use crate::photo::{ResizeFilter, fit_within, resize_rgba};

pub use config::{DEFAULT_MODEL_ID, SegmentationConfig};
pub use error::SegmentationError;
pub use segformer::SegformerSegmenter;

/// 模型输出：与输入图同尺寸的 person 概率图（行优先）。
#[derive(Debug, Clone, PartialEq)]
pub struct PersonProbabilities {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl PersonProbabilities {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, SegmentationError> {
        let expected = (width as usize) * (height as usize);
        if values.len() != expected {
            return Err(SegmentationError::InvalidProbabilityMap {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// 分割模型接缝。
///
/// 返回 `Ok(None)` 表示模型没有 "person" 类别。
pub trait Segmenter: Send + Sync {
    fn person_probabilities(
        &self,
        image: &RgbaImage,
    ) -> Result<Option<PersonProbabilities>, SegmentationError>;
}

/// 由 person 概率图生成“去头”的身体掩码。没有任何像素超过阈值时返回 `None`。
pub fn body_mask_from_person_probabilities(
    probabilities: &PersonProbabilities,
    threshold: f32,
    head_exclusion: f32,
) -> Option<MaskBuffer> {
    let width = probabilities.width as usize;
    let height = probabilities.height;
    if width == 0 || height == 0 {
        return None;
    }

    let top = probabilities
        .values
        .chunks_exact(width)
        .position(|row| row.iter().any(|&p| p > threshold))? as u32;

    let person_height = height - top;
    let cutoff = top + (person_height as f32 * head_exclusion).floor() as u32;
    log::debug!("🧍 人体起始行 y={}，头部截止行 y={}", top, cutoff);

    let alpha: Vec<u8> = probabilities
        .values
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let y = (i / width) as u32;
            if y > cutoff && p > threshold {
                (p.clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                0
            }
        })
        .collect();

    MaskBuffer::from_alpha(probabilities.width, height, &alpha).ok()
}

/// 分割适配器：缩放、调用模型、后处理、回采样。
#[derive(Clone)]
pub struct SegmentationAdapter {
    config: SegmentationConfig,
    segmenter: Arc<dyn Segmenter>,
}

impl SegmentationAdapter {
    pub fn new(config: SegmentationConfig, segmenter: Arc<dyn Segmenter>) -> Self {
        Self { config, segmenter }
    }

    /// 使用默认的 SegFormer 后端。模型在首次推理时才下载加载。
    pub fn with_segformer(config: SegmentationConfig) -> Self {
        let segmenter = Arc::new(SegformerSegmenter::new(config.clone()));
        Self::new(config, segmenter)
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// 生成与 `image` 同尺寸的身体掩码；失败或未检测到人体时返回 `None`。
    pub fn detect_body_mask(&self, image: &RgbaImage) -> Option<MaskBuffer> {
        match self.try_detect_body_mask(image) {
            Ok(Some(mask)) => Some(mask),
            Ok(None) => {
                log::info!("🔍 未检测到人体区域");
                None
            }
            Err(e) => {
                log::error!("❌ 人体分割失败: {}", e);
                None
            }
        }
    }

    fn try_detect_body_mask(
        &self,
        image: &RgbaImage,
    ) -> Result<Option<MaskBuffer>, SegmentationError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let start = Instant::now();
        let (input_w, input_h) = fit_within(width, height, self.config.max_dimension);
        let input = resize_rgba(image, input_w, input_h, ResizeFilter::Triangle);

        let Some(probabilities) = self.segmenter.person_probabilities(&input)? else {
            log::warn!("⚠️ 模型没有 person 类别");
            return Ok(None);
        };
        let infer_ms = start.elapsed().as_millis();

        if probabilities.dimensions() != (input_w, input_h) {
            return Err(SegmentationError::InvalidProbabilityMap {
                expected: (input_w as usize) * (input_h as usize),
                actual: probabilities.values.len(),
            });
        }

        let Some(mask) = body_mask_from_person_probabilities(
            &probabilities,
            self.config.confidence_threshold,
            self.config.head_exclusion,
        ) else {
            return Ok(None);
        };

        let mask = if mask.dimensions() == (width, height) {
            mask
        } else {
            mask.resized(width, height)
        };

        log::info!(
            "✅ 人体掩码完成 - 推理输入 {}x{}, 覆盖 {} 像素, 推理 {}ms, 总耗时 {}ms",
            input_w,
            input_h,
            mask.coverage(),
            infer_ms,
            start.elapsed().as_millis()
        );
        Ok(Some(mask))
    }
}
