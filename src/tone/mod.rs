//! # 色调分析模块（tone）
//!
//! ## 设计思路
//!
//! 用一次“平均像素色”启发式判断照片整体是暖色、冷色还是中性：
//! 每隔 10 个像素采样一次，统计 R/G/B 平均值，
//! `avgR - avgB > 20` 为暖色，`avgB - avgR > 20` 为冷色，其余为中性。
//!
//! 这不是严谨的色彩科学，只是一个确定性的单遍统计；解码失败时一律回退为中性。
//! 每种色调附带一组推荐色板（见 `palette`）。

mod palette;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::photo::to_rgba;

pub use palette::{ColorShade, palette_for};

/// 采样步长（像素）。
pub const SAMPLE_STRIDE: usize = 10;
/// 判定暖/冷色的 R-B 差阈值。
pub const TONE_THRESHOLD: f64 = 20.0;

/// 色调分类，每次上传计算一次，之后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Warm,
    Cool,
    Neutral,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Neutral => "neutral",
        }
    }

    /// 首字母大写的展示名。
    pub fn label(self) -> &'static str {
        match self {
            Self::Warm => "Warm",
            Self::Cool => "Cool",
            Self::Neutral => "Neutral",
        }
    }

    pub fn palette(self) -> &'static [ColorShade] {
        palette_for(self)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 采样得到的 R/G/B 平均值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelAverages {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub samples: usize,
}

impl ChannelAverages {
    pub fn classify(&self) -> Tone {
        let warm_score = self.red - self.blue;
        let cool_score = self.blue - self.red;

        if warm_score > TONE_THRESHOLD {
            Tone::Warm
        } else if cool_score > TONE_THRESHOLD {
            Tone::Cool
        } else {
            Tone::Neutral
        }
    }
}

/// 每隔 `SAMPLE_STRIDE` 个像素采样一次并求平均。空图返回 `None`。
pub fn sample_channel_averages(image: &RgbaImage) -> Option<ChannelAverages> {
    let (mut total_r, mut total_g, mut total_b) = (0u64, 0u64, 0u64);
    let mut samples = 0usize;

    for pixel in image.as_raw().chunks_exact(4).step_by(SAMPLE_STRIDE) {
        total_r += u64::from(pixel[0]);
        total_g += u64::from(pixel[1]);
        total_b += u64::from(pixel[2]);
        samples += 1;
    }

    if samples == 0 {
        return None;
    }

    let count = samples as f64;
    Some(ChannelAverages {
        red: total_r as f64 / count,
        green: total_g as f64 / count,
        blue: total_b as f64 / count,
        samples,
    })
}

/// 对已解码的 RGBA 图像做色调分类。
pub fn analyze_tone(image: &RgbaImage) -> Tone {
    match sample_channel_averages(image) {
        Some(averages) => {
            let tone = averages.classify();
            log::debug!(
                "🎨 色调分析 - avg=({:.1}, {:.1}, {:.1}) samples={} -> {}",
                averages.red,
                averages.green,
                averages.blue,
                averages.samples,
                tone
            );
            tone
        }
        None => Tone::Neutral,
    }
}

/// 直接从编码字节做色调分类，解码失败回退为中性。
pub fn analyze_tone_bytes(bytes: &[u8]) -> Tone {
    match image::load_from_memory(bytes) {
        Ok(decoded) => analyze_tone(&to_rgba(decoded)),
        Err(err) => {
            log::warn!("⚠️ 色调分析解码失败，回退为 neutral：{}", err);
            Tone::Neutral
        }
    }
}
