//! # 掩码缓冲
//!
//! 与照片同尺寸的 RGBA 网格，alpha 通道表示“包含强度”（0–255）。
//! 自动掩码只写 alpha（RGB 为 0），手动画笔写不透明白色。
//! 合成器只读取 alpha。

use image::{Rgba, RgbaImage};

use super::MaskError;
use crate::photo::{ResizeFilter, resize_rgba};

/// 完全包含。
pub const INCLUDE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// 完全透明（不包含）。
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBuffer {
    pixels: RgbaImage,
}

impl MaskBuffer {
    /// 创建全透明掩码。
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    /// 从 RGBA 网格构造。
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// 从逐像素 alpha 值构造（行优先，长度必须为 `width * height`）。
    pub fn from_alpha(width: u32, height: u32, alpha: &[u8]) -> Result<Self, MaskError> {
        let expected = (width as usize) * (height as usize);
        if alpha.len() != expected {
            return Err(MaskError::InvalidLength {
                expected,
                actual: alpha.len(),
            });
        }

        let mut raw = vec![0u8; expected * 4];
        for (dst, &a) in raw.chunks_exact_mut(4).zip(alpha) {
            dst[3] = a;
        }

        let pixels = RgbaImage::from_raw(width, height, raw).ok_or(MaskError::InvalidLength {
            expected,
            actual: alpha.len(),
        })?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// 某像素的包含强度；越界返回 0。
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width() || y >= self.height() {
            return 0;
        }
        self.pixels.get_pixel(x, y)[3]
    }

    /// 行优先遍历所有像素的 alpha。
    pub fn alpha_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels.as_raw().chunks_exact(4).map(|px| px[3])
    }

    /// alpha 大于 0 的像素数量。
    pub fn coverage(&self) -> usize {
        self.alpha_values().filter(|&a| a > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.alpha_values().all(|a| a == 0)
    }

    /// 重置为全透明。
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = TRANSPARENT;
        }
    }

    /// 校验与目标画布尺寸一致。
    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<(), MaskError> {
        if self.dimensions() != (width, height) {
            return Err(MaskError::DimensionMismatch {
                expected: (width, height),
                actual: self.dimensions(),
            });
        }
        Ok(())
    }

    /// 回采样到指定尺寸（分割结果回到原图尺寸时使用）。
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            pixels: resize_rgba(&self.pixels, width, height, ResizeFilter::Triangle),
        }
    }
}
