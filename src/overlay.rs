//! # 叠色合成（overlay）
//!
//! ## 设计思路
//!
//! 每次渲染：复制原图 → 构造与画布同尺寸的纯色图层 →
//! 图层 alpha = round(掩码 alpha / 255 × 不透明度 / 100 × 255) →
//! 以 source-over 方式合成到原图上。
//!
//! 颜色、不透明度、掩码任一变化都会重新计算，因此这里是交互路径上的热点。
//!
//! ## 实现思路
//!
//! - `composite_into` 复用调用方持有的输出缓冲，避免每帧分配
//! - 像素数超过阈值时按行交给 rayon 并行处理
//! - 图层 alpha 为 0 的像素直接跳过，保证不透明度 0 时与原图逐像素一致

use image::RgbaImage;
use rayon::prelude::*;

use crate::color::HexColor;
use crate::mask::{MaskBuffer, MaskError};

pub const DEFAULT_OPACITY: u8 = 50;
pub const MAX_OPACITY: u8 = 100;

/// 超过该像素数时按行并行合成。
const PARALLEL_THRESHOLD: usize = 256 * 256;

/// 把任意输入钳制到 0..=100。
pub fn clamp_opacity(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_OPACITY)) as u8
}

/// 单像素的图层 alpha（四舍五入）。
pub fn layer_alpha(mask_alpha: u8, opacity: u8) -> u8 {
    let opacity = u32::from(opacity.min(MAX_OPACITY));
    ((u32::from(mask_alpha) * opacity + 50) / 100) as u8
}

/// 合成到新分配的图像。
pub fn composite(
    base: &RgbaImage,
    mask: Option<&MaskBuffer>,
    color: HexColor,
    opacity: u8,
) -> Result<RgbaImage, MaskError> {
    let mut out = RgbaImage::new(base.width(), base.height());
    composite_into(base, mask, color, opacity, &mut out)?;
    Ok(out)
}

/// 合成到调用方提供的缓冲区；尺寸不符时会被重新分配。
///
/// `mask` 为 `None` 时输出等于原图。
pub fn composite_into(
    base: &RgbaImage,
    mask: Option<&MaskBuffer>,
    color: HexColor,
    opacity: u8,
    out: &mut RgbaImage,
) -> Result<(), MaskError> {
    let (width, height) = base.dimensions();
    if let Some(mask) = mask {
        mask.ensure_dimensions(width, height)?;
    }

    if out.dimensions() != (width, height) {
        *out = RgbaImage::new(width, height);
    }
    out.copy_from_slice(base.as_raw());

    let Some(mask) = mask else {
        return Ok(());
    };
    let opacity = opacity.min(MAX_OPACITY);
    if opacity == 0 || width == 0 || height == 0 {
        return Ok(());
    }

    let row_len = width as usize * 4;
    let src = [color.r, color.g, color.b];
    let mask_raw = mask.as_rgba().as_raw();

    let blend_row = |(dst_row, mask_row): (&mut [u8], &[u8])| {
        for (dst, m) in dst_row.chunks_exact_mut(4).zip(mask_row.chunks_exact(4)) {
            let alpha = layer_alpha(m[3], opacity);
            if alpha > 0 {
                blend_source_over(dst, src, alpha);
            }
        }
    };

    if (width as usize) * (height as usize) >= PARALLEL_THRESHOLD {
        out.par_chunks_mut(row_len)
            .zip(mask_raw.par_chunks(row_len))
            .for_each(blend_row);
    } else {
        out.chunks_mut(row_len)
            .zip(mask_raw.chunks(row_len))
            .for_each(blend_row);
    }

    Ok(())
}

/// source-over：`out = src·αs + dst·αd·(1-αs)`，再除以输出 alpha 还原为非预乘。
fn blend_source_over(dst: &mut [u8], src: [u8; 3], src_alpha: u8) {
    if src_alpha == 255 {
        dst[..3].copy_from_slice(&src);
        dst[3] = 255;
        return;
    }

    let sa = f32::from(src_alpha) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }

    for c in 0..3 {
        let blended = (f32::from(src[c]) * sa + f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
