//! # 手动掩码编辑器
//!
//! ## 设计思路
//!
//! 维护一张与照片同尺寸的离屏掩码，画笔在上面盖“实心圆”：
//! - 绘制模式写入不透明白色（alpha = 255）
//! - 擦除模式把圆内像素恢复为全透明，使“先画后擦”回到绘制前的 alpha
//! - 清空把整张掩码重置为全透明
//!
//! ## 实现思路
//!
//! 笔画生命周期为 `begin_stroke → stroke_to* → end_stroke`，笔画外的移动会被忽略。
//! 相邻采样点之间按半径一半的间距插值盖章，快速移动也不会留下断点。
//! 圆的覆盖判定以像素中心为准：`(px + 0.5 - cx)² + (py + 0.5 - cy)² <= r²`。

use image::Rgba;
use serde::{Deserialize, Serialize};

use super::buffer::{INCLUDE, TRANSPARENT};
use super::{MaskBuffer, MaskError};

/// 画笔模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    #[default]
    Draw,
    Erase,
}

impl BrushMode {
    fn fill(self) -> Rgba<u8> {
        match self {
            Self::Draw => INCLUDE,
            Self::Erase => TRANSPARENT,
        }
    }
}

/// 画笔半径约束。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub min_radius: u32,
    pub max_radius: u32,
    /// 半径调整步长（滑杆刻度）。
    pub radius_step: u32,
    pub default_radius: u32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            min_radius: 5,
            max_radius: 100,
            radius_step: 5,
            default_radius: 30,
        }
    }
}

impl BrushConfig {
    pub fn validate(&self) -> Result<(), MaskError> {
        if self.min_radius == 0 || self.min_radius > self.max_radius || self.radius_step == 0 {
            return Err(MaskError::InvalidBrushConfig(format!(
                "min={} max={} step={}",
                self.min_radius, self.max_radius, self.radius_step
            )));
        }
        if !(self.min_radius..=self.max_radius).contains(&self.default_radius) {
            return Err(MaskError::InvalidBrushConfig(format!(
                "default_radius {} 不在 {}~{} 之间",
                self.default_radius, self.min_radius, self.max_radius
            )));
        }
        Ok(())
    }

    /// 把任意半径吸附到合法刻度上。
    pub fn snap_radius(&self, radius: u32) -> Result<u32, MaskError> {
        if !(self.min_radius..=self.max_radius).contains(&radius) {
            return Err(MaskError::BrushRadiusOutOfRange {
                radius,
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        let offset = radius - self.min_radius;
        let snapped = self.min_radius + (offset + self.radius_step / 2) / self.radius_step * self.radius_step;
        Ok(snapped.min(self.max_radius))
    }
}

/// 画布在页面上的显示矩形（CSS 像素）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct ManualMaskEditor {
    mask: MaskBuffer,
    config: BrushConfig,
    radius: u32,
    mode: BrushMode,
    last_point: Option<(f32, f32)>,
}

impl ManualMaskEditor {
    pub fn new(width: u32, height: u32, config: BrushConfig) -> Self {
        let radius = config.default_radius;
        Self {
            mask: MaskBuffer::new(width, height),
            config,
            radius,
            mode: BrushMode::Draw,
            last_point: None,
        }
    }

    pub fn mask(&self) -> &MaskBuffer {
        &self.mask
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    pub fn is_drawing(&self) -> bool {
        self.last_point.is_some()
    }

    pub fn set_mode(&mut self, mode: BrushMode) {
        self.mode = mode;
    }

    /// 设置画笔半径，返回吸附后的实际半径。
    pub fn set_radius(&mut self, radius: u32) -> Result<u32, MaskError> {
        self.radius = self.config.snap_radius(radius)?;
        Ok(self.radius)
    }

    /// 在掩码坐标 `(x, y)` 盖一个圆。返回是否有像素被改写。
    pub fn paint_at(&mut self, x: f32, y: f32) -> bool {
        stamp_circle(&mut self.mask, x, y, self.radius as f32, self.mode.fill())
    }

    pub fn begin_stroke(&mut self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        self.last_point = Some((x, y));
        self.paint_at(x, y)
    }

    /// 笔画进行中移动到 `(x, y)`；不在笔画中时忽略。
    ///
    /// 插值前先把线段裁剪到“掩码矩形外扩一个半径”的范围内，
    /// 远在画布外的点不会产生额外的盖章次数。
    pub fn stroke_to(&mut self, x: f32, y: f32) -> bool {
        let Some(last) = self.last_point else {
            return false;
        };
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        self.last_point = Some((x, y));

        let radius = self.radius as f32;
        let Some(((x0, y0), (x1, y1))) = clip_segment(last, (x, y), self.reach_bounds()) else {
            return false;
        };

        let (dx, dy) = (x1 - x0, y1 - y0);
        let distance = (dx * dx + dy * dy).sqrt();
        let spacing = (radius * 0.5).max(1.0);
        let steps = (distance / spacing).ceil().max(1.0) as u32;

        let mut changed = false;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            changed |= self.paint_at(x0 + dx * t, y0 + dy * t);
        }
        changed
    }

    /// 圆心落在此范围外的笔刷碰不到任何像素。
    fn reach_bounds(&self) -> (f32, f32, f32, f32) {
        let radius = self.radius as f32;
        (
            -radius,
            -radius,
            self.mask.width() as f32 + radius,
            self.mask.height() as f32 + radius,
        )
    }

    pub fn end_stroke(&mut self) {
        self.last_point = None;
    }

    /// 重置为全透明。
    pub fn clear(&mut self) {
        self.mask.clear();
        self.last_point = None;
    }

    /// 把显示矩形内的指针位置换算到掩码坐标（画布按比例缩放显示）。
    pub fn map_display_point(&self, client_x: f32, client_y: f32, rect: DisplayRect) -> Option<(f32, f32)> {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return None;
        }
        let scale_x = self.mask.width() as f32 / rect.width;
        let scale_y = self.mask.height() as f32 / rect.height;
        Some(((client_x - rect.left) * scale_x, (client_y - rect.top) * scale_y))
    }
}

/// Liang–Barsky 线段裁剪；线段与矩形不相交时返回 `None`。
fn clip_segment(
    (x0, y0): (f32, f32),
    (x1, y1): (f32, f32),
    (min_x, min_y, max_x, max_y): (f32, f32, f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for (p, q) in [
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some(((x0 + dx * t0, y0 + dy * t0), (x0 + dx * t1, y0 + dy * t1)))
}

/// 以像素中心判定覆盖，写入实心圆。
fn stamp_circle(mask: &mut MaskBuffer, cx: f32, cy: f32, radius: f32, fill: Rgba<u8>) -> bool {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 || radius <= 0.0 || !cx.is_finite() || !cy.is_finite() {
        return false;
    }

    let x_start = (cx - radius).floor().max(0.0) as u32;
    let y_start = (cy - radius).floor().max(0.0) as u32;
    let x_end = (cx + radius).ceil().min(width as f32);
    let y_end = (cy + radius).ceil().min(height as f32);
    if x_end <= 0.0 || y_end <= 0.0 {
        return false;
    }
    let (x_end, y_end) = (x_end as u32, y_end as u32);

    let r2 = radius * radius;
    let pixels = mask.pixels_mut();
    let mut changed = false;

    for py in y_start..y_end {
        let dy = py as f32 + 0.5 - cy;
        for px in x_start..x_end {
            let dx = px as f32 + 0.5 - cx;
            if dx * dx + dy * dy <= r2 {
                let pixel = pixels.get_pixel_mut(px, py);
                if *pixel != fill {
                    *pixel = fill;
                    changed = true;
                }
            }
        }
    }

    changed
}
