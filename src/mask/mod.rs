//! # 掩码模块（mask）
//!
//! ## 设计思路
//!
//! 掩码是与照片同尺寸的 RGBA 网格，只有 alpha 通道有意义：
//! - 自动模式：由人体分割结果生成（见 `segmentation`）
//! - 手动模式：由 `ManualMaskEditor` 的画笔绘制
//!
//! 两种来源产出同一种 `MaskBuffer`，合成器不关心掩码从哪里来。

mod buffer;
mod editor;

pub use buffer::{INCLUDE, MaskBuffer, TRANSPARENT};
pub use editor::{BrushConfig, BrushMode, DisplayRect, ManualMaskEditor};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    #[error("掩码尺寸不匹配：期望 {expected:?}，实际 {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("掩码数据长度错误：期望 {expected}，实际 {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("画笔半径 {radius} 超出范围 {min}~{max}")]
    BrushRadiusOutOfRange { radius: u32, min: u32, max: u32 },

    #[error("画笔配置无效：{0}")]
    InvalidBrushConfig(String),
}
