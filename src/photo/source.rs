//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `PhotoSource` 表示外部来源语义（拖放/选择文件、本地路径、Base64）
//! - `RawPhotoData` 表示已加载但未解码的字节
//! - `LoadedPhoto` 表示可直接进入编辑画布的 RGBA 数据，附带在完整解码图上算出的色调

use std::path::PathBuf;

use image::RgbaImage;

use crate::tone::{Tone, analyze_tone};

/// 照片输入来源。
#[derive(Debug, Clone)]
pub enum PhotoSource {
    /// 文件拖放或文件选择器上传：原始字节 + 浏览器声明的 MIME 类型。
    Upload {
        bytes: Vec<u8>,
        mime_type: String,
        file_name: Option<String>,
    },
    /// 本地文件路径来源。
    FilePath(PathBuf),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
}

impl PhotoSource {
    /// 便捷构造：拖放上传。
    pub fn upload(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self::Upload {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: None,
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawPhotoData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码阶段输出：编辑画布持有的 RGBA 像素网格。
#[derive(Debug, Clone)]
pub struct LoadedPhoto {
    image: RgbaImage,
    original_dimensions: (u32, u32),
    tone: Tone,
}

impl LoadedPhoto {
    pub(crate) fn new(image: RgbaImage, original_dimensions: (u32, u32), tone: Tone) -> Self {
        Self {
            image,
            original_dimensions,
            tone,
        }
    }

    /// 直接由像素网格构造（测试与嵌入方使用）。
    pub fn from_rgba(image: RgbaImage) -> Self {
        let dimensions = image.dimensions();
        let tone = analyze_tone(&image);
        Self::new(image, dimensions, tone)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// 色调：在降到工作分辨率之前的完整解码图上计算。
    pub fn tone(&self) -> Tone {
        self.tone
    }

    /// 解码后、降到工作分辨率之前的尺寸。
    pub fn original_dimensions(&self) -> (u32, u32) {
        self.original_dimensions
    }
}
