//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载照片加载链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 照片加载统一错误类型。
///
/// 该类型会在会话层被上转为 `AppError`，最终映射为前端提示。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// 声明的 MIME 类型或文件签名不是图片（上传被拒绝）。
    #[error("不是图片文件：{0}")]
    NotAnImage(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    /// 稳定错误码，供前端分支处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnImage(_) => "E_NOT_AN_IMAGE",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::FileSystem(_) => "E_FILE_SYSTEM",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }

    /// 是否属于“文件类型不合法”一类，前端需要展示专门提示。
    pub fn is_invalid_file_type(&self) -> bool {
        matches!(self, Self::NotAnImage(_))
    }
}

impl From<ImageError> for String {
    fn from(error: ImageError) -> Self {
        error.to_string()
    }
}
