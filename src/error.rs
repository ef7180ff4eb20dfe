//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各模块各自定义细粒度错误（`ImageError`、`MaskError`、`SegmentationError`、`ColorError`），
//! 在会话层与二进制入口汇聚为 `AppError`，调用方只需处理一种错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，子模块错误通过 `#[from]` 自动转换。
//! - 实现 `Serialize` 将错误序列化为字符串，便于前端直接展示。

use serde::Serialize;

use crate::color::ColorError;
use crate::mask::MaskError;
use crate::photo::ImageError;
use crate::segmentation::SegmentationError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 照片加载流水线错误（类型校验 / 解码 / 资源限制）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 掩码尺寸或画笔参数错误
    #[error("{0}")]
    Mask(#[from] MaskError),

    #[error("{0}")]
    Segmentation(#[from] SegmentationError),

    #[error("{0}")]
    Color(#[from] ColorError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件无法解析或取值越界
    #[error("配置错误: {0}")]
    Config(String),

    /// 当前没有已上传的照片
    #[error("尚未上传照片")]
    NoPhoto,

    /// 会话状态锁已中毒
    #[error("会话状态不可用: {0}")]
    Session(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_errors_convert_and_serialize_as_message() {
        let err: AppError = ImageError::NotAnImage("text/plain".to_string()).into();
        let json = serde_json::to_string(&err).expect("serialize");
        assert_eq!(json, format!("\"{}\"", err));
        assert!(matches!(err, AppError::Image(_)));

        let err: AppError = ColorError::InvalidHex("zz".to_string()).into();
        assert!(err.to_string().contains("zz"));
    }
}
