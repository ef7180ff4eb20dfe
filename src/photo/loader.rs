//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（拖放上传 / Base64 / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 非图片输入必须在这里被拒绝，之后的色调分析与分割都不会被触发。
//!
//! ## 实现思路
//!
//! - 上传：声明 MIME 必须以 `image/` 开头 + 体积校验 + 文件签名校验（只排除明确的非图片）。
//! - Base64：Data URL 的 MIME 校验 + 解码前体积估算 + 签名校验。
//! - 文件：扩展名推断类型 + metadata 体积限制 + 读取 + 签名校验。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::RawPhotoData;
use super::{ImageError, PhotoConfig, PhotoLoader};

impl PhotoLoader {
    /// 从拖放/文件选择器上传的字节加载。
    pub(super) fn load_from_upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: Option<&str>,
        config: &PhotoConfig,
    ) -> Result<RawPhotoData, ImageError> {
        log::info!(
            "📤 收到上传 - 文件: {} 类型: {} 大小: {} bytes",
            file_name.unwrap_or("<unnamed>"),
            mime_type,
            bytes.len()
        );

        if !is_image_mime_type(mime_type) {
            return Err(ImageError::NotAnImage(format!("声明类型为 {}", mime_type)));
        }
        ensure_within_size(bytes.len() as u64, config, "上传文件")?;
        ensure_image_signature(&bytes)?;

        Ok(RawPhotoData {
            bytes,
            source_hint: "upload",
        })
    }

    /// 从 Base64 / Data URL 加载。
    pub(super) fn load_from_base64(
        &self,
        data: &str,
        config: &PhotoConfig,
    ) -> Result<RawPhotoData, ImageError> {
        log::info!("📝 收到 Base64 照片 - 长度: {}", data.len());

        let bytes = Self::parse_base64_with_limit(data, config.max_file_size)?;
        ensure_within_size(bytes.len() as u64, config, "Base64 解码结果")?;
        ensure_image_signature(&bytes)?;

        Ok(RawPhotoData {
            bytes,
            source_hint: "base64",
        })
    }

    /// 从本地路径加载。有扩展名时按扩展名推断类型，推断不出图片格式即拒绝。
    pub(super) fn load_from_file(
        &self,
        path: &Path,
        config: &PhotoConfig,
    ) -> Result<RawPhotoData, ImageError> {
        log::info!("📁 读取本地照片 - 路径: {}", path.display());

        if path.extension().is_some() {
            let format = image::ImageFormat::from_path(path).map_err(|_| {
                ImageError::NotAnImage(format!("扩展名不是图片格式：{}", path.display()))
            })?;
            log::debug!("按扩展名推断类型: {}", format.to_mime_type());
        }

        let metadata = std::fs::metadata(path).map_err(|e| {
            ImageError::FileSystem(format!("无法访问 {}：{}", path.display(), e))
        })?;
        ensure_within_size(metadata.len(), config, "本地文件")?;

        let bytes = std::fs::read(path)
            .map_err(|e| ImageError::FileSystem(format!("读取 {} 失败：{}", path.display(), e)))?;
        ensure_image_signature(&bytes)?;

        Ok(RawPhotoData {
            bytes,
            source_hint: "file",
        })
    }

    /// 解析 Base64（可带 Data URL 头），解码前先按长度估算体积。
    pub(crate) fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, ImageError> {
        let trimmed = data.trim();

        let payload = match trimmed.strip_prefix("data:") {
            Some(rest) => {
                let (mime_type, payload) = rest
                    .split_once(";base64,")
                    .ok_or_else(|| ImageError::InvalidFormat("Data URL 缺少 ;base64, 标记".to_string()))?;
                if !is_image_mime_type(mime_type) {
                    return Err(ImageError::NotAnImage(format!("Data URL 类型为 {}", mime_type)));
                }
                payload
            }
            None => trimmed,
        };

        // 每 4 个字符最多解出 3 个字节
        let estimated = (payload.len() as u64).div_ceil(4).saturating_mul(3);
        if estimated > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码 {} 字节，超过上限 {} 字节",
                estimated, max_file_size
            )));
        }

        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
    }
}

fn ensure_within_size(len: u64, config: &PhotoConfig, what: &str) -> Result<(), ImageError> {
    if len > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "{}过大：{:.2} MB（限制：{:.2} MB）",
            what,
            len as f64 / (1024.0 * 1024.0),
            config.max_file_size as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

/// 按文件头（magic bytes）排除“明确不是图片”的内容。
///
/// 识别不出类型的内容（如 SVG、截断文件）交给解码阶段，失败时报解码错误而非类型错误。
fn ensure_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Image => Err(
            ImageError::NotAnImage(format!("文件内容为 {}", kind.mime_type())),
        ),
        Some(_) => Ok(()),
        None => {
            log::debug!("文件头无法识别，交给解码器判断");
            Ok(())
        }
    }
}

/// 判断 MIME 类型是否为图片（忽略参数与大小写）。
pub(crate) fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type
        .split(';')
        .next()
        .is_some_and(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
}
