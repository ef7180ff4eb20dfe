//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `PhotoLoader` 只负责流程编排与配置管理，不关心会话状态。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节（含类型校验）
//! 3. 解码并准备 RGBA 数据
//!
//! ## 实现思路
//!
//! - 配置通过 `RwLock<PhotoConfig>` 支持运行时动态切档。
//! - 单次加载内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `load/decode/total` 阶段耗时，便于性能诊断。

use std::sync::RwLock;
use std::time::Instant;

use super::{ImageError, LoadedPhoto, PhotoConfig, PhotoSource, PreviewProfile};

/// 照片加载器。
pub struct PhotoLoader {
    config: RwLock<PhotoConfig>,
}

impl PhotoLoader {
    /// 根据初始配置创建加载器。
    pub fn new(config: PhotoConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<PhotoConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置预览档位。
    ///
    /// # 示例
    /// ```rust
    /// use shade_style::photo::{PhotoConfig, PhotoLoader, PreviewProfile};
    ///
    /// let loader = PhotoLoader::new(PhotoConfig::default());
    /// loader.set_preview_profile(PreviewProfile::Speed)?;
    /// assert_eq!(loader.preview_profile()?, PreviewProfile::Speed);
    /// # Ok::<(), shade_style::photo::ImageError>(())
    /// ```
    pub fn set_preview_profile(&self, profile: PreviewProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_preview_profile(profile);

        log::info!(
            "⚙️ 已切换预览档位：{:?}（adaptive_resize={}, target_pixels={}, max_dim={}, filter={:?}）",
            profile,
            config.adaptive_resize,
            config.preview_target_pixels,
            config.preview_max_dimension,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn preview_profile(&self) -> Result<PreviewProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_preview_profile())
    }

    /// 处理主入口：从任意来源加载并解码照片。
    pub fn load(&self, source: PhotoSource) -> Result<LoadedPhoto, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = match source {
            PhotoSource::Upload {
                bytes,
                mime_type,
                file_name,
            } => self.load_from_upload(bytes, &mime_type, file_name.as_deref(), &config)?,
            PhotoSource::Base64(data) => self.load_from_base64(&data, &config)?,
            PhotoSource::FilePath(path) => self.load_from_file(&path, &config)?,
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let photo = self.decode_and_prepare(raw, &config)?;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "✅ 照片加载完成 - load={}ms decode={}ms total={}ms",
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(photo)
    }
}
