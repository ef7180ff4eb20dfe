//! 应用配置。
//!
//! 配置文件为 JSON，各段都可省略，缺省字段取默认值；文件不存在时整体使用默认配置。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::mask::BrushConfig;
use crate::overlay::{DEFAULT_OPACITY, MAX_OPACITY};
use crate::photo::PhotoConfig;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub photo: PhotoConfig,
    pub segmentation: SegmentationConfig,
    pub brush: BrushConfig,
    /// 新照片的初始叠色不透明度（0–100）
    pub default_opacity: u8,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            photo: PhotoConfig::default(),
            segmentation: SegmentationConfig::default(),
            brush: BrushConfig::default(),
            default_opacity: DEFAULT_OPACITY,
        }
    }
}

impl StudioConfig {
    /// 读取配置文件；文件不存在时返回默认配置。
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("⚙️ 配置文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&content)
            .map_err(|e| AppError::Config(format!("解析配置文件失败: {}", e)))?;
        config.validate()?;

        log::info!("⚙️ 已加载配置: {}", path.display());
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.photo
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.segmentation
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.brush
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.default_opacity > MAX_OPACITY {
            return Err(AppError::Config(format!(
                "default_opacity 需在 0~{} 之间，当前 {}",
                MAX_OPACITY, self.default_opacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("shade-style-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = StudioConfig::load_from_path(Path::new("/definitely/not/here.json"))
            .expect("defaults");
        assert_eq!(config.default_opacity, 50);
        assert_eq!(config.brush.default_radius, 30);
    }

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{"brush": {"default_radius": 50}, "segmentation": {"force_cpu": true}}"#)
            .expect("write config");

        let config = StudioConfig::load_from_path(&path).expect("load");
        let _ = fs::remove_file(&path);

        assert_eq!(config.brush.default_radius, 50);
        assert_eq!(config.brush.max_radius, 100);
        assert!(config.segmentation.force_cpu);
        assert_eq!(config.segmentation.max_dimension, 512);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = temp_path("invalid");
        fs::write(&path, r#"{"default_opacity": 150}"#).expect("write config");

        let result = StudioConfig::load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let path = temp_path("malformed");
        fs::write(&path, "{ not json").expect("write config");

        let result = StudioConfig::load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let path = temp_path("save");
        let mut config = StudioConfig::default();
        config.default_opacity = 80;
        config.save_to_path(&path).expect("save");

        let loaded = StudioConfig::load_from_path(&path).expect("load");
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.default_opacity, 80);
    }
}
