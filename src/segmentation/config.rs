use serde::{Deserialize, Serialize};

use super::SegmentationError;

/// ADE20K 上微调的 SegFormer-B0，类别中包含 "person"。
pub const DEFAULT_MODEL_ID: &str = "nvidia/segformer-b0-finetuned-ade-512-512";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Hugging Face 模型仓库 ID（需包含 `model.safetensors` 与 `config.json`）
    pub model_id: String,
    /// 送入模型前的最长边上限，只缩小不放大
    pub max_dimension: u32,
    /// 人体像素置信度阈值（严格大于）
    pub confidence_threshold: f32,
    /// 从人体最高点起排除的高度比例（头部/面部）
    pub head_exclusion: f32,
    /// 强制使用 CPU
    pub force_cpu: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_dimension: 512,
            confidence_threshold: 0.3,
            head_exclusion: 0.40,
            force_cpu: false,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), SegmentationError> {
        if self.model_id.trim().is_empty() {
            return Err(SegmentationError::InvalidConfig("model_id 不能为空".to_string()));
        }
        if !(32..=2048).contains(&self.max_dimension) {
            return Err(SegmentationError::InvalidConfig(format!(
                "max_dimension 需在 32~2048 之间，当前 {}",
                self.max_dimension
            )));
        }
        if !(0.0..1.0).contains(&self.confidence_threshold) {
            return Err(SegmentationError::InvalidConfig(format!(
                "confidence_threshold 需在 [0, 1) 之间，当前 {}",
                self.confidence_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.head_exclusion) {
            return Err(SegmentationError::InvalidConfig(format!(
                "head_exclusion 需在 [0, 1) 之间，当前 {}",
                self.head_exclusion
            )));
        }
        Ok(())
    }
}
