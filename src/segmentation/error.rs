#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("模型下载失败: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("模型推理失败: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("模型配置无效: {0}")]
    ModelConfig(String),

    #[error("概率图尺寸错误: 期望 {expected} 个值，实际 {actual}")]
    InvalidProbabilityMap { expected: usize, actual: usize },

    #[error("分割配置无效: {0}")]
    InvalidConfig(String),

    #[error("分割任务异常退出: {0}")]
    Worker(String),

    #[error("读取模型文件失败: {0}")]
    Io(#[from] std::io::Error),
}
