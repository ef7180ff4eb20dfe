//! SegFormer 分割后端（candle）。
//!
//! 权重与 `config.json` 通过 hf-hub 下载到本地缓存，首次推理时加载一次，
//! 之后在进程生命周期内复用。加载失败不会被缓存，下一次调用会重新尝试加载；
//! 单次推理本身不做重试。

use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::segformer::{Config, SemanticSegmentationModel};
use image::RgbaImage;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::time::Instant;

use super::{PersonProbabilities, SegmentationConfig, SegmentationError, Segmenter};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

struct LoadedModel {
    model: SemanticSegmentationModel,
    device: Device,
    /// `None` 表示模型标签中没有 person。
    person_label: Option<usize>,
}

pub struct SegformerSegmenter {
    config: SegmentationConfig,
    model: OnceCell<LoadedModel>,
}

impl SegformerSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn loaded(&self) -> Result<&LoadedModel, SegmentationError> {
        self.model.get_or_try_init(|| load_model(&self.config))
    }
}

impl Segmenter for SegformerSegmenter {
    fn person_probabilities(
        &self,
        image: &RgbaImage,
    ) -> Result<Option<PersonProbabilities>, SegmentationError> {
        let loaded = self.loaded()?;
        let Some(person) = loaded.person_label else {
            return Ok(None);
        };

        let (width, height) = image.dimensions();
        let input = image_to_tensor(image, &loaded.device)?;

        let logits = loaded.model.forward(&input)?;
        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let person_probs = probs
            .i((.., person..person + 1))?
            .upsample_nearest2d(height as usize, width as usize)?
            .flatten_all()?
            .to_vec1::<f32>()?;

        PersonProbabilities::new(width, height, person_probs).map(Some)
    }
}

fn load_model(config: &SegmentationConfig) -> Result<LoadedModel, SegmentationError> {
    let start = Instant::now();
    log::info!("📦 加载分割模型: {}", config.model_id);

    let repo = hf_hub::api::sync::Api::new()?.model(config.model_id.clone());
    let weights = repo.get("model.safetensors")?;
    let config_file = repo.get("config.json")?;

    let (model_config, labels) = read_model_config(&config_file)?;
    let person_label = find_person_label(&labels);
    let num_labels = labels.len();
    if num_labels == 0 {
        return Err(SegmentationError::ModelConfig("id2label 为空".to_string()));
    }

    let device = device(config.force_cpu)?;
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
    let model = SemanticSegmentationModel::new(&model_config, num_labels, vb)?;

    log::info!(
        "✅ 分割模型已加载 - {} 个类别, person={:?}, 设备={:?}, 耗时 {}ms",
        num_labels,
        person_label,
        device,
        start.elapsed().as_millis()
    );

    Ok(LoadedModel {
        model,
        device,
        person_label,
    })
}

/// 读取 `config.json`，同时取出 `id2label` 映射（按类别下标排序）。
fn read_model_config(path: &Path) -> Result<(Config, Vec<(usize, String)>), SegmentationError> {
    let text = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&text)
        .map_err(|e| SegmentationError::ModelConfig(format!("config.json 解析失败: {}", e)))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| SegmentationError::ModelConfig(format!("config.json 解析失败: {}", e)))?;

    let labels = parse_labels(&raw)?;
    Ok((config, labels))
}

fn parse_labels(raw: &serde_json::Value) -> Result<Vec<(usize, String)>, SegmentationError> {
    let Some(map) = raw.get("id2label").and_then(|v| v.as_object()) else {
        return Err(SegmentationError::ModelConfig("缺少 id2label".to_string()));
    };

    let mut labels = map
        .iter()
        .map(|(id, label)| {
            let id = id
                .parse::<usize>()
                .map_err(|_| SegmentationError::ModelConfig(format!("无效的类别下标: {}", id)))?;
            Ok((id, label.as_str().unwrap_or_default().to_string()))
        })
        .collect::<Result<Vec<_>, SegmentationError>>()?;
    labels.sort_by_key(|(id, _)| *id);
    Ok(labels)
}

fn find_person_label(labels: &[(usize, String)]) -> Option<usize> {
    labels
        .iter()
        .find(|(_, label)| label.to_lowercase().contains("person"))
        .map(|(id, _)| *id)
}

/// RGBA → `(1, 3, H, W)`，按 ImageNet 均值/方差归一化。
fn image_to_tensor(image: &RgbaImage, device: &Device) -> Result<Tensor, SegmentationError> {
    let (width, height) = image.dimensions();
    let plane = (width as usize) * (height as usize);
    let mut data = vec![0f32; plane * 3];

    for (i, pixel) in image.as_raw().chunks_exact(4).enumerate() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            data[c * plane + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok(Tensor::from_vec(
        data,
        (1, 3, height as usize, width as usize),
        device,
    )?)
}

fn device(cpu: bool) -> Result<Device, SegmentationError> {
    if cpu {
        Ok(Device::Cpu)
    } else {
        let device = Device::cuda_if_available(0)?;
        if !device.is_cuda() {
            log::debug!("分割模型运行在 CPU 上");
        }
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sorted_and_person_is_found() {
        let raw = serde_json::json!({
            "id2label": {
                "12": "person;individual;someone",
                "0": "wall",
                "2": "sky"
            }
        });

        let labels = parse_labels(&raw).expect("labels");

        assert_eq!(labels.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![0, 2, 12]);
        assert_eq!(find_person_label(&labels), Some(12));
    }

    #[test]
    fn missing_person_label_is_none() {
        let labels = vec![(0, "wall".to_string()), (1, "Sky".to_string())];
        assert_eq!(find_person_label(&labels), None);
    }

    #[test]
    fn malformed_labels_are_rejected() {
        assert!(parse_labels(&serde_json::json!({})).is_err());
        assert!(parse_labels(&serde_json::json!({"id2label": {"x": "person"}})).is_err());
    }

    #[test]
    fn tensor_is_normalized_channel_first() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 124, 255]));
        let tensor = image_to_tensor(&image, &Device::Cpu).expect("tensor");

        assert_eq!(tensor.dims(), &[1, 3, 2, 3]);
        let values = tensor.flatten_all().and_then(|t| t.to_vec1::<f32>()).expect("values");
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!((values[0] - red).abs() < 1e-5);
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((values[6] - green).abs() < 1e-5);
    }

    #[test]
    fn new_segmenter_loads_lazily() {
        let segmenter = SegformerSegmenter::new(SegmentationConfig::default());
        assert!(!segmenter.is_loaded());
    }
}
