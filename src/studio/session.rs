//! # 编辑会话
//!
//! ## 设计思路
//!
//! 界面上的状态（当前照片、色调、选中颜色、不透明度、掩码模式、自动/手动掩码）
//! 集中放在一个 `StudioSession` 中，由它决定每次渲染用哪张掩码：
//! - 自动模式：有选中颜色且有自动掩码时才叠色
//! - 手动模式：只要有选中颜色就叠色（空掩码即原图）
//!
//! ## 实现思路
//!
//! - 状态放在 `Mutex` 中，会话本身 `Send + Sync`，可在异步运行时中共享。
//! - 人体分割是唯一的耗时操作，通过 `spawn_blocking` 放到阻塞线程执行，
//!   执行期间 `is_busy()` 为真（`BusyGuard` 离开作用域时自动复位）。
//! - 每次上传/重置都会递增代次；分割结果回来时若代次已变化，则直接丢弃。

use image::RgbaImage;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use super::Notice;
use crate::color::HexColor;
use crate::error::AppError;
use crate::mask::{BrushMode, DisplayRect, ManualMaskEditor, MaskBuffer};
use crate::overlay::{clamp_opacity, composite_into};
use crate::photo::{LoadedPhoto, PhotoLoader, PhotoSource, PreviewProfile};
use crate::segmentation::{SegmentationAdapter, SegmentationError, Segmenter};
use crate::settings::StudioConfig;
use crate::tone::{ColorShade, Tone};

/// 当前生效的掩码来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    #[default]
    Automatic,
    Manual,
}

/// 上传成功后的摘要。
#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub tone: Tone,
    pub palette: &'static [ColorShade],
    pub notice: Notice,
}

/// 一次人体分割的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectOutcome {
    /// 已保存自动掩码
    Detected { coverage: usize },
    /// 没有检测到人体（或分割失败）
    NotFound,
    /// 期间上传了新照片或重置了会话，结果被丢弃
    Superseded,
}

/// 会话状态快照。
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub has_photo: bool,
    pub dimensions: Option<(u32, u32)>,
    pub tone: Option<Tone>,
    pub color: Option<HexColor>,
    pub opacity: u8,
    pub mask_mode: MaskMode,
    pub has_auto_mask: bool,
    pub brush_radius: u32,
    pub brush_mode: BrushMode,
    pub busy: bool,
}

struct SessionState {
    photo: Option<Arc<LoadedPhoto>>,
    tone: Option<Tone>,
    color: Option<HexColor>,
    opacity: u8,
    mask_mode: MaskMode,
    auto_mask: Option<MaskBuffer>,
    editor: Option<ManualMaskEditor>,
    brush_radius: u32,
    brush_mode: BrushMode,
}

impl SessionState {
    fn empty(config: &StudioConfig) -> Self {
        Self {
            photo: None,
            tone: None,
            color: None,
            opacity: config.default_opacity,
            mask_mode: MaskMode::Automatic,
            auto_mask: None,
            editor: None,
            brush_radius: config.brush.default_radius,
            brush_mode: BrushMode::Draw,
        }
    }

    fn editor_mut(&mut self) -> Result<&mut ManualMaskEditor, AppError> {
        self.editor.as_mut().ok_or(AppError::NoPhoto)
    }
}

/// 分割进行中的计数守卫，离开作用域时自动减一。
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct StudioSession {
    config: StudioConfig,
    loader: PhotoLoader,
    segmentation: SegmentationAdapter,
    state: Mutex<SessionState>,
    in_flight: AtomicUsize,
    generation: AtomicU64,
}

impl StudioSession {
    pub fn new(config: StudioConfig, segmenter: Arc<dyn Segmenter>) -> Result<Self, AppError> {
        config.validate()?;
        let segmentation = SegmentationAdapter::new(config.segmentation.clone(), segmenter);
        Ok(Self::with_adapter(config, segmentation))
    }

    /// 使用默认的 SegFormer 分割后端。
    pub fn with_segformer(config: StudioConfig) -> Result<Self, AppError> {
        config.validate()?;
        let segmentation = SegmentationAdapter::with_segformer(config.segmentation.clone());
        Ok(Self::with_adapter(config, segmentation))
    }

    fn with_adapter(config: StudioConfig, segmentation: SegmentationAdapter) -> Self {
        Self {
            loader: PhotoLoader::new(config.photo.clone()),
            segmentation,
            state: Mutex::new(SessionState::empty(&config)),
            in_flight: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SessionState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::Session("会话状态锁已中毒".to_string()))
    }

    /// 切换工作分辨率档位，对之后的上传生效。
    pub fn set_preview_profile(&self, profile: PreviewProfile) -> Result<(), AppError> {
        Ok(self.loader.set_preview_profile(profile)?)
    }

    /// 人体分割是否正在进行。
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// 上传照片：校验类型 → 解码 → 色调分析。
    ///
    /// 类型校验失败时直接返回错误，不会进行色调分析或分割；
    /// 用 `Notice::from(&err)` 得到对应提示。
    pub fn upload(&self, source: PhotoSource) -> Result<UploadSummary, AppError> {
        let start = Instant::now();

        let photo = self.loader.load(source).map_err(|e| {
            if e.is_invalid_file_type() {
                log::warn!("🚫 拒绝上传：{}", e);
            } else {
                log::error!("❌ 照片加载失败：{}", e);
            }
            AppError::from(e)
        })?;

        let tone = photo.tone();
        let (width, height) = photo.dimensions();
        let (original_width, original_height) = photo.original_dimensions();

        let mut state = self.lock_state()?;
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut editor = ManualMaskEditor::new(width, height, self.config.brush.clone());
        editor.set_radius(state.brush_radius)?;
        editor.set_mode(state.brush_mode);

        state.photo = Some(Arc::new(photo));
        state.tone = Some(tone);
        state.color = None;
        state.auto_mask = None;
        state.editor = Some(editor);

        log::info!(
            "📷 上传完成 - {}x{}（原始 {}x{}），色调 {}，耗时 {}ms",
            width,
            height,
            original_width,
            original_height,
            tone,
            start.elapsed().as_millis()
        );

        Ok(UploadSummary {
            width,
            height,
            original_width,
            original_height,
            tone,
            palette: tone.palette(),
            notice: Notice::analysis_complete(tone),
        })
    }

    /// 上传后立即进行人体分割。
    pub async fn upload_and_detect(
        &self,
        source: PhotoSource,
    ) -> Result<(UploadSummary, DetectOutcome), AppError> {
        let summary = self.upload(source)?;
        let outcome = self.detect_body_mask().await?;
        Ok((summary, outcome))
    }

    /// 在阻塞线程上对当前照片做人体分割并保存自动掩码。
    pub async fn detect_body_mask(&self) -> Result<DetectOutcome, AppError> {
        let (photo, generation) = {
            let state = self.lock_state()?;
            let photo = state.photo.clone().ok_or(AppError::NoPhoto)?;
            (photo, self.generation.load(Ordering::SeqCst))
        };

        let _busy = BusyGuard::new(&self.in_flight);
        let adapter = self.segmentation.clone();
        let mask = tokio::task::spawn_blocking(move || adapter.detect_body_mask(photo.image()))
            .await
            .map_err(|e| SegmentationError::Worker(e.to_string()))?;

        let mut state = self.lock_state()?;
        if self.generation.load(Ordering::SeqCst) != generation {
            log::info!("⏭️ 照片已更换，丢弃过期的分割结果");
            return Ok(DetectOutcome::Superseded);
        }

        let outcome = match &mask {
            Some(mask) => DetectOutcome::Detected {
                coverage: mask.coverage(),
            },
            None => DetectOutcome::NotFound,
        };
        state.auto_mask = mask;
        Ok(outcome)
    }

    /// 选择叠加颜色（hex 字符串）。
    pub fn select_color(&self, hex: &str) -> Result<HexColor, AppError> {
        let color = HexColor::parse(hex)?;
        self.lock_state()?.color = Some(color);
        Ok(color)
    }

    pub fn clear_color(&self) -> Result<(), AppError> {
        self.lock_state()?.color = None;
        Ok(())
    }

    /// 设置不透明度，返回钳制到 0–100 后的值。
    pub fn set_opacity(&self, opacity: i64) -> Result<u8, AppError> {
        let opacity = clamp_opacity(opacity);
        self.lock_state()?.opacity = opacity;
        Ok(opacity)
    }

    pub fn set_mask_mode(&self, mode: MaskMode) -> Result<(), AppError> {
        self.lock_state()?.mask_mode = mode;
        Ok(())
    }

    pub fn set_brush_radius(&self, radius: u32) -> Result<u32, AppError> {
        let mut state = self.lock_state()?;
        let snapped = self.config.brush.snap_radius(radius)?;
        if let Some(editor) = state.editor.as_mut() {
            editor.set_radius(snapped)?;
        }
        state.brush_radius = snapped;
        Ok(snapped)
    }

    pub fn set_brush_mode(&self, mode: BrushMode) -> Result<(), AppError> {
        let mut state = self.lock_state()?;
        if let Some(editor) = state.editor.as_mut() {
            editor.set_mode(mode);
        }
        state.brush_mode = mode;
        Ok(())
    }

    pub fn paint_at(&self, x: f32, y: f32) -> Result<bool, AppError> {
        Ok(self.lock_state()?.editor_mut()?.paint_at(x, y))
    }

    pub fn begin_stroke(&self, x: f32, y: f32) -> Result<bool, AppError> {
        Ok(self.lock_state()?.editor_mut()?.begin_stroke(x, y))
    }

    pub fn stroke_to(&self, x: f32, y: f32) -> Result<bool, AppError> {
        Ok(self.lock_state()?.editor_mut()?.stroke_to(x, y))
    }

    pub fn end_stroke(&self) -> Result<(), AppError> {
        self.lock_state()?.editor_mut()?.end_stroke();
        Ok(())
    }

    /// 把显示坐标换算为掩码坐标。
    pub fn map_display_point(
        &self,
        client_x: f32,
        client_y: f32,
        rect: DisplayRect,
    ) -> Result<Option<(f32, f32)>, AppError> {
        let mut state = self.lock_state()?;
        Ok(state.editor_mut()?.map_display_point(client_x, client_y, rect))
    }

    /// 清空手动掩码。
    pub fn clear_mask(&self) -> Result<(), AppError> {
        self.lock_state()?.editor_mut()?.clear();
        Ok(())
    }

    /// 手动掩码的副本。
    pub fn manual_mask(&self) -> Result<MaskBuffer, AppError> {
        let mut state = self.lock_state()?;
        Ok(state.editor_mut()?.mask().clone())
    }

    pub fn auto_mask(&self) -> Result<Option<MaskBuffer>, AppError> {
        Ok(self.lock_state()?.auto_mask.clone())
    }

    /// “重新上传”：回到初始状态，进行中的分割结果会被丢弃。
    pub fn reset(&self) -> Result<(), AppError> {
        let mut state = self.lock_state()?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = SessionState::empty(&self.config);
        log::info!("🔄 会话已重置");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        let state = self.lock_state()?;
        Ok(SessionSnapshot {
            has_photo: state.photo.is_some(),
            dimensions: state.photo.as_ref().map(|p| p.dimensions()),
            tone: state.tone,
            color: state.color,
            opacity: state.opacity,
            mask_mode: state.mask_mode,
            has_auto_mask: state.auto_mask.is_some(),
            brush_radius: state.brush_radius,
            brush_mode: state.brush_mode,
            busy: self.is_busy(),
        })
    }

    /// 渲染当前画面。
    pub fn render(&self) -> Result<RgbaImage, AppError> {
        let mut out = RgbaImage::new(0, 0);
        self.render_into(&mut out)?;
        Ok(out)
    }

    /// 渲染到调用方持有的缓冲区。
    pub fn render_into(&self, out: &mut RgbaImage) -> Result<(), AppError> {
        let state = self.lock_state()?;
        let photo = state.photo.as_ref().ok_or(AppError::NoPhoto)?;
        let base = photo.image();

        let Some(color) = state.color else {
            composite_into(base, None, HexColor::rgb(0, 0, 0), 0, out)?;
            return Ok(());
        };

        let mask = match state.mask_mode {
            MaskMode::Automatic => state.auto_mask.as_ref(),
            MaskMode::Manual => state.editor.as_ref().map(ManualMaskEditor::mask),
        };

        composite_into(base, mask, color, state.opacity, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::ImageError;
    use crate::segmentation::PersonProbabilities;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    /// 计数桩：下半部分全是人体。
    struct CountingSegmenter {
        calls: AtomicUsize,
    }

    impl Segmenter for CountingSegmenter {
        fn person_probabilities(
            &self,
            image: &RgbaImage,
        ) -> Result<Option<PersonProbabilities>, SegmentationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (w, h) = image.dimensions();
            let values = (0..h)
                .flat_map(|y| (0..w).map(move |_| if y >= h / 2 { 1.0 } else { 0.0 }))
                .collect();
            PersonProbabilities::new(w, h, values).map(Some)
        }
    }

    fn session() -> (StudioSession, Arc<CountingSegmenter>) {
        let segmenter = Arc::new(CountingSegmenter {
            calls: AtomicUsize::new(0),
        });
        let session =
            StudioSession::new(StudioConfig::default(), segmenter.clone()).expect("session");
        (session, segmenter)
    }

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn upload_reports_tone_and_palette() {
        let (session, _) = session();

        let summary = session
            .upload(PhotoSource::upload(png(20, 10, [220, 90, 40, 255]), "image/png"))
            .expect("upload");

        assert_eq!((summary.width, summary.height), (20, 10));
        assert_eq!(summary.tone, Tone::Warm);
        assert_eq!(summary.palette, Tone::Warm.palette());
        assert_eq!(summary.notice.title, "Analysis Complete!");
    }

    #[test]
    fn non_image_upload_is_rejected_without_analysis() {
        let (session, segmenter) = session();

        let err = session
            .upload(PhotoSource::upload(b"hello".to_vec(), "text/plain"))
            .expect_err("rejected");

        assert!(matches!(err, AppError::Image(ImageError::NotAnImage(_))));
        assert_eq!(Notice::from(&err), Notice::invalid_file_type());
        let snapshot = session.snapshot().expect("snapshot");
        assert!(!snapshot.has_photo);
        assert_eq!(snapshot.tone, None);
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undecodable_photo_fails_upload_and_keeps_previous_state() {
        let (session, _) = session();
        session
            .upload(PhotoSource::upload(png(6, 6, [0, 0, 255, 255]), "image/png"))
            .expect("upload");

        let mut truncated = png(6, 6, [255, 0, 0, 255]);
        truncated.truncate(24);
        let err = session
            .upload(PhotoSource::upload(truncated, "image/png"))
            .expect_err("truncated png");

        assert_eq!(Notice::from(&err), Notice::analysis_failed());
        let snapshot = session.snapshot().expect("snapshot");
        assert_eq!(snapshot.dimensions, Some((6, 6)));
        assert_eq!(snapshot.tone, Some(Tone::Cool));
    }

    #[test]
    fn automatic_mode_needs_color_and_mask() {
        let (session, _) = session();
        let bytes = png(8, 8, [10, 10, 10, 255]);
        session
            .upload(PhotoSource::upload(bytes, "image/png"))
            .expect("upload");
        let base = session.render().expect("render");

        session.select_color("#FF0000").expect("color");
        assert_eq!(session.render().expect("render"), base);
    }

    #[test]
    fn manual_mode_overlays_painted_region() {
        let (session, _) = session();
        session
            .upload(PhotoSource::upload(png(40, 40, [0, 0, 0, 255]), "image/png"))
            .expect("upload");
        session.set_mask_mode(MaskMode::Manual).expect("mode");
        session.select_color("#FFFFFF").expect("color");
        session.set_opacity(100).expect("opacity");

        assert_eq!(
            session.render().expect("render").get_pixel(20, 20),
            &Rgba([0, 0, 0, 255])
        );

        session.set_brush_radius(5).expect("radius");
        session.paint_at(20.0, 20.0).expect("paint");
        let out = session.render().expect("render");

        assert_eq!(out.get_pixel(20, 20), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn brush_operations_need_a_photo() {
        let (session, _) = session();
        assert!(matches!(session.paint_at(1.0, 1.0), Err(AppError::NoPhoto)));
        assert!(matches!(session.render(), Err(AppError::NoPhoto)));
    }

    #[test]
    fn brush_settings_survive_a_new_upload() {
        let (session, _) = session();
        session.set_brush_radius(62).expect("radius");
        session.set_brush_mode(BrushMode::Erase).expect("mode");

        session
            .upload(PhotoSource::upload(png(4, 4, [0, 0, 0, 255]), "image/png"))
            .expect("upload");

        let snapshot = session.snapshot().expect("snapshot");
        assert_eq!(snapshot.brush_radius, 60);
        assert_eq!(snapshot.brush_mode, BrushMode::Erase);
    }

    #[test]
    fn opacity_is_clamped_and_reset_restores_defaults() {
        let (session, _) = session();
        assert_eq!(session.set_opacity(250).expect("opacity"), 100);
        session.select_color("#123").expect("color");

        session.reset().expect("reset");

        let snapshot = session.snapshot().expect("snapshot");
        assert_eq!(snapshot.opacity, 50);
        assert_eq!(snapshot.color, None);
        assert!(!snapshot.has_photo);
    }

    #[test]
    fn invalid_color_is_rejected() {
        let (session, _) = session();
        let err = session.select_color("not-a-color").expect_err("invalid");
        assert!(matches!(err, AppError::Color(_)));
    }

    #[tokio::test]
    async fn detect_stores_auto_mask_for_rendering() {
        let (session, segmenter) = session();
        session
            .upload(PhotoSource::upload(png(30, 30, [0, 0, 0, 255]), "image/png"))
            .expect("upload");

        let outcome = session.detect_body_mask().await.expect("detect");

        assert!(matches!(outcome, DetectOutcome::Detected { coverage } if coverage > 0));
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_busy());

        session.select_color("#00FF00").expect("color");
        session.set_opacity(100).expect("opacity");
        let out = session.render().expect("render");
        assert_eq!(out.get_pixel(15, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(15, 29), &Rgba([0, 255, 0, 255]));
    }

    #[tokio::test]
    async fn detect_without_photo_fails() {
        let (session, segmenter) = session();
        assert!(matches!(session.detect_body_mask().await, Err(AppError::NoPhoto)));
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 0);
    }
}
