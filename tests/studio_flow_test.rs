// End-to-end editing session tests with a stub segmenter (no model download)
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use shade_style::error::AppError;
use shade_style::mask::{BrushMode, DisplayRect};
use shade_style::photo::PhotoSource;
use shade_style::segmentation::{PersonProbabilities, SegmentationError, Segmenter};
use shade_style::settings::StudioConfig;
use shade_style::studio::{DetectOutcome, MaskMode, Notice, StudioSession};
use shade_style::tone::Tone;

/// Lower half of every image is "person"; optionally sleeps to simulate inference time.
struct StubSegmenter {
    calls: AtomicUsize,
    delay: Duration,
}

impl StubSegmenter {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }
}

impl Segmenter for StubSegmenter {
    fn person_probabilities(
        &self,
        image: &RgbaImage,
    ) -> Result<Option<PersonProbabilities>, SegmentationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let (w, h) = image.dimensions();
        let values = (0..h)
            .flat_map(|y| (0..w).map(move |_| if y >= h / 2 { 1.0 } else { 0.05 }))
            .collect();
        PersonProbabilities::new(w, h, values).map(Some)
    }
}

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn session_with(segmenter: Arc<StubSegmenter>) -> StudioSession {
    StudioSession::new(StudioConfig::default(), segmenter).expect("session")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_detect_and_render_automatic_overlay() {
        let segmenter = StubSegmenter::new(Duration::ZERO);
        let session = session_with(segmenter.clone());

        let (summary, outcome) = session
            .upload_and_detect(PhotoSource::upload(png(64, 48, [60, 60, 200, 255]), "image/png"))
            .await
            .expect("upload");

        assert_eq!(summary.tone, Tone::Cool);
        assert!(matches!(outcome, DetectOutcome::Detected { .. }));
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 1);

        session.select_color("#E07A5F").expect("color");
        session.set_opacity(100).expect("opacity");
        let out = session.render().expect("render");

        assert_eq!(out.dimensions(), (64, 48));
        // Head region untouched, lower body fully colored.
        assert_eq!(out.get_pixel(32, 2), &Rgba([60, 60, 200, 255]));
        assert_eq!(out.get_pixel(32, 47), &Rgba([0xE0, 0x7A, 0x5F, 255]));
    }

    #[tokio::test]
    async fn test_rejected_upload_never_reaches_segmentation() {
        let segmenter = StubSegmenter::new(Duration::ZERO);
        let session = session_with(segmenter.clone());

        let err = session
            .upload_and_detect(PhotoSource::upload(b"%PDF-1.7 not a photo".to_vec(), "application/pdf"))
            .await
            .expect_err("rejected");

        assert_eq!(Notice::from(&err), Notice::invalid_file_type());
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 0);
        assert!(!session.snapshot().expect("snapshot").has_photo);
    }

    #[tokio::test]
    async fn test_image_mime_with_non_image_bytes_is_rejected() {
        let session = session_with(StubSegmenter::new(Duration::ZERO));

        let err = session
            .upload(PhotoSource::upload(b"%PDF-1.7 disguised".to_vec(), "image/png"))
            .expect_err("signature mismatch");

        assert!(Notice::from(&err).is_destructive());
        assert_eq!(Notice::from(&err), Notice::invalid_file_type());
    }

    #[tokio::test]
    async fn test_undecodable_image_type_reports_analysis_failure() {
        let segmenter = StubSegmenter::new(Duration::ZERO);
        let session = session_with(segmenter.clone());
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#;

        let err = session
            .upload(PhotoSource::upload(svg.to_vec(), "image/svg+xml"))
            .expect_err("svg cannot be decoded");

        assert_eq!(Notice::from(&err), Notice::analysis_failed());
        let snapshot = session.snapshot().expect("snapshot");
        assert!(!snapshot.has_photo);
        assert_eq!(snapshot.tone, None);
        assert_eq!(segmenter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stale_segmentation_result_is_discarded() {
        let segmenter = StubSegmenter::new(Duration::from_millis(200));
        let session = Arc::new(session_with(segmenter.clone()));
        session
            .upload(PhotoSource::upload(png(16, 16, [0, 0, 0, 255]), "image/png"))
            .expect("first upload");

        let detecting = {
            let session = session.clone();
            tokio::spawn(async move { session.detect_body_mask().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.is_busy());

        session
            .upload(PhotoSource::upload(png(24, 24, [255, 255, 255, 255]), "image/png"))
            .expect("second upload");

        let outcome = detecting.await.expect("join").expect("detect");
        assert_eq!(outcome, DetectOutcome::Superseded);
        assert!(!session.is_busy());
        assert!(session.auto_mask().expect("auto mask").is_none());
    }

    #[tokio::test]
    async fn test_manual_strokes_through_display_coordinates() {
        let session = session_with(StubSegmenter::new(Duration::ZERO));
        session
            .upload(PhotoSource::upload(png(200, 100, [0, 0, 0, 255]), "image/png"))
            .expect("upload");
        session.set_mask_mode(MaskMode::Manual).expect("mode");
        session.set_brush_radius(10).expect("radius");
        session.select_color("#00FF00").expect("color");
        session.set_opacity(100).expect("opacity");

        // Canvas shown at half size.
        let rect = DisplayRect {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
        };
        let (x0, y0) = session
            .map_display_point(20.0, 45.0, rect)
            .expect("map")
            .expect("valid rect");
        let (x1, y1) = session
            .map_display_point(90.0, 45.0, rect)
            .expect("map")
            .expect("valid rect");
        assert_eq!((x0, y0), (20.0, 50.0));

        session.begin_stroke(x0, y0).expect("begin");
        session.stroke_to(x1, y1).expect("move");
        session.end_stroke().expect("end");

        let out = session.render().expect("render");
        for x in (20..160).step_by(7) {
            assert_eq!(out.get_pixel(x, 50), &Rgba([0, 255, 0, 255]), "x={x}");
        }
        assert_eq!(out.get_pixel(100, 5), &Rgba([0, 0, 0, 255]));

        session.set_brush_mode(BrushMode::Erase).expect("erase");
        session.paint_at(100.0, 50.0).expect("erase");
        assert_eq!(
            session.render().expect("render").get_pixel(100, 50),
            &Rgba([0, 0, 0, 255])
        );

        session.clear_mask().expect("clear");
        assert_eq!(session.manual_mask().expect("mask").coverage(), 0);
    }

    #[tokio::test]
    async fn test_reset_returns_to_upload_state() {
        let session = session_with(StubSegmenter::new(Duration::ZERO));
        session
            .upload(PhotoSource::upload(png(8, 8, [128, 128, 128, 255]), "image/png"))
            .expect("upload");
        session.detect_body_mask().await.expect("detect");

        session.reset().expect("reset");

        let snapshot = session.snapshot().expect("snapshot");
        assert!(!snapshot.has_photo);
        assert!(!snapshot.has_auto_mask);
        assert!(matches!(session.render(), Err(AppError::NoPhoto)));
    }

    #[tokio::test]
    async fn test_large_photo_tone_uses_full_resolution() {
        let session = session_with(StubSegmenter::new(Duration::ZERO));
        // 3000x2000 超过默认工作分辨率；每 10 列一列红色，其余为蓝色
        let image = RgbaImage::from_fn(3000, 2000, |x, _| {
            if x % 10 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");

        let summary = session
            .upload(PhotoSource::upload(bytes, "image/png"))
            .expect("upload");

        assert_eq!((summary.original_width, summary.original_height), (3000, 2000));
        assert!(summary.width < 3000);
        assert_eq!(summary.tone, Tone::Warm);
        assert_eq!(session.snapshot().expect("snapshot").tone, Some(Tone::Warm));
    }

    #[tokio::test]
    async fn test_base64_data_url_upload() {
        use base64::Engine;

        let session = session_with(StubSegmenter::new(Duration::ZERO));
        let encoded = base64::engine::general_purpose::STANDARD.encode(png(12, 6, [250, 20, 20, 255]));

        let summary = session
            .upload(PhotoSource::Base64(format!("data:image/png;base64,{encoded}")))
            .expect("upload");

        assert_eq!(summary.tone, Tone::Warm);
        assert_eq!((summary.width, summary.height), (12, 6));
    }
}
