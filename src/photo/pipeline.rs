//! # 解码流水线
//!
//! ## 设计思路
//!
//! 照片先过“预算”再解码：只读 header 拿到宽高，像素数或 RGBA 内存估算超限就直接拒绝，
//! 不给超大图完整解码的机会。色调在完整解码图上计算，之后再按配置降到工作分辨率，
//! 编辑画布和掩码都基于工作分辨率。
//!
//! 分割前的“最长边 ≤ 512”缩放与掩码回采样也复用这里的 `resize_rgba`。

use fast_image_resize as fr;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::io::Cursor;

use super::config::ResizeFilter;
use super::source::{LoadedPhoto, RawPhotoData};
use super::{ImageError, PhotoConfig, PhotoLoader};
use crate::tone::analyze_tone;

impl PhotoLoader {
    /// 将原始字节解码为编辑画布使用的 RGBA 数据。
    pub(crate) fn decode_and_prepare(
        &self,
        raw: RawPhotoData,
        config: &PhotoConfig,
    ) -> Result<LoadedPhoto, ImageError> {
        let header = ImageReader::new(Cursor::new(&raw.bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?
            .into_dimensions()
            .map_err(|e| ImageError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))?;
        check_decode_budget(config, header)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
        let original = (decoded.width(), decoded.height());
        check_decode_budget(config, original)?;

        let full = to_rgba(decoded);
        let tone = analyze_tone(&full);
        let working = downscale_to_working_size(full, config);

        log::info!(
            "✅ 照片解码成功 - 来源: {} 原始: {}x{} 工作画布: {}x{} 色调: {}",
            raw.source_hint,
            original.0,
            original.1,
            working.width(),
            working.height(),
            tone
        );

        Ok(LoadedPhoto::new(working, original, tone))
    }
}

/// 像素数与 RGBA 内存估算都必须在配置预算内。
fn check_decode_budget(config: &PhotoConfig, (width, height): (u32, u32)) -> Result<(), ImageError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 {
        return Err(ImageError::Decode("图片尺寸为 0".to_string()));
    }
    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "照片 {}x{} 共 {} 像素，超过上限 {}",
            width, height, pixels, config.max_decoded_pixels
        )));
    }

    let rgba_bytes = pixels.saturating_mul(4);
    if rgba_bytes > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "解码约需 {:.1} MB，超过上限 {:.1} MB",
            rgba_bytes as f64 / (1024.0 * 1024.0),
            config.max_decoded_bytes as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

/// 工作分辨率目标尺寸：同时满足单边上限与像素预算，只缩小不放大。
fn working_size(width: u32, height: u32, config: &PhotoConfig) -> (u32, u32) {
    let (w, h) = fit_within(width, height, config.preview_max_dimension);

    let pixels = u64::from(w) * u64::from(h);
    if pixels <= config.preview_target_pixels {
        return (w, h);
    }
    let shrink = (config.preview_target_pixels as f64 / pixels as f64).sqrt();
    (
        ((w as f64 * shrink).floor() as u32).max(1),
        ((h as f64 * shrink).floor() as u32).max(1),
    )
}

fn downscale_to_working_size(image: RgbaImage, config: &PhotoConfig) -> RgbaImage {
    if !config.adaptive_resize {
        return image;
    }

    let (width, height) = image.dimensions();
    let (target_width, target_height) = working_size(width, height, config);
    if (target_width, target_height) == (width, height) {
        return image;
    }

    log::info!(
        "🧩 降到工作分辨率：{}x{} -> {}x{}（filter={:?}）",
        width,
        height,
        target_width,
        target_height,
        config.resize_filter
    );
    resize_rgba(&image, target_width, target_height, config.resize_filter)
}

/// 计算“最长边不超过 `max_dimension`”的目标尺寸（保持宽高比，不放大）。
///
/// 短边按 `round(short * max / long)` 计算，至少为 1。
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scaled = |short: u32, long: u32| -> u32 {
        ((short as f64 * max_dimension as f64 / long as f64).round() as u32).max(1)
    };

    if width > height {
        (max_dimension, scaled(height, width))
    } else {
        (scaled(width, height), max_dimension)
    }
}

/// 精确缩放 RGBA 图像。
///
/// 优先使用 `fast_image_resize`，失败时回退 `image::imageops::resize`。
pub fn resize_rgba(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
) -> RgbaImage {
    if image.dimensions() == (target_width, target_height) {
        return image.clone();
    }

    match resize_with_fast_image_resize(image, target_width, target_height, filter) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize：{}", err);
            image::imageops::resize(image, target_width, target_height, filter.to_image_filter())
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage, ImageError> {
    let src = fr::images::Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| ImageError::Decode(format!("构建缩放源缓冲失败：{}", e)))?;
    let mut dst = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));
    fr::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| ImageError::Decode(format!("缩放失败：{}", e)))?;

    RgbaImage::from_raw(target_width, target_height, dst.into_vec())
        .ok_or_else(|| ImageError::Decode("缩放输出缓冲长度异常".to_string()))
}

/// 将 `DynamicImage` 统一转换为 RGBA。
pub(crate) fn to_rgba(image: DynamicImage) -> RgbaImage {
    match image {
        DynamicImage::ImageRgba8(rgba) => rgba,
        other => other.to_rgba8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::Tone;
    use image::{ImageFormat, Rgba};

    /// 每 10 列一列红色，其余为蓝色：逐 10 像素采样只会落在红列上。
    fn red_every_tenth_column_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, _| {
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
        bytes
    }

    #[test]
    fn fit_within_keeps_small_images_untouched() {
        assert_eq!(fit_within(320, 200, 512), (320, 200));
        assert_eq!(fit_within(512, 512, 512), (512, 512));
    }

    #[test]
    fn fit_within_scales_longest_edge_to_limit() {
        assert_eq!(fit_within(1024, 768, 512), (512, 384));
        assert_eq!(fit_within(600, 1200, 512), (256, 512));
        assert_eq!(fit_within(1000, 3, 512), (512, 2));
        assert_eq!(fit_within(4000, 1, 512), (512, 1));
    }

    #[test]
    fn fit_within_square_uses_height_branch() {
        assert_eq!(fit_within(2048, 2048, 512), (512, 512));
    }

    #[test]
    fn resize_rgba_produces_requested_dimensions() {
        let image = RgbaImage::from_pixel(40, 20, Rgba([10, 20, 30, 255]));
        let resized = resize_rgba(&image, 10, 5, ResizeFilter::Triangle);

        assert_eq!(resized.dimensions(), (10, 5));
        let px = resized.get_pixel(3, 3);
        for (actual, expected) in px.0.iter().zip([10u8, 20, 30, 255]) {
            assert!(actual.abs_diff(expected) <= 1, "{:?}", px);
        }
    }

    #[test]
    fn preview_downscale_respects_max_dimension() {
        let mut config = PhotoConfig::default();
        config.preview_max_dimension = 100;
        let image = RgbaImage::from_pixel(400, 200, Rgba([0, 0, 0, 255]));

        let working = downscale_to_working_size(image, &config);

        assert_eq!(working.dimensions(), (100, 50));
    }

    #[test]
    fn working_size_respects_pixel_budget() {
        let mut config = PhotoConfig::default();
        config.preview_target_pixels = 10_000;

        let (w, h) = working_size(400, 100, &config);

        assert!(u64::from(w) * u64::from(h) <= 10_000);
        assert_eq!((w, h), (200, 50));
    }

    #[test]
    fn zero_sized_or_huge_headers_are_rejected() {
        let config = PhotoConfig::default();
        assert!(matches!(check_decode_budget(&config, (0, 10)), Err(ImageError::Decode(_))));
        assert!(matches!(
            check_decode_budget(&config, (100_000, 100_000)),
            Err(ImageError::ResourceLimit(_))
        ));
        assert!(check_decode_budget(&config, (1920, 1080)).is_ok());
    }

    #[test]
    fn tone_is_taken_from_full_decode_before_downscale() {
        let loader = PhotoLoader::new(PhotoConfig::default());
        let mut config = PhotoConfig::default();
        config.preview_max_dimension = 50;
        let raw = RawPhotoData {
            bytes: red_every_tenth_column_png(200, 100),
            source_hint: "test",
        };

        let photo = loader.decode_and_prepare(raw, &config).expect("decode");

        assert_eq!(photo.dimensions(), (50, 25));
        assert_eq!(photo.original_dimensions(), (200, 100));
        assert_eq!(photo.tone(), Tone::Warm);
    }
}
