//! Pure region cropping logic — functional core.
//!
//! This module has zero infrastructure dependencies. It maps a selection in
//! CSS pixels onto the screenshot's bitmap pixels and cuts it out.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat as EncodedFormat};
use std::io::Cursor;

use crate::geometry::{Rect, Viewport};
use crate::settings::{ImageFormat, Quality};

/// Bitmap pixels per CSS pixel, per axis.
///
/// Derived from the bitmap that actually came back, not from the device
/// pixel ratio: under zoom or mixed-DPI setups the two disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub fn between(bitmap_width: u32, bitmap_height: u32, viewport: Viewport) -> Self {
        let ratio = |pixels: u32, css: f64| {
            if css > 0.0 {
                pixels as f64 / css
            } else {
                1.0
            }
        };
        Self {
            x: ratio(bitmap_width, viewport.width),
            y: ratio(bitmap_height, viewport.height),
        }
    }
}

/// Source rectangle in screenshot pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropPlan {
    /// Scales `rect` by `scale`, rounds to whole pixels, and clips to the
    /// bitmap. Fails when nothing of positive size is left.
    pub fn new(
        rect: Rect,
        scale: ScaleFactors,
        bitmap_width: u32,
        bitmap_height: u32,
    ) -> Result<Self, CropError> {
        let left = (rect.left * scale.x).round() as i64;
        let top = (rect.top * scale.y).round() as i64;
        let width = (rect.width * scale.x).round() as i64;
        let height = (rect.height * scale.y).round() as i64;

        if width <= 0 || height <= 0 {
            return Err(CropError::InvalidDimensions { width, height });
        }

        let x = left.clamp(0, bitmap_width as i64);
        let y = top.clamp(0, bitmap_height as i64);
        let clipped_width = left.saturating_add(width).min(bitmap_width as i64) - x;
        let clipped_height = top.saturating_add(height).min(bitmap_height as i64) - y;

        if clipped_width <= 0 || clipped_height <= 0 {
            return Err(CropError::InvalidDimensions {
                width: clipped_width,
                height: clipped_height,
            });
        }

        Ok(Self {
            x: x as u32,
            y: y as u32,
            width: clipped_width as u32,
            height: clipped_height as u32,
        })
    }
}

/// A finished crop, PNG-encoded.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub png: Vec<u8>,
    pub plan: CropPlan,
    pub scale: ScaleFactors,
}

impl CroppedImage {
    pub fn width(&self) -> u32 {
        self.plan.width
    }

    pub fn height(&self) -> u32 {
        self.plan.height
    }
}

/// Crops the CSS-pixel `rect` out of a full-viewport screenshot.
///
/// The sub-region is copied pixel for pixel (no resampling), so the result
/// is exactly `plan.width` × `plan.height` bitmap pixels.
pub fn crop_screenshot(
    screenshot: &DynamicImage,
    viewport: Viewport,
    rect: Rect,
) -> Result<CroppedImage, CropError> {
    let (bitmap_width, bitmap_height) = (screenshot.width(), screenshot.height());
    let scale = ScaleFactors::between(bitmap_width, bitmap_height, viewport);
    let plan = CropPlan::new(rect, scale, bitmap_width, bitmap_height)?;

    let png = crop_to_png_bytes(screenshot, plan)?;

    Ok(CroppedImage { png, plan, scale })
}

/// Same as [`crop_screenshot`] but starting from encoded bytes.
pub fn crop_encoded(
    encoded: &[u8],
    viewport: Viewport,
    rect: Rect,
) -> Result<CroppedImage, CropError> {
    let screenshot =
        image::load_from_memory(encoded).map_err(|e| CropError::Decode(e.to_string()))?;
    crop_screenshot(&screenshot, viewport, rect)
}

/// Cuts `plan` out of `image` and returns PNG bytes.
pub fn crop_to_png_bytes(image: &DynamicImage, plan: CropPlan) -> Result<Vec<u8>, CropError> {
    let cropped = image.crop_imm(plan.x, plan.y, plan.width, plan.height);

    let mut png_bytes: Vec<u8> = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut png_bytes), EncodedFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;

    Ok(png_bytes)
}

/// Re-encodes a PNG crop in the user's chosen download format.
///
/// PNG passes through untouched. JPEG drops alpha and uses the quality
/// level's encoder setting.
pub fn encode_for_download(
    png: &[u8],
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, CropError> {
    match format {
        ImageFormat::Png => Ok(png.to_vec()),
        ImageFormat::Jpeg => {
            let image =
                image::load_from_memory(png).map_err(|e| CropError::Decode(e.to_string()))?;
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

            let mut jpeg_bytes: Vec<u8> = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, quality.jpeg_quality());
            rgb.write_with_encoder(encoder)
                .map_err(|e| CropError::EncodingFailed(e.to_string()))?;
            Ok(jpeg_bytes)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has non-positive size ({width}x{height})")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("Screenshot could not be decoded: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn rect(left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn scale_is_bitmap_over_viewport_per_axis() {
        let scale = ScaleFactors::between(2400, 1200, Viewport::new(1200.0, 800.0));
        assert_eq!(scale.x, 2.0);
        assert_eq!(scale.y, 1.5);
    }

    #[test]
    fn hidpi_crop_doubles_every_edge() {
        let scale = ScaleFactors::between(2400, 1600, Viewport::new(1200.0, 800.0));
        let plan = CropPlan::new(rect(100.0, 100.0, 200.0, 100.0), scale, 2400, 1600).unwrap();
        assert_eq!(
            plan,
            CropPlan {
                x: 200,
                y: 200,
                width: 400,
                height: 200
            }
        );
    }

    #[test]
    fn fractional_scale_rounds_to_pixels() {
        // 125% zoom: 1500 bitmap px across a 1200 px viewport.
        let scale = ScaleFactors::between(1500, 1000, Viewport::new(1200.0, 800.0));
        let plan = CropPlan::new(rect(10.0, 10.0, 101.0, 33.0), scale, 1500, 1000).unwrap();
        assert_eq!((plan.x, plan.y), (13, 13));
        assert_eq!((plan.width, plan.height), (126, 41));
    }

    #[test]
    fn selection_past_the_edge_is_clipped() {
        let scale = ScaleFactors::between(100, 100, Viewport::new(100.0, 100.0));
        let plan = CropPlan::new(rect(80.0, 80.0, 30.0, 30.0), scale, 100, 100).unwrap();
        assert_eq!((plan.width, plan.height), (20, 20));
    }

    #[test]
    fn zero_size_is_rejected() {
        let scale = ScaleFactors::between(100, 100, Viewport::new(100.0, 100.0));
        let err = CropPlan::new(rect(10.0, 10.0, 0.2, 50.0), scale, 100, 100).unwrap_err();
        assert!(matches!(err, CropError::InvalidDimensions { width: 0, .. }));

        let err = CropPlan::new(rect(150.0, 10.0, 20.0, 20.0), scale, 100, 100).unwrap_err();
        assert!(matches!(err, CropError::InvalidDimensions { .. }));
    }

    #[test]
    fn far_off_bitmap_rect_is_rejected_not_overflowed() {
        let scale = ScaleFactors { x: 1.0, y: 1.0 };
        let err = CropPlan::new(rect(6e18, 0.0, 6e18, 10.0), scale, 100, 100).unwrap_err();
        assert!(matches!(err, CropError::InvalidDimensions { .. }));
    }

    #[test]
    fn crop_is_pixel_exact() {
        // Left half red, right half blue, at 2x.
        let mut bitmap = RgbaImage::new(200, 100);
        for (x, _, px) in bitmap.enumerate_pixels_mut() {
            *px = if x < 100 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }
        let screenshot = DynamicImage::ImageRgba8(bitmap);
        let cropped =
            crop_screenshot(&screenshot, Viewport::new(100.0, 50.0), rect(40.0, 10.0, 20.0, 10.0))
                .unwrap();

        assert_eq!(&cropped.png[..4], &[0x89, 0x50, 0x4E, 0x47]);
        let decoded = image::load_from_memory(&cropped.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 20));
        assert_eq!(decoded.get_pixel(19, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(20, 5), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = crop_encoded(b"not a png", Viewport::new(10.0, 10.0), rect(0.0, 0.0, 6.0, 6.0))
            .unwrap_err();
        assert!(matches!(err, CropError::Decode(_)));
    }

    #[test]
    fn jpeg_download_encoding() {
        let screenshot = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            32,
            32,
            Rgba([10, 200, 30, 255]),
        ));
        let png = crop_to_png_bytes(
            &screenshot,
            CropPlan {
                x: 0,
                y: 0,
                width: 16,
                height: 16,
            },
        )
        .unwrap();

        let passthrough = encode_for_download(&png, ImageFormat::Png, Quality::High).unwrap();
        assert_eq!(passthrough, png);

        let jpeg = encode_for_download(&png, ImageFormat::Jpeg, Quality::Medium).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }
}
