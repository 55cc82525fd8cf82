//! Full-screen capture using the `xcap` crate.
//!
//! This is the infrastructure layer — it talks to the OS. The desktop
//! rendition treats the primary monitor as the one visible "tab".

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use xcap::Monitor;

use crate::geometry::Viewport;

fn primary_monitor() -> Result<Monitor, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            return Ok(monitor);
        }
        // If no monitor reports as primary, use the first one
        fallback.get_or_insert(monitor);
    }
    fallback.ok_or(CaptureError::NoPrimaryMonitor)
}

/// Logical size of the primary monitor, i.e. the desktop "viewport".
pub fn primary_viewport() -> Result<Viewport, CaptureError> {
    let monitor = primary_monitor()?;
    let width = monitor
        .width()
        .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
    let height = monitor
        .height()
        .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
    Ok(Viewport::new(width as f64, height as f64))
}

/// Captures the primary monitor's screen as a `DynamicImage`.
///
/// Returns the full-screen screenshot including all pixels.
/// The caller is responsible for cropping to the user's selection.
pub fn capture_primary_monitor() -> Result<DynamicImage, CaptureError> {
    let image = primary_monitor()?
        .capture_image()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

    Ok(DynamicImage::ImageRgba8(image))
}

/// Captures the primary monitor and encodes it as PNG.
pub fn capture_primary_png() -> Result<Vec<u8>, CaptureError> {
    let start = std::time::Instant::now();
    let screenshot = capture_primary_monitor()?;
    let capture_ms = start.elapsed().as_millis();

    let mut png_bytes: Vec<u8> = Vec::new();
    screenshot
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;

    log::info!(
        "[CAPTURE] Screen {}x{} captured in {}ms, encoded in {}ms ({} bytes)",
        screenshot.width(),
        screenshot.height(),
        capture_ms,
        start.elapsed().as_millis() - capture_ms,
        png_bytes.len()
    );
    Ok(png_bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No primary monitor found")]
    NoPrimaryMonitor,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),
}
