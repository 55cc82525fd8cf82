//! Capture pipeline — hide the overlay, fetch the screenshot, crop it.

use crate::agent::overlay::UiVisibility;
use crate::capture::{self, data_uri};
use crate::error::SnipError;
use crate::geometry::{Rect, Viewport};
use crate::platform::{HostLink, PageSurface};
use crate::protocol::HostRequest;

/// Keeps the overlay hidden for as long as it lives.
///
/// Taking one snapshots the current visibility and hides everything;
/// dropping it puts back exactly that snapshot, on every exit path.
pub struct HiddenUi<'a, P: PageSurface> {
    page: &'a mut P,
    restore: UiVisibility,
}

impl<'a, P: PageSurface> HiddenUi<'a, P> {
    pub fn engage(page: &'a mut P) -> Self {
        let restore = page.ui_visibility();
        page.set_ui_visibility(UiVisibility::hidden());
        Self { page, restore }
    }
}

impl<P: PageSurface> Drop for HiddenUi<'_, P> {
    fn drop(&mut self) {
        self.page.set_ui_visibility(self.restore);
    }
}

/// A crop ready to hand to the clipboard or a download.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    pub fn data_uri(&self) -> String {
        data_uri::encode_png(&self.png)
    }
}

/// Screenshots the viewport through the host and crops `rect` out of it.
///
/// The viewport is measured up front so the scale is computed against the
/// size the page had when the bitmap was taken.
pub async fn capture_region<P: PageSurface, H: HostLink>(
    page: &mut P,
    host: &H,
    rect: Rect,
) -> Result<CapturedImage, SnipError> {
    let viewport: Viewport = page.viewport();
    let start = std::time::Instant::now();

    let response = {
        let _hidden = HiddenUi::engage(page);
        host.request(HostRequest::CaptureScreenshot).await
    }
    .map_err(|e| SnipError::CaptureFailed(e.to_string()))?;

    if !response.success {
        return Err(SnipError::CaptureFailed(response.error_message()));
    }
    let screenshot = response
        .screenshot
        .ok_or_else(|| SnipError::CaptureFailed("host returned no screenshot".to_string()))?;

    let payload = data_uri::decode(&screenshot)?;
    let cropped = capture::crop_encoded(&payload.bytes, viewport, rect)?;

    log::info!(
        "[AGENT] Cropped {}x{} at {},{} (scale {:.2}x{:.2}) in {}ms",
        cropped.width(),
        cropped.height(),
        cropped.plan.x,
        cropped.plan.y,
        cropped.scale.x,
        cropped.scale.y,
        start.elapsed().as_millis()
    );

    Ok(CapturedImage {
        width: cropped.width(),
        height: cropped.height(),
        png: cropped.png,
    })
}
