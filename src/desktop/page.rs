//! Headless page surface for the desktop rendition.
//!
//! There is no DOM to paint on, so the surface keeps the overlay state the
//! agent asked for and forwards user-visible notices to the front end.

use tokio::sync::mpsc;

use crate::agent::feedback::{Sound, Toast};
use crate::agent::overlay::{OverlayFrame, UiVisibility};
use crate::geometry::{Point, Viewport};
use crate::platform::{PageSurface, PlatformError};

/// Something the user would have seen or heard on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageNotice {
    Toast(Toast),
    Banner(String),
}

pub struct HeadlessPage {
    viewport: Viewport,
    mounted: bool,
    visibility: UiVisibility,
    crosshair: bool,
    last_frame: Option<OverlayFrame>,
    toolbar_at: Option<Point>,
    notices: mpsc::UnboundedSender<PageNotice>,
}

impl HeadlessPage {
    pub fn new(viewport: Viewport, notices: mpsc::UnboundedSender<PageNotice>) -> Self {
        Self {
            viewport,
            mounted: false,
            visibility: UiVisibility::hidden(),
            crosshair: false,
            last_frame: None,
            toolbar_at: None,
            notices,
        }
    }

    pub fn last_frame(&self) -> Option<&OverlayFrame> {
        self.last_frame.as_ref()
    }

    fn notify(&self, notice: PageNotice) {
        if self.notices.send(notice).is_err() {
            log::debug!("[DESKTOP] Nobody listening for page notices");
        }
    }
}

impl PageSurface for HeadlessPage {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn overlay_attached(&self) -> bool {
        self.mounted
    }

    fn mount_overlay(&mut self) {
        self.mounted = true;
    }

    fn ui_visibility(&self) -> UiVisibility {
        self.visibility
    }

    fn set_ui_visibility(&mut self, visibility: UiVisibility) {
        self.visibility = visibility;
    }

    fn set_crosshair(&mut self, on: bool) {
        self.crosshair = on;
    }

    fn draw(&mut self, frame: &OverlayFrame) {
        if let Some(cutout) = frame.cutout {
            log::trace!(
                "[DESKTOP] Overlay cut-out {:.0},{:.0} {:.0}x{:.0}",
                cutout.left,
                cutout.top,
                cutout.width,
                cutout.height
            );
        }
        self.last_frame = Some(frame.clone());
    }

    fn place_toolbar(&mut self, at: Point) {
        self.toolbar_at = Some(at);
    }

    fn write_clipboard(&mut self, png: &[u8]) -> Result<(), PlatformError> {
        super::clipboard::write_png(png)
    }

    fn toast(&mut self, toast: Toast) {
        log::info!("[DESKTOP] Toast ({:?}): {}", toast.kind, toast.message);
        self.notify(PageNotice::Toast(toast));
    }

    fn play_sound(&mut self, sound: Sound) {
        let tone = sound.tone();
        log::debug!(
            "[DESKTOP] {:?} tone {}→{} Hz for {:?}",
            sound,
            tone.start_hz,
            tone.end_hz,
            tone.duration
        );
    }

    fn flash(&mut self, color: &str) {
        log::debug!("[DESKTOP] Flash {}", color);
    }
}
