//! Capture Agent — the per-page side of the snipping tool.
//!
//! Owns the overlay and the capture session for one page. State machine:
//!
//! ```text
//! Idle --activate--> Selecting --down--> Dragging --up(valid)--> Captured
//!                        ^                   |
//!                        +----up(invalid)----+
//! Selecting/Captured --Escape/cancel--> Idle
//! Captured --Enter/download--> Idle
//! any --toggle-state(disabled)--> Idle
//! ```

pub mod feedback;
pub mod overlay;
pub mod pipeline;

use tokio::sync::mpsc;

use crate::capture;
use crate::error::SnipError;
use crate::geometry::{Point, Selection};
use crate::host::download::default_filename;
use crate::host::history::HistoryItem;
use crate::messaging::Envelope;
use crate::platform::{HostLink, PageSurface};
use crate::protocol::{AgentRequest, HostRequest, Response};
use crate::settings::{self, ImageFormat, Settings};
use feedback::{Sound, Toast};
use overlay::{OverlayFrame, UiVisibility};
use pipeline::CapturedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selecting,
    Dragging,
    Captured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    /// A character pressed with Ctrl held.
    Ctrl(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarButton {
    Copy,
    Download,
    Cancel,
}

/// Input from the page, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Key(Key),
    Toolbar(ToolbarButton),
}

/// Transient state of one snipping session. Cleared on deactivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub phase: Phase,
    pub selection: Option<Selection>,
    pub last_image: Option<CapturedImage>,
}

impl Session {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            selection: None,
            last_image: None,
        }
    }
}

pub struct CaptureAgent<P, H> {
    page: P,
    host: H,
    enabled: bool,
    settings: Settings,
    session: Session,
}

impl<P: PageSurface, H: HostLink> CaptureAgent<P, H> {
    /// Attaches to `page`, mounting the overlay unless one already exists.
    pub fn attach(mut page: P, host: H) -> Self {
        if page.overlay_attached() {
            log::debug!("[AGENT] Overlay already present, reusing it");
        } else {
            page.mount_overlay();
        }
        page.set_ui_visibility(UiVisibility::hidden());
        Self {
            page,
            host,
            enabled: true,
            settings: Settings::default(),
            session: Session::idle(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn is_active(&self) -> bool {
        self.session.phase != Phase::Idle
    }

    pub fn is_selecting(&self) -> bool {
        self.session.phase == Phase::Dragging
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Answers a host message. Never awaits, so it cannot interleave with
    /// another handler.
    pub fn handle_message(&mut self, request: AgentRequest) -> Response {
        log::debug!("[AGENT] <- {}", request.action());
        match request {
            AgentRequest::ActivateSnipping => {
                if self.enabled {
                    self.activate();
                } else {
                    log::info!("[AGENT] Activation ignored, snipping disabled");
                }
                Response::ok()
            }
            AgentRequest::Ping => Response::pong(
                self.is_active(),
                self.enabled,
                self.page.overlay_attached(),
            ),
            AgentRequest::ToggleState { is_enabled } => {
                self.enabled = is_enabled;
                if !is_enabled {
                    self.deactivate();
                }
                Response::ok()
            }
            AgentRequest::SettingsUpdated { settings } => {
                self.settings = settings;
                self.redraw();
                Response::ok()
            }
            AgentRequest::SetColor { color } => {
                if !settings::is_valid_color(&color) {
                    return Response::failure(format!("invalid color {:?}", color));
                }
                self.settings.selection_color = color.to_lowercase();
                self.redraw();
                Response::ok()
            }
        }
    }

    pub async fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::PointerDown(at) => self.pointer_down(at),
            PageEvent::PointerMove(at) => self.pointer_move(at),
            PageEvent::PointerUp(at) => self.pointer_up(at).await,
            PageEvent::Key(key) => self.key_down(key).await,
            PageEvent::Toolbar(button) => self.toolbar(button).await,
        }
    }

    /// Shows the overlay with an empty selection. No-op if already active.
    pub fn activate(&mut self) {
        if self.is_active() {
            return;
        }
        self.session = Session {
            phase: Phase::Selecting,
            ..Session::idle()
        };
        self.page.set_ui_visibility(UiVisibility {
            overlay: true,
            selection: false,
            toolbar: false,
        });
        self.page.set_crosshair(true);
        self.redraw();
        log::info!("[AGENT] Snipping active");
    }

    /// Hides everything and forgets the session, whatever state it was in.
    pub fn deactivate(&mut self) {
        let was_active = self.is_active();
        self.session = Session::idle();
        self.page.set_ui_visibility(UiVisibility::hidden());
        self.page.set_crosshair(false);
        if was_active {
            log::info!("[AGENT] Snipping closed");
        }
    }

    pub fn pointer_down(&mut self, at: Point) {
        if !matches!(self.session.phase, Phase::Selecting | Phase::Captured) {
            return;
        }
        self.session.phase = Phase::Dragging;
        self.session.selection = Some(Selection::anchored(at));
        self.session.last_image = None;
        self.page.set_ui_visibility(UiVisibility {
            overlay: true,
            selection: true,
            toolbar: false,
        });
        self.redraw();
    }

    pub fn pointer_move(&mut self, at: Point) {
        if self.session.phase != Phase::Dragging {
            return;
        }
        if let Some(selection) = self.session.selection.as_mut() {
            selection.drag_to(at);
        }
        self.redraw();
    }

    /// Ends the drag. A valid selection is captured and copied right away;
    /// anything smaller brings up the manual toolbar.
    pub async fn pointer_up(&mut self, at: Point) {
        if self.session.phase != Phase::Dragging {
            return;
        }
        let Some(selection) = self.session.selection.as_mut() else {
            return;
        };
        selection.drag_to(at);
        let selection = *selection;
        self.redraw();

        if selection.has_selection() {
            if self.ensure_captured().await.is_some() {
                self.copy_to_clipboard().await;
            }
        } else {
            self.session.phase = Phase::Selecting;
            self.show_toolbar();
        }
    }

    pub async fn key_down(&mut self, key: Key) {
        if !self.is_active() {
            return;
        }
        match key {
            Key::Escape => self.deactivate(),
            Key::Enter => {
                if self.session.phase == Phase::Captured || self.has_valid_selection() {
                    self.download().await;
                }
            }
            Key::Ctrl('c') => self.copy_to_clipboard().await,
            Key::Ctrl('d') => self.download().await,
            Key::Ctrl('b') => self.download_all_formats().await,
            Key::Ctrl(_) | Key::Other => {}
        }
    }

    pub async fn toolbar(&mut self, button: ToolbarButton) {
        if !self.is_active() {
            return;
        }
        match button {
            ToolbarButton::Copy => self.copy_to_clipboard().await,
            ToolbarButton::Download => self.download().await,
            ToolbarButton::Cancel => self.deactivate(),
        }
    }

    /// Copies the capture, direct clipboard first, host second.
    /// Stays in `Captured` so the user can still download.
    pub async fn copy_to_clipboard(&mut self) {
        let Some(image) = self.ensure_captured().await else {
            return;
        };

        let toast = match self.page.write_clipboard(&image.png) {
            Ok(()) => Toast::success("Screenshot saved to clipboard!"),
            Err(direct_err) => {
                log::warn!("[AGENT] Direct clipboard write failed: {}", direct_err);
                match self
                    .host
                    .request(HostRequest::SaveToClipboard {
                        image_data: image.data_uri(),
                    })
                    .await
                {
                    Ok(response) if response.success => {
                        Toast::success("Screenshot saved to clipboard!")
                    }
                    Ok(response) => {
                        log::warn!("[AGENT] Host clipboard write failed: {}", response.error_message());
                        Toast::error("Clipboard unavailable. Press Enter to download instead.")
                    }
                    Err(e) => {
                        log::warn!("[AGENT] Host clipboard write failed: {}", e);
                        Toast::error("Clipboard unavailable. Press Enter to download instead.")
                    }
                }
            }
        };
        feedback::report(&mut self.page, &self.settings, toast);
    }

    /// Downloads the capture through the host, then closes the session.
    pub async fn download(&mut self) {
        let Some(image) = self.ensure_captured().await else {
            return;
        };

        let toast = match self.request_download(&image, self.settings.format).await {
            Ok(()) => Toast::success("Screenshot downloaded!"),
            Err(e) => {
                log::error!("[AGENT] Download failed: {}", e);
                Toast::error("Failed to download screenshot")
            }
        };
        feedback::report(&mut self.page, &self.settings, toast);
        self.deactivate();
    }

    /// Saves the capture as PNG and as JPEG, then closes the session.
    pub async fn download_all_formats(&mut self) {
        let Some(image) = self.ensure_captured().await else {
            return;
        };

        let mut failed = false;
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            if let Err(e) = self.request_download(&image, format).await {
                log::error!("[AGENT] {:?} download failed: {}", format, e);
                failed = true;
            }
        }
        let toast = if failed {
            Toast::error("Failed to download screenshot")
        } else {
            Toast::success("Saved in multiple formats!")
        };
        feedback::report(&mut self.page, &self.settings, toast);
        self.deactivate();
    }

    /// Event loop for this page: host messages and page input.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Envelope<AgentRequest>>,
        mut events: mpsc::Receiver<PageEvent>,
    ) {
        loop {
            tokio::select! {
                Some(envelope) = inbox.recv() => {
                    let (request, _, replier) = envelope.into_parts();
                    replier.respond(self.handle_message(request));
                }
                Some(event) = events.recv() => self.handle_event(event).await,
                else => break,
            }
        }
        log::debug!("[AGENT] Page closed");
    }

    fn has_valid_selection(&self) -> bool {
        self.session
            .selection
            .is_some_and(|selection| selection.has_selection())
    }

    /// The current capture, taking it first if needed. On failure the user
    /// has been told and the selection UI is back.
    async fn ensure_captured(&mut self) -> Option<CapturedImage> {
        if self.session.phase == Phase::Captured {
            if let Some(image) = &self.session.last_image {
                return Some(image.clone());
            }
        }

        let Some(selection) = self.session.selection.filter(|s| s.has_selection()) else {
            feedback::report(
                &mut self.page,
                &self.settings,
                Toast::error("Select a larger area first"),
            );
            return None;
        };

        match pipeline::capture_region(&mut self.page, &self.host, selection.rect()).await {
            Ok(image) => {
                if self.settings.sound_enabled {
                    self.page.play_sound(Sound::Capture);
                }
                self.session.phase = Phase::Captured;
                self.session.last_image = Some(image.clone());
                self.record_history(&image).await;
                Some(image)
            }
            Err(e) => {
                log::error!("[AGENT] Capture failed: {}", e);
                self.session.phase = Phase::Selecting;
                self.show_toolbar();
                feedback::report(
                    &mut self.page,
                    &self.settings,
                    Toast::error(capture_failure_message(&e)),
                );
                None
            }
        }
    }

    async fn request_download(
        &mut self,
        image: &CapturedImage,
        format: ImageFormat,
    ) -> Result<(), SnipError> {
        let bytes = capture::encode_for_download(&image.png, format, self.settings.quality)?;
        let response = self
            .host
            .request(HostRequest::DownloadImage {
                image_data: capture::data_uri::encode(format.mime(), &bytes),
                filename: Some(default_filename(format.extension())),
            })
            .await?;
        if response.success {
            Ok(())
        } else {
            Err(SnipError::DownloadInterrupted(response.error_message()))
        }
    }

    /// Prepends this capture to the host's history. Best effort.
    async fn record_history(&mut self, image: &CapturedImage) {
        let mut history = match self.host.request(HostRequest::GetHistory).await {
            Ok(response) if response.success => response.history.unwrap_or_default(),
            Ok(response) => {
                log::debug!("[AGENT] History unavailable: {}", response.error_message());
                return;
            }
            Err(e) => {
                log::debug!("[AGENT] History unavailable: {}", e);
                return;
            }
        };

        let item = HistoryItem::new(image.width, image.height, ImageFormat::Png, &image.png);
        history.insert(0, item);
        if let Err(e) = self.host.request(HostRequest::SaveHistory { history }).await {
            log::debug!("[AGENT] History not saved: {}", e);
        }
    }

    fn show_toolbar(&mut self) {
        let Some(selection) = self.session.selection else {
            return;
        };
        self.page.place_toolbar(overlay::toolbar_anchor(selection.rect()));
        let mut visibility = self.page.ui_visibility();
        visibility.toolbar = true;
        self.page.set_ui_visibility(visibility);
    }

    fn redraw(&mut self) {
        if !self.is_active() {
            return;
        }
        let viewport = self.page.viewport();
        let color = self.settings.selection_color.as_str();
        let frame = match self.session.selection {
            Some(selection) => OverlayFrame::dragging(viewport, selection.rect(), color),
            None => OverlayFrame::idle(viewport, color),
        };
        self.page.draw(&frame);
    }
}

fn capture_failure_message(err: &SnipError) -> String {
    match err {
        SnipError::InvalidCropDimensions { .. } => "Selection is too small to capture".to_string(),
        _ => "Failed to capture screenshot".to_string(),
    }
}
