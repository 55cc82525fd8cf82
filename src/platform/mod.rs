//! Seams to the platform — the black boxes the controllers drive.
//!
//! `Browser` is what the host sees (tabs, capture, clipboard, downloads,
//! injection). `PageSurface` is what an agent sees (its page's overlay DOM,
//! direct clipboard, feedback). `HostLink` is the agent's channel to the host.

#![allow(async_fn_in_trait)]

use crate::agent::feedback::{Sound, Toast};
use crate::agent::overlay::{OverlayFrame, UiVisibility};
use crate::geometry::{Point, Viewport};
use crate::messaging::MessagingError;
use crate::protocol::{AgentRequest, DownloadId, HostRequest, Response, TabId};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// What to do when the download target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Uniquify,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub conflict: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    InProgress,
    Complete,
    Interrupted(String),
}

/// Encoding requested from the visible-tab capture API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub quality: u8,
}

impl CaptureOptions {
    /// Lossless PNG at maximum quality.
    pub fn max_quality() -> Self {
        Self { quality: 100 }
    }
}

/// Host-side platform APIs.
pub trait Browser {
    async fn active_tab(&self) -> Option<TabId>;

    async fn all_tabs(&self) -> Vec<TabId>;

    async fn send_to_tab(
        &self,
        tab: TabId,
        request: AgentRequest,
    ) -> Result<Response, MessagingError>;

    /// Injects the capture agent's script and stylesheet into `tab`.
    async fn inject_agent(&self, tab: TabId) -> Result<(), PlatformError>;

    /// Full-viewport bitmap of `tab` as an image data URI.
    async fn capture_visible_tab(
        &self,
        tab: TabId,
        options: CaptureOptions,
    ) -> Result<String, PlatformError>;

    async fn write_clipboard_image(&self, png: &[u8]) -> Result<(), PlatformError>;

    async fn start_download(&self, request: DownloadRequest) -> Result<DownloadId, PlatformError>;

    /// Resolves once `id` reaches a terminal state.
    async fn wait_for_download(&self, id: DownloadId) -> DownloadState;

    /// Best-effort in-page failure banner.
    async fn show_banner(&self, tab: TabId, message: &str) -> Result<(), PlatformError>;

    /// Reflects enablement on the toolbar icon.
    fn set_action_enabled(&self, enabled: bool);
}

/// Agent-side view of its page.
pub trait PageSurface {
    fn viewport(&self) -> Viewport;

    /// Whether the overlay node is present in the document.
    fn overlay_attached(&self) -> bool;

    fn mount_overlay(&mut self);

    fn ui_visibility(&self) -> UiVisibility;

    fn set_ui_visibility(&mut self, visibility: UiVisibility);

    fn set_crosshair(&mut self, on: bool);

    fn draw(&mut self, frame: &OverlayFrame);

    fn place_toolbar(&mut self, at: Point);

    /// Direct page clipboard write; `Err` when unavailable or not permitted.
    fn write_clipboard(&mut self, png: &[u8]) -> Result<(), PlatformError>;

    fn toast(&mut self, toast: Toast);

    fn play_sound(&mut self, sound: Sound);

    fn flash(&mut self, color: &str);
}

/// The agent's request channel to the host.
pub trait HostLink {
    async fn request(&self, request: HostRequest) -> Result<Response, MessagingError>;
}
