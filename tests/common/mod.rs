//! Scriptable fakes for the platform seams.
//!
//! State lives behind `Rc<RefCell<..>>` so a test keeps a handle after the
//! fake has been moved into a controller, and so the fake host can look at
//! the page while a capture request is in flight.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::rc::Rc;

use image::{DynamicImage, Rgba, RgbaImage};

use snipping_tool_lib::agent::feedback::{Sound, Toast};
use snipping_tool_lib::agent::overlay::{OverlayFrame, UiVisibility};
use snipping_tool_lib::capture::data_uri;
use snipping_tool_lib::geometry::{Point, Viewport};
use snipping_tool_lib::host::history::HistoryItem;
use snipping_tool_lib::messaging::MessagingError;
use snipping_tool_lib::platform::{
    Browser, CaptureOptions, DownloadRequest, DownloadState, HostLink, PageSurface, PlatformError,
};
use snipping_tool_lib::protocol::{AgentRequest, DownloadId, HostRequest, Response, TabId};

/// Gradient where pixel (x, y) is `[x % 256, y % 256, 0, 255]`, so a crop
/// can be checked against the source coordinates it came from.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255]))
}

pub fn png_bytes(image: RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub fn gradient_data_uri(width: u32, height: u32) -> String {
    data_uri::encode_png(&png_bytes(gradient(width, height)))
}

pub fn decode_png(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

// ── Page ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PageState {
    pub viewport: Viewport,
    pub mounted: bool,
    pub visibility: UiVisibility,
    pub crosshair: bool,
    pub frames: Vec<OverlayFrame>,
    pub toolbar_at: Option<Point>,
    pub clipboard_works: bool,
    pub clipboard: Vec<Vec<u8>>,
    pub toasts: Vec<Toast>,
    pub sounds: Vec<Sound>,
    pub flashes: Vec<String>,
}

impl PageState {
    pub fn last_toast(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}

#[derive(Clone)]
pub struct FakePage {
    pub state: Rc<RefCell<PageState>>,
}

impl FakePage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                viewport: Viewport::new(width, height),
                mounted: false,
                visibility: UiVisibility::hidden(),
                crosshair: false,
                frames: Vec::new(),
                toolbar_at: None,
                clipboard_works: true,
                clipboard: Vec::new(),
                toasts: Vec::new(),
                sounds: Vec::new(),
                flashes: Vec::new(),
            })),
        }
    }

    pub fn without_clipboard(self) -> Self {
        self.state.borrow_mut().clipboard_works = false;
        self
    }
}

impl PageSurface for FakePage {
    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    fn overlay_attached(&self) -> bool {
        self.state.borrow().mounted
    }

    fn mount_overlay(&mut self) {
        self.state.borrow_mut().mounted = true;
    }

    fn ui_visibility(&self) -> UiVisibility {
        self.state.borrow().visibility
    }

    fn set_ui_visibility(&mut self, visibility: UiVisibility) {
        self.state.borrow_mut().visibility = visibility;
    }

    fn set_crosshair(&mut self, on: bool) {
        self.state.borrow_mut().crosshair = on;
    }

    fn draw(&mut self, frame: &OverlayFrame) {
        self.state.borrow_mut().frames.push(frame.clone());
    }

    fn place_toolbar(&mut self, at: Point) {
        self.state.borrow_mut().toolbar_at = Some(at);
    }

    fn write_clipboard(&mut self, png: &[u8]) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if !state.clipboard_works {
            return Err(PlatformError::new("Document is not focused"));
        }
        state.clipboard.push(png.to_vec());
        Ok(())
    }

    fn toast(&mut self, toast: Toast) {
        self.state.borrow_mut().toasts.push(toast);
    }

    fn play_sound(&mut self, sound: Sound) {
        self.state.borrow_mut().sounds.push(sound);
    }

    fn flash(&mut self, color: &str) {
        self.state.borrow_mut().flashes.push(color.to_string());
    }
}

// ── Host, as seen by an agent ─────────────────────────────────────

#[derive(Debug, Default)]
pub struct HostState {
    pub screenshot: Option<String>,
    pub clipboard_works: bool,
    pub download_works: bool,
    pub requests: Vec<HostRequest>,
    pub history: Vec<HistoryItem>,
    /// Page visibility observed while each capture request was in flight.
    pub visibility_at_capture: Vec<UiVisibility>,
}

#[derive(Clone)]
pub struct FakeHost {
    pub state: Rc<RefCell<HostState>>,
    page: Option<Rc<RefCell<PageState>>>,
}

impl FakeHost {
    /// A host that answers captures with `screenshot`.
    pub fn serving(screenshot: String) -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                screenshot: Some(screenshot),
                clipboard_works: true,
                download_works: true,
                ..HostState::default()
            })),
            page: None,
        }
    }

    /// Lets the host observe `page` during capture requests.
    pub fn watching(mut self, page: &FakePage) -> Self {
        self.page = Some(page.state.clone());
        self
    }

    pub fn requests(&self) -> Vec<HostRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.action() == action)
            .count()
    }
}

impl HostLink for FakeHost {
    async fn request(&self, request: HostRequest) -> Result<Response, MessagingError> {
        // Yield once so the exchange behaves like a real message hop.
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());
        let response = match request {
            HostRequest::CaptureScreenshot => {
                if let Some(page) = &self.page {
                    let visibility = page.borrow().visibility;
                    state.visibility_at_capture.push(visibility);
                }
                match &state.screenshot {
                    Some(shot) => Response {
                        screenshot: Some(shot.clone()),
                        ..Response::ok()
                    },
                    None => Response::failure("Cannot access contents of the page"),
                }
            }
            HostRequest::SaveToClipboard { .. } => {
                if state.clipboard_works {
                    Response::ok()
                } else {
                    Response::failure("Failed to save to clipboard. Please try downloading instead.")
                }
            }
            HostRequest::DownloadImage { .. } => {
                if state.download_works {
                    Response {
                        download_id: Some(1),
                        ..Response::ok()
                    }
                } else {
                    Response::failure("Download interrupted: NETWORK_FAILED")
                }
            }
            HostRequest::GetHistory => Response {
                history: Some(state.history.clone()),
                ..Response::ok()
            },
            HostRequest::SaveHistory { history } => {
                state.history = history.clone();
                Response {
                    history: Some(history),
                    ..Response::ok()
                }
            }
            _ => Response::ok(),
        };
        Ok(response)
    }
}

// ── Browser, as seen by the host ──────────────────────────────────

/// How a download started through the fake browser ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadScript {
    Complete,
    Interrupted,
    /// Never reaches a terminal state.
    Hang,
}

#[derive(Debug)]
pub struct BrowserState {
    pub tabs: Vec<TabId>,
    pub active: Option<TabId>,
    /// Agents already running before the host looks.
    pub loaded: Vec<TabId>,
    /// Tabs the agent was injected into.
    pub injected: Vec<TabId>,
    /// Injected agents report ready on this retry probe (1-based);
    /// `None` means never.
    pub ready_on_probe: Option<u32>,
    pub probes_after_injection: u32,
    /// Agents answer `activate-snipping` with a failure.
    pub reject_activation: bool,
    pub sent: Vec<(TabId, AgentRequest)>,
    pub banners: Vec<(TabId, String)>,
    pub screenshot: String,
    pub clipboard_works: bool,
    pub clipboard: Vec<Vec<u8>>,
    pub download: DownloadScript,
    pub downloads: Vec<DownloadRequest>,
    pub action_enabled: Option<bool>,
}

#[derive(Clone)]
pub struct FakeBrowser {
    pub state: Rc<RefCell<BrowserState>>,
    next_download: Rc<Cell<DownloadId>>,
}

impl FakeBrowser {
    /// One tab (id 1), active, with no agent loaded yet.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BrowserState {
                tabs: vec![1],
                active: Some(1),
                loaded: Vec::new(),
                injected: Vec::new(),
                ready_on_probe: Some(1),
                probes_after_injection: 0,
                reject_activation: false,
                sent: Vec::new(),
                banners: Vec::new(),
                screenshot: gradient_data_uri(40, 30),
                clipboard_works: true,
                clipboard: Vec::new(),
                download: DownloadScript::Complete,
                downloads: Vec::new(),
                action_enabled: None,
            })),
            next_download: Rc::new(Cell::new(1)),
        }
    }

    pub fn with_loaded_agent(self, tab: TabId) -> Self {
        self.state.borrow_mut().loaded.push(tab);
        self
    }

    pub fn ready_on_probe(self, probe: Option<u32>) -> Self {
        self.state.borrow_mut().ready_on_probe = probe;
        self
    }

    /// Agent messages sent to `tab`, by action name.
    pub fn actions_sent(&self, tab: TabId) -> Vec<&'static str> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(t, _)| *t == tab)
            .map(|(_, req)| req.action())
            .collect()
    }

    pub fn count_sent(&self, action: &str) -> usize {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(_, req)| req.action() == action)
            .count()
    }
}

impl Browser for FakeBrowser {
    async fn active_tab(&self) -> Option<TabId> {
        self.state.borrow().active
    }

    async fn all_tabs(&self) -> Vec<TabId> {
        self.state.borrow().tabs.clone()
    }

    async fn send_to_tab(
        &self,
        tab: TabId,
        request: AgentRequest,
    ) -> Result<Response, MessagingError> {
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        let loaded = state.loaded.contains(&tab);
        let injected = state.injected.contains(&tab);
        if !loaded && !injected {
            return Err(MessagingError::ReceiverGone);
        }
        state.sent.push((tab, request.clone()));

        match request {
            AgentRequest::Ping if loaded => Ok(Response::pong(false, true, true)),
            AgentRequest::Ping => {
                state.probes_after_injection += 1;
                let probes = state.probes_after_injection;
                let ready = state.ready_on_probe.is_some_and(|n| probes >= n);
                Ok(Response::pong(false, true, ready))
            }
            AgentRequest::ActivateSnipping if state.reject_activation => {
                Ok(Response::failure("Snipping is disabled on this page"))
            }
            _ => Ok(Response::ok()),
        }
    }

    async fn inject_agent(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if !state.tabs.contains(&tab) {
            return Err(PlatformError::new(format!("No tab with id: {}", tab)));
        }
        state.injected.push(tab);
        Ok(())
    }

    async fn capture_visible_tab(
        &self,
        _tab: TabId,
        _options: CaptureOptions,
    ) -> Result<String, PlatformError> {
        Ok(self.state.borrow().screenshot.clone())
    }

    async fn write_clipboard_image(&self, png: &[u8]) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if !state.clipboard_works {
            return Err(PlatformError::new("Write permission denied"));
        }
        state.clipboard.push(png.to_vec());
        Ok(())
    }

    async fn start_download(&self, request: DownloadRequest) -> Result<DownloadId, PlatformError> {
        let id = self.next_download.get();
        self.next_download.set(id + 1);
        self.state.borrow_mut().downloads.push(request);
        Ok(id)
    }

    async fn wait_for_download(&self, _id: DownloadId) -> DownloadState {
        let script = self.state.borrow().download;
        match script {
            DownloadScript::Complete => DownloadState::Complete,
            DownloadScript::Interrupted => DownloadState::Interrupted("NETWORK_FAILED".to_string()),
            DownloadScript::Hang => std::future::pending::<DownloadState>().await,
        }
    }

    async fn show_banner(&self, tab: TabId, message: &str) -> Result<(), PlatformError> {
        self.state
            .borrow_mut()
            .banners
            .push((tab, message.to_string()));
        Ok(())
    }

    fn set_action_enabled(&self, enabled: bool) {
        self.state.borrow_mut().action_enabled = Some(enabled);
    }
}
