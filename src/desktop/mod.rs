//! Desktop rendition — the primary display plays the part of the one open
//! tab, `xcap` takes the visible-tab screenshot, `arboard` is the
//! clipboard, and downloads are written to the user's download folder.
//!
//! Everything runs on one thread inside a `LocalSet`: one task for the
//! host and one per injected agent.

mod clipboard;
pub mod page;

pub use clipboard::hand_off as hand_off_clipboard;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::agent::{CaptureAgent, PageEvent};
use crate::capture::{data_uri, screenshot};
use crate::config::SnipConfig;
use crate::host::{Command, HostController};
use crate::messaging::{self, Mailbox, MessagingError, MAILBOX_CAPACITY};
use crate::platform::{
    Browser, CaptureOptions, ConflictAction, DownloadRequest, DownloadState, PlatformError,
};
use crate::popup::PopupController;
use crate::protocol::{AgentRequest, DownloadId, HostRequest, Response, TabId};
use crate::storage::FileStorage;
use page::{HeadlessPage, PageNotice};

/// The primary display's "tab".
pub const PRIMARY_TAB: TabId = 1;

/// Longest wait for an agent reply, covering a capture in flight.
const AGENT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

struct AgentHandle {
    mailbox: Mailbox<AgentRequest>,
    input: mpsc::Sender<PageEvent>,
}

struct Inner {
    host: Mailbox<HostRequest>,
    agents: RefCell<HashMap<TabId, AgentHandle>>,
    notices: mpsc::UnboundedSender<PageNotice>,
    download_dir: PathBuf,
    downloads: RefCell<HashMap<DownloadId, DownloadState>>,
    next_download: Cell<DownloadId>,
}

#[derive(Clone)]
pub struct DesktopBrowser {
    inner: Rc<Inner>,
}

impl DesktopBrowser {
    pub fn new(
        host: Mailbox<HostRequest>,
        notices: mpsc::UnboundedSender<PageNotice>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                agents: RefCell::new(HashMap::new()),
                notices,
                download_dir,
                downloads: RefCell::new(HashMap::new()),
                next_download: Cell::new(1),
            }),
        }
    }

    /// Input channel of the agent in `tab`, if one was injected.
    pub fn page_input(&self, tab: TabId) -> Option<mpsc::Sender<PageEvent>> {
        self.inner
            .agents
            .borrow()
            .get(&tab)
            .map(|handle| handle.input.clone())
    }

    fn agent_mailbox(&self, tab: TabId) -> Option<Mailbox<AgentRequest>> {
        self.inner
            .agents
            .borrow()
            .get(&tab)
            .map(|handle| handle.mailbox.clone())
            .filter(|mailbox| !mailbox.is_closed())
    }
}

impl Browser for DesktopBrowser {
    async fn active_tab(&self) -> Option<TabId> {
        Some(PRIMARY_TAB)
    }

    async fn all_tabs(&self) -> Vec<TabId> {
        vec![PRIMARY_TAB]
    }

    async fn send_to_tab(
        &self,
        tab: TabId,
        request: AgentRequest,
    ) -> Result<Response, MessagingError> {
        let mailbox = self.agent_mailbox(tab).ok_or(MessagingError::ReceiverGone)?;
        mailbox.send_timeout(request, AGENT_REPLY_TIMEOUT).await
    }

    async fn inject_agent(&self, tab: TabId) -> Result<(), PlatformError> {
        if tab != PRIMARY_TAB {
            return Err(PlatformError::new(format!("no such tab {}", tab)));
        }
        let viewport = screenshot::primary_viewport().map_err(|e| PlatformError::new(e.to_string()))?;

        let (mailbox, inbox) = messaging::mailbox(MAILBOX_CAPACITY);
        let (input, events) = mpsc::channel(MAILBOX_CAPACITY);
        let page = HeadlessPage::new(viewport, self.inner.notices.clone());
        let agent = CaptureAgent::attach(page, self.inner.host.from_tab(tab));

        tokio::task::spawn_local(agent.run(inbox, events));
        self.inner
            .agents
            .borrow_mut()
            .insert(tab, AgentHandle { mailbox, input });

        log::info!(
            "[DESKTOP] Agent injected into tab {} ({}x{} viewport)",
            tab,
            viewport.width,
            viewport.height
        );
        Ok(())
    }

    async fn capture_visible_tab(
        &self,
        _tab: TabId,
        _options: CaptureOptions,
    ) -> Result<String, PlatformError> {
        let png = tokio::task::spawn_blocking(screenshot::capture_primary_png)
            .await
            .map_err(|e| PlatformError::new(format!("Capture task failed: {}", e)))?
            .map_err(|e| PlatformError::new(e.to_string()))?;
        Ok(data_uri::encode_png(&png))
    }

    async fn write_clipboard_image(&self, png: &[u8]) -> Result<(), PlatformError> {
        clipboard::write_png(png)
    }

    async fn start_download(&self, request: DownloadRequest) -> Result<DownloadId, PlatformError> {
        let id = self.inner.next_download.get();
        self.inner.next_download.set(id + 1);

        let state = match write_download(&self.inner.download_dir, &request) {
            Ok(path) => {
                log::info!("[DESKTOP] Saved {}", path.display());
                DownloadState::Complete
            }
            Err(e) => DownloadState::Interrupted(e.to_string()),
        };
        self.inner.downloads.borrow_mut().insert(id, state);
        Ok(id)
    }

    async fn wait_for_download(&self, id: DownloadId) -> DownloadState {
        self.inner
            .downloads
            .borrow()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| DownloadState::Interrupted(format!("unknown download {}", id)))
    }

    async fn show_banner(&self, _tab: TabId, message: &str) -> Result<(), PlatformError> {
        log::warn!("[DESKTOP] Banner: {}", message);
        self.inner
            .notices
            .send(PageNotice::Banner(message.to_string()))
            .map_err(|_| PlatformError::new("no page to show the banner on"))
    }

    fn set_action_enabled(&self, enabled: bool) {
        log::debug!(
            "[DESKTOP] Action icon {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// Picks `dir/filename`, or `name (N).ext` when that exists and the
/// request asks to uniquify.
pub fn resolve_download_path(dir: &Path, filename: &str, conflict: ConflictAction) -> PathBuf {
    let candidate = dir.join(filename);
    if conflict == ConflictAction::Overwrite || !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| {
            let name = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            dir.join(name)
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn write_download(dir: &Path, request: &DownloadRequest) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = resolve_download_path(dir, &request.filename, request.conflict);
    std::fs::write(&path, &request.bytes)?;
    Ok(path)
}

/// Default download folder, falling back to the working directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// A booted desktop session. Must be created inside a `LocalSet`.
pub struct Desktop {
    pub popup: PopupController,
    pub browser: DesktopBrowser,
    pub commands: mpsc::Sender<Command>,
    pub notices: mpsc::UnboundedReceiver<PageNotice>,
}

impl Desktop {
    /// Starts the host task and returns handles to drive it.
    pub fn boot(config: SnipConfig) -> Result<Self, crate::SnipError> {
        let (host_mailbox, host_inbox) = messaging::mailbox(MAILBOX_CAPACITY);
        let (commands, command_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (notice_tx, notices) = mpsc::unbounded_channel();

        let browser = DesktopBrowser::new(host_mailbox.clone(), notice_tx, default_download_dir());
        let storage = FileStorage::new(config.data_dir.clone());
        log::info!("[DESKTOP] Storage at {}", storage.dir().display());

        let mut host = HostController::new(browser.clone(), storage, config);
        host.init()?;
        tokio::task::spawn_local(host.run(host_inbox, command_rx));

        Ok(Self {
            popup: PopupController::new(host_mailbox),
            browser,
            commands,
            notices,
        })
    }
}
