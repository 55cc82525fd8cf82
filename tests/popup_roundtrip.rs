//! Popup, host, and a real capture agent wired over mailboxes on one
//! thread, the same way the desktop front end runs them.

mod common;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use common::{decode_png, gradient_data_uri, FakeBrowser, FakePage};

use snipping_tool_lib::agent::{CaptureAgent, PageEvent};
use snipping_tool_lib::config::SnipConfig;
use snipping_tool_lib::geometry::Point;
use snipping_tool_lib::host::HostController;
use snipping_tool_lib::messaging::{self, Mailbox, MessagingError};
use snipping_tool_lib::platform::{
    Browser, CaptureOptions, DownloadRequest, DownloadState, PlatformError,
};
use snipping_tool_lib::popup::PopupController;
use snipping_tool_lib::protocol::{AgentRequest, DownloadId, HostRequest, Response, TabId};
use snipping_tool_lib::storage::MemoryStorage;

type Agents = Rc<RefCell<HashMap<TabId, (Mailbox<AgentRequest>, mpsc::Sender<PageEvent>)>>>;

/// Browser whose tab 1 gets a live agent on `page` when injected. Platform
/// calls other than messaging go to the scripted fake.
#[derive(Clone)]
struct LiveBrowser {
    host: Mailbox<HostRequest>,
    page: FakePage,
    agents: Agents,
    platform: FakeBrowser,
}

impl LiveBrowser {
    fn input(&self, tab: TabId) -> mpsc::Sender<PageEvent> {
        self.agents.borrow()[&tab].1.clone()
    }
}

impl Browser for LiveBrowser {
    async fn active_tab(&self) -> Option<TabId> {
        Some(1)
    }

    async fn all_tabs(&self) -> Vec<TabId> {
        vec![1]
    }

    async fn send_to_tab(
        &self,
        tab: TabId,
        request: AgentRequest,
    ) -> Result<Response, MessagingError> {
        let mailbox = self
            .agents
            .borrow()
            .get(&tab)
            .map(|(mailbox, _)| mailbox.clone())
            .ok_or(MessagingError::ReceiverGone)?;
        mailbox.send(request).await
    }

    async fn inject_agent(&self, tab: TabId) -> Result<(), PlatformError> {
        let (mailbox, inbox) = messaging::mailbox(8);
        let (input, events) = mpsc::channel(8);
        let agent = CaptureAgent::attach(self.page.clone(), self.host.from_tab(tab));
        tokio::task::spawn_local(agent.run(inbox, events));
        self.agents.borrow_mut().insert(tab, (mailbox, input));
        Ok(())
    }

    async fn capture_visible_tab(
        &self,
        tab: TabId,
        options: CaptureOptions,
    ) -> Result<String, PlatformError> {
        self.platform.capture_visible_tab(tab, options).await
    }

    async fn write_clipboard_image(&self, png: &[u8]) -> Result<(), PlatformError> {
        self.platform.write_clipboard_image(png).await
    }

    async fn start_download(&self, request: DownloadRequest) -> Result<DownloadId, PlatformError> {
        self.platform.start_download(request).await
    }

    async fn wait_for_download(&self, id: DownloadId) -> DownloadState {
        self.platform.wait_for_download(id).await
    }

    async fn show_banner(&self, tab: TabId, message: &str) -> Result<(), PlatformError> {
        self.platform.show_banner(tab, message).await
    }

    fn set_action_enabled(&self, enabled: bool) {
        self.platform.set_action_enabled(enabled)
    }
}

struct Session {
    popup: PopupController,
    browser: LiveBrowser,
    page: FakePage,
}

/// Boots a host on a 1200×800 page whose screenshots come back at 2×.
/// Must be called inside a `LocalSet`.
fn boot() -> Session {
    let (host_mailbox, host_inbox) = messaging::mailbox(8);
    let (_commands, command_rx) = mpsc::channel(1);

    let page = FakePage::new(1200.0, 800.0);
    let platform = FakeBrowser::new();
    platform.state.borrow_mut().screenshot = gradient_data_uri(2400, 1600);
    let browser = LiveBrowser {
        host: host_mailbox.clone(),
        page: page.clone(),
        agents: Rc::new(RefCell::new(HashMap::new())),
        platform,
    };

    let config = SnipConfig {
        ready_delay: Duration::from_millis(10),
        probe_timeout: Duration::from_secs(1),
        data_dir: PathBuf::from("unused"),
        ..SnipConfig::default()
    };
    let mut host = HostController::new(browser.clone(), MemoryStorage::new(), config);
    host.init().unwrap();
    tokio::task::spawn_local(host.run(host_inbox, command_rx));

    Session {
        popup: PopupController::new(host_mailbox),
        browser,
        page,
    }
}

/// Lets the agent task run until the page has shown `count` toasts.
async fn wait_for_toasts(page: &FakePage, count: usize) {
    for _ in 0..500 {
        if page.state.borrow().toasts.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("page never showed {} toast(s)", count);
}

#[tokio::test]
async fn popup_start_then_drag_copies_region() {
    LocalSet::new()
        .run_until(async {
            let mut session = boot();
            session.popup.load().await;
            assert!(session.popup.view().enabled);

            let response = session.popup.start_snipping().await;
            assert!(response.success, "{:?}", response.error);
            assert_eq!(session.popup.view().status, "Snipping started");
            assert!(session.page.state.borrow().visibility.overlay);

            let input = session.browser.input(1);
            for event in [
                PageEvent::PointerDown(Point::new(100.0, 100.0)),
                PageEvent::PointerMove(Point::new(300.0, 200.0)),
                PageEvent::PointerUp(Point::new(300.0, 200.0)),
            ] {
                input.send(event).await.unwrap();
            }
            wait_for_toasts(&session.page, 1).await;

            let copied = decode_png(&session.page.state.borrow().clipboard[0]);
            assert_eq!(copied.dimensions(), (400, 200));

            let history = session.popup.history().await;
            assert_eq!(history.len(), 1);
            assert_eq!((history[0].width, history[0].height), (400, 200));

            let stats = session.popup.stats().await.unwrap();
            assert_eq!(stats.activations, 1);
            assert_eq!(stats.captures, 1);
        })
        .await;
}

#[tokio::test]
async fn disabling_from_popup_closes_overlay_and_blocks_start() {
    LocalSet::new()
        .run_until(async {
            let mut session = boot();
            session.popup.load().await;
            session.popup.start_snipping().await;
            assert!(session.page.state.borrow().visibility.overlay);

            let response = session.popup.toggle().await;
            assert!(response.success);
            assert!(!session.popup.view().enabled);
            assert_eq!(session.popup.view().status, "Snipping tool disabled");
            assert!(!session.page.state.borrow().visibility.any());

            let refused = session.popup.start_snipping().await;
            assert!(!refused.success);
            assert_eq!(session.popup.view().status, "Snipping tool is disabled");

            session.popup.toggle().await;
            assert!(session.popup.view().enabled);
            assert!(session.popup.start_snipping().await.success);
            assert!(session.page.state.borrow().visibility.overlay);
        })
        .await;
}

#[tokio::test]
async fn settings_change_reaches_live_agent() {
    LocalSet::new()
        .run_until(async {
            let mut session = boot();
            session.popup.start_snipping().await;

            let response = session
                .popup
                .update_setting("selectionColor", json!("#00FF00"))
                .await;
            assert!(response.success);
            assert_eq!(session.popup.view().settings.selection_color, "#00ff00");
            assert_eq!(session.popup.view().status, "Settings updated");

            let frame_color = session
                .page
                .state
                .borrow()
                .frames
                .last()
                .map(|frame| frame.border_color.clone());
            assert_eq!(frame_color.as_deref(), Some("#00ff00"));

            session.popup.update_setting("format", json!("gif")).await;
            assert_eq!(
                session.popup.view().settings.format,
                snipping_tool_lib::settings::ImageFormat::Png
            );
        })
        .await;
}
