//! Host Controller — the extension's background side.
//!
//! Owns enablement and settings, makes sure a capture agent is live before
//! activating it, and performs the platform calls agents cannot: visible-tab
//! capture, mediated clipboard writes, downloads, and persistence.

pub mod download;
pub mod history;
pub mod readiness;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::capture::data_uri;
use crate::config::SnipConfig;
use crate::error::SnipError;
use crate::messaging::{Envelope, MessagingError};
use crate::platform::{Browser, CaptureOptions};
use crate::protocol::{AgentRequest, HostRequest, Response, TabId};
use crate::settings::Settings;
use crate::storage::{Storage, StorageArea};
use download::DownloadOutcome;
use history::{HistoryItem, UsageEvent, UsageStats};
use readiness::Readiness;

pub const ENABLED_KEY: &str = "isEnabled";
pub const SETTINGS_KEY: &str = "settings";

pub const INJECTION_BANNER: &str =
    "Snipping tool could not start on this page. Reload the page and try again.";
pub const CLIPBOARD_FALLBACK_HINT: &str =
    "Failed to save to clipboard. Please try downloading instead.";

/// User-level triggers that do not arrive as messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Keyboard shortcut: snip the active tab.
    ActivateSnipping,
    /// Keyboard shortcut: flip enablement.
    ToggleSnipping,
    /// Toolbar icon clicked while `tab` was active.
    IconClicked(TabId),
}

impl Command {
    /// Maps a keyboard-shortcut command name.
    pub fn from_shortcut(name: &str) -> Option<Self> {
        match name {
            "activate-snipping" => Some(Command::ActivateSnipping),
            "toggle-snipping" => Some(Command::ToggleSnipping),
            _ => None,
        }
    }
}

pub struct HostController<B, S> {
    browser: B,
    storage: S,
    config: SnipConfig,
    enabled: bool,
    settings: Settings,
}

impl<B: Browser, S: Storage> HostController<B, S> {
    pub fn new(browser: B, storage: S, config: SnipConfig) -> Self {
        Self {
            browser,
            storage,
            config,
            enabled: true,
            settings: Settings::default(),
        }
    }

    /// Loads persisted state, writing defaults for anything missing.
    pub fn init(&mut self) -> Result<(), SnipError> {
        self.enabled = self
            .storage
            .get(StorageArea::Sync, ENABLED_KEY)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        match self.storage.get(StorageArea::Sync, SETTINGS_KEY)? {
            Some(raw) => self.settings = Settings::from_value(&raw),
            None => {
                self.settings = Settings::default();
                self.persist_settings()?;
            }
        }

        self.browser.set_action_enabled(self.enabled);
        log::info!(
            "[HOST] Initialized (enabled={}, format={:?})",
            self.enabled,
            self.settings.format
        );
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn handle_command(&mut self, command: Command) -> Result<(), SnipError> {
        match command {
            Command::ActivateSnipping => self.activate_current_tab().await.map(|_| ()),
            Command::ToggleSnipping => self.toggle_enablement().await.map(|_| ()),
            Command::IconClicked(tab) => self.activate(tab).await.map(|_| ()),
        }
    }

    pub async fn activate_current_tab(&mut self) -> Result<bool, SnipError> {
        if !self.enabled {
            return Ok(false);
        }
        let tab = self.browser.active_tab().await.ok_or(SnipError::NoActiveTab)?;
        self.activate(tab).await
    }

    /// Activates snipping in `tab`, injecting the agent first if needed.
    ///
    /// Returns `Ok(false)` without doing anything while disabled. Sends
    /// exactly one activate message on success and none on failure.
    pub async fn activate(&mut self, tab: TabId) -> Result<bool, SnipError> {
        if !self.enabled {
            log::debug!("[HOST] Activation ignored, snipping disabled");
            return Ok(false);
        }

        let readiness = match readiness::ensure_agent(&self.browser, tab, &self.config).await {
            Ok(readiness) => readiness,
            Err(e) => {
                if matches!(e, SnipError::InjectionTimeout { .. }) {
                    if let Err(banner_err) = self.browser.show_banner(tab, INJECTION_BANNER).await
                    {
                        log::debug!("[HOST] Banner not shown in tab {}: {}", tab, banner_err);
                    }
                }
                log::error!("[HOST] Activation in tab {} failed: {}", tab, e);
                return Err(e);
            }
        };

        if let Readiness::Injected { .. } = readiness {
            // Fresh agents start from defaults; bring them up to date first.
            self.send_best_effort(
                tab,
                AgentRequest::SettingsUpdated {
                    settings: self.settings.clone(),
                },
            )
            .await;
            self.send_best_effort(
                tab,
                AgentRequest::ToggleState {
                    is_enabled: self.enabled,
                },
            )
            .await;
        }

        let limit = self.config.probe_timeout;
        let response = tokio::time::timeout(
            limit,
            self.browser.send_to_tab(tab, AgentRequest::ActivateSnipping),
        )
        .await
        .map_err(|_| MessagingError::TimedOut(limit))??;
        if !response.success {
            log::warn!("[HOST] Agent in tab {} refused activation", tab);
            return Err(SnipError::ActivationRejected(response.error_message()));
        }

        self.bump(UsageEvent::Activation);
        log::info!("[HOST] Snipping activated in tab {} ({:?})", tab, readiness);
        Ok(true)
    }

    /// Flips enablement, persists it, and tells every page.
    pub async fn toggle_enablement(&mut self) -> Result<bool, SnipError> {
        self.enabled = !self.enabled;
        self.storage
            .set(StorageArea::Sync, ENABLED_KEY, Value::Bool(self.enabled))?;
        self.browser.set_action_enabled(self.enabled);

        self.broadcast(AgentRequest::ToggleState {
            is_enabled: self.enabled,
        })
        .await;

        log::info!("[HOST] Snipping {}", if self.enabled { "enabled" } else { "disabled" });
        Ok(self.enabled)
    }

    /// Full-viewport screenshot of `tab` as a data URI.
    pub async fn capture_viewport(&mut self, tab: TabId) -> Result<String, SnipError> {
        let start = std::time::Instant::now();
        let screenshot = self
            .browser
            .capture_visible_tab(tab, CaptureOptions::max_quality())
            .await
            .map_err(|e| SnipError::CaptureFailed(e.to_string()))?;

        self.bump(UsageEvent::Capture);
        log::info!(
            "[HOST] Captured tab {} in {}ms ({} chars)",
            tab,
            start.elapsed().as_millis(),
            screenshot.len()
        );
        Ok(screenshot)
    }

    /// Clipboard write on behalf of an agent whose direct write failed.
    pub async fn save_to_clipboard(&mut self, image_data: &str) -> Result<(), SnipError> {
        let payload = data_uri::decode(image_data)?;
        self.browser
            .write_clipboard_image(&payload.bytes)
            .await
            .map_err(|e| {
                log::warn!("[HOST] Clipboard write failed: {}", e);
                SnipError::ClipboardUnavailable(CLIPBOARD_FALLBACK_HINT.to_string())
            })?;
        self.bump(UsageEvent::ClipboardWrite);
        Ok(())
    }

    pub async fn download_image(
        &mut self,
        image_data: &str,
        filename: Option<&str>,
    ) -> Result<DownloadOutcome, SnipError> {
        let outcome = download::download_image(
            &self.browser,
            image_data,
            filename,
            self.config.download_timeout,
        )
        .await?;
        self.bump(UsageEvent::Download);
        Ok(outcome)
    }

    /// Validate, persist, broadcast. Invalid fields fall back to defaults.
    pub async fn update_settings(&mut self, patch: &Value) -> Result<Settings, SnipError> {
        let previous_color = self.settings.selection_color.clone();
        self.settings.merge(patch);
        self.persist_settings()?;

        self.broadcast(AgentRequest::SettingsUpdated {
            settings: self.settings.clone(),
        })
        .await;
        if self.settings.selection_color != previous_color {
            self.broadcast(AgentRequest::SetColor {
                color: self.settings.selection_color.clone(),
            })
            .await;
        }
        Ok(self.settings.clone())
    }

    pub fn history(&self) -> Result<Vec<HistoryItem>, SnipError> {
        Ok(history::load_history(&self.storage)?)
    }

    pub fn save_history(&mut self, items: Vec<HistoryItem>) -> Result<Vec<HistoryItem>, SnipError> {
        let items = history::normalize(items, self.config.history_limit);
        history::store_history(&self.storage, &items)?;
        Ok(items)
    }

    pub fn usage_stats(&self) -> Result<UsageStats, SnipError> {
        Ok(history::load_stats(&self.storage)?)
    }

    /// Answers one message. Failures become `{success: false, error}`.
    pub async fn handle_message(&mut self, request: HostRequest, origin: Option<TabId>) -> Response {
        log::debug!("[HOST] <- {} from {:?}", request.action(), origin);
        match request {
            HostRequest::ActivateSnipping => {
                let result = self.activate_current_tab().await;
                let enabled = self.enabled;
                Response::from_result(result, |_| Response {
                    is_enabled: Some(enabled),
                    ..Response::ok()
                })
            }
            HostRequest::ToggleSnipping => {
                Response::from_result(self.toggle_enablement().await, |enabled| Response {
                    is_enabled: Some(enabled),
                    ..Response::ok()
                })
            }
            HostRequest::CaptureScreenshot => {
                let tab = match origin {
                    Some(tab) => Some(tab),
                    None => self.browser.active_tab().await,
                };
                let result = match tab {
                    Some(tab) => self.capture_viewport(tab).await,
                    None => Err(SnipError::NoActiveTab),
                };
                Response::from_result(result, |screenshot| Response {
                    screenshot: Some(screenshot),
                    ..Response::ok()
                })
            }
            HostRequest::SaveToClipboard { image_data } => {
                Response::from_result(self.save_to_clipboard(&image_data).await, |_| {
                    Response::ok()
                })
            }
            HostRequest::DownloadImage {
                image_data,
                filename,
            } => Response::from_result(
                self.download_image(&image_data, filename.as_deref()).await,
                |outcome| Response {
                    download_id: Some(outcome.id()),
                    ..Response::ok()
                },
            ),
            HostRequest::GetSettings => self.settings_response(),
            HostRequest::UpdateSettings { settings } => {
                match self.update_settings(&settings).await {
                    Ok(_) => self.settings_response(),
                    Err(e) => Response::failure(e),
                }
            }
            HostRequest::GetHistory => Response::from_result(self.history(), |history| Response {
                history: Some(history),
                ..Response::ok()
            }),
            HostRequest::SaveHistory { history } => {
                Response::from_result(self.save_history(history), |history| Response {
                    history: Some(history),
                    ..Response::ok()
                })
            }
            HostRequest::GetUsageStats => {
                Response::from_result(self.usage_stats(), |stats| Response {
                    stats: Some(stats),
                    ..Response::ok()
                })
            }
        }
    }

    /// Event loop: messages from agents and the popup, plus user commands.
    /// Returns when both inputs are closed.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Envelope<HostRequest>>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        log::info!("[HOST] Listening for messages");
        loop {
            tokio::select! {
                Some(envelope) = inbox.recv() => {
                    let (request, origin, replier) = envelope.into_parts();
                    let response = self.handle_message(request, origin).await;
                    replier.respond(response);
                }
                Some(command) = commands.recv() => {
                    if let Err(e) = self.handle_command(command).await {
                        log::error!("[HOST] {:?} failed: {}", command, e);
                    }
                }
                else => break,
            }
        }
        log::info!("[HOST] Stopped");
    }

    fn settings_response(&self) -> Response {
        Response {
            settings: Some(self.settings.clone()),
            is_enabled: Some(self.enabled),
            ..Response::ok()
        }
    }

    fn persist_settings(&self) -> Result<(), SnipError> {
        let value = serde_json::to_value(&self.settings).unwrap_or_default();
        self.storage.set(StorageArea::Sync, SETTINGS_KEY, value)?;
        Ok(())
    }

    fn bump(&self, event: UsageEvent) {
        if let Err(e) = history::bump(&self.storage, event) {
            log::warn!("[HOST] Usage counter not saved: {}", e);
        }
    }

    async fn send_best_effort(&self, tab: TabId, request: AgentRequest) {
        let action = request.action();
        match tokio::time::timeout(
            self.config.probe_timeout,
            self.browser.send_to_tab(tab, request),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::debug!("[HOST] {} not delivered to tab {}: {}", action, tab, e),
            Err(_) => log::debug!("[HOST] {} to tab {} timed out", action, tab),
        }
    }

    /// Sends to every open tab. Tabs without an agent are expected and
    /// silently skipped.
    async fn broadcast(&self, request: AgentRequest) {
        for tab in self.browser.all_tabs().await {
            self.send_best_effort(tab, request.clone()).await;
        }
    }
}
