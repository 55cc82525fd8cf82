//! Popup Controller — settings form and quick actions over the host mailbox.

use serde_json::{Map, Value};

use crate::host::history::{HistoryItem, UsageStats};
use crate::messaging::Mailbox;
use crate::protocol::{HostRequest, Response};
use crate::settings::Settings;

/// Last state the popup rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub enabled: bool,
    pub settings: Settings,
    pub status: String,
}

impl Default for PopupView {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: Settings::default(),
            status: String::new(),
        }
    }
}

pub struct PopupController {
    host: Mailbox<HostRequest>,
    view: PopupView,
}

impl PopupController {
    pub fn new(host: Mailbox<HostRequest>) -> Self {
        Self {
            host,
            view: PopupView::default(),
        }
    }

    pub fn view(&self) -> &PopupView {
        &self.view
    }

    /// Pulls settings and enablement from the host.
    pub async fn load(&mut self) -> &PopupView {
        let response = self.call(HostRequest::GetSettings).await;
        self.absorb(&response);
        &self.view
    }

    /// Starts snipping in the active tab. Does nothing while disabled.
    pub async fn start_snipping(&mut self) -> Response {
        if !self.view.enabled {
            self.view.status = "Snipping tool is disabled".to_string();
            return Response::failure(&self.view.status);
        }
        let response = self.call(HostRequest::ActivateSnipping).await;
        self.view.status = if response.success {
            "Snipping started".to_string()
        } else {
            format!("Failed to start snipping: {}", response.error_message())
        };
        response
    }

    pub async fn toggle(&mut self) -> Response {
        let response = self.call(HostRequest::ToggleSnipping).await;
        if response.success {
            self.view.enabled = response.is_enabled.unwrap_or(!self.view.enabled);
            self.view.status = if self.view.enabled {
                "Snipping tool enabled".to_string()
            } else {
                "Snipping tool disabled".to_string()
            };
        } else {
            self.view.status = "Failed to toggle tool".to_string();
        }
        response
    }

    /// Sends a single-field update, e.g. `("format", "jpeg")`.
    pub async fn update_setting(&mut self, key: &str, value: Value) -> Response {
        let mut patch = Map::new();
        patch.insert(key.to_string(), value);
        let response = self
            .call(HostRequest::UpdateSettings {
                settings: Value::Object(patch),
            })
            .await;
        self.absorb(&response);
        self.view.status = if response.success {
            "Settings updated".to_string()
        } else {
            "Failed to update settings".to_string()
        };
        response
    }

    pub async fn history(&mut self) -> Vec<HistoryItem> {
        self.call(HostRequest::GetHistory)
            .await
            .history
            .unwrap_or_default()
    }

    pub async fn stats(&mut self) -> Option<UsageStats> {
        self.call(HostRequest::GetUsageStats).await.stats
    }

    /// Raw request for callers that want the whole response.
    pub async fn call(&self, request: HostRequest) -> Response {
        match self.host.send(request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("[POPUP] Host unreachable: {}", e);
                Response::failure(e)
            }
        }
    }

    fn absorb(&mut self, response: &Response) {
        if let Some(settings) = &response.settings {
            self.view.settings = settings.clone();
        }
        if let Some(enabled) = response.is_enabled {
            self.view.enabled = enabled;
        }
    }
}
