//! Message protocol between host, capture agents, and the popup.
//!
//! Requests are tagged by `action`; each receiver gets its own enum so the
//! handler match is exhaustive. Responses share one flat record whose
//! optional fields depend on the action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::history::{HistoryItem, UsageStats};
use crate::settings::Settings;

pub type TabId = u32;
pub type DownloadId = u64;

/// Messages handled by the Host Controller (from agents and the popup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum HostRequest {
    ActivateSnipping,
    ToggleSnipping,
    CaptureScreenshot,
    #[serde(rename_all = "camelCase")]
    SaveToClipboard {
        image_data: String,
    },
    #[serde(rename_all = "camelCase")]
    DownloadImage {
        image_data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    GetSettings,
    UpdateSettings {
        #[serde(default)]
        settings: Value,
    },
    GetHistory,
    SaveHistory {
        #[serde(default)]
        history: Vec<HistoryItem>,
    },
    GetUsageStats,
}

/// Messages handled by a Capture Agent (from the host).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum AgentRequest {
    ActivateSnipping,
    Ping,
    #[serde(rename_all = "camelCase")]
    ToggleState {
        is_enabled: bool,
    },
    SettingsUpdated {
        settings: Settings,
    },
    SetColor {
        color: String,
    },
}

impl HostRequest {
    pub fn action(&self) -> &'static str {
        match self {
            HostRequest::ActivateSnipping => "activate-snipping",
            HostRequest::ToggleSnipping => "toggle-snipping",
            HostRequest::CaptureScreenshot => "capture-screenshot",
            HostRequest::SaveToClipboard { .. } => "save-to-clipboard",
            HostRequest::DownloadImage { .. } => "download-image",
            HostRequest::GetSettings => "get-settings",
            HostRequest::UpdateSettings { .. } => "update-settings",
            HostRequest::GetHistory => "get-history",
            HostRequest::SaveHistory { .. } => "save-history",
            HostRequest::GetUsageStats => "get-usage-stats",
        }
    }
}

impl AgentRequest {
    pub fn action(&self) -> &'static str {
        match self {
            AgentRequest::ActivateSnipping => "activate-snipping",
            AgentRequest::Ping => "ping",
            AgentRequest::ToggleState { .. } => "toggle-state",
            AgentRequest::SettingsUpdated { .. } => "settings-updated",
            AgentRequest::SetColor { .. } => "set-color",
        }
    }
}

/// Reply to any request. `success` is always present; the rest depends on
/// the action that was answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_id: Option<DownloadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<UsageStats>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn from_result<T>(result: crate::Result<T>, on_ok: impl FnOnce(T) -> Response) -> Self {
        match result {
            Ok(value) => on_ok(value),
            Err(e) => Response::failure(e),
        }
    }

    /// Liveness answer. Ready only when the overlay node actually exists.
    pub fn pong(active: bool, enabled: bool, overlay_ready: bool) -> Self {
        Self {
            active: Some(active),
            enabled: Some(enabled),
            overlay_ready: Some(overlay_ready),
            ..Self::ok()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.success && self.overlay_ready == Some(true)
    }

    /// The error message, or a generic one when the peer did not say.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }
}
