//! Capture history and usage counters, both kept in local storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::settings::ImageFormat;
use crate::storage::{Storage, StorageArea, StorageError};

pub const HISTORY_KEY: &str = "history";
pub const USAGE_KEY: &str = "usageStats";

/// Metadata for one capture. The image itself is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// SHA-256 of the encoded image, lowercase hex.
    pub digest: String,
}

impl HistoryItem {
    pub fn new(width: u32, height: u32, format: ImageFormat, encoded: &[u8]) -> Self {
        let timestamp = Utc::now();
        Self {
            id: timestamp.timestamp_millis(),
            timestamp,
            width,
            height,
            format,
            digest: format!("{:x}", Sha256::digest(encoded)),
        }
    }
}

/// Normalizes a history list received from an agent: newest first,
/// consecutive duplicates collapsed, capped at `limit`.
pub fn normalize(mut items: Vec<HistoryItem>, limit: usize) -> Vec<HistoryItem> {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.dedup_by(|later, earlier| later.digest == earlier.digest);
    items.truncate(limit);
    items
}

pub fn load_history(storage: &impl Storage) -> Result<Vec<HistoryItem>, StorageError> {
    Ok(storage
        .get(StorageArea::Local, HISTORY_KEY)?
        .and_then(|raw| serde_json::from_value(raw).ok())
        .unwrap_or_default())
}

pub fn store_history(storage: &impl Storage, items: &[HistoryItem]) -> Result<(), StorageError> {
    let value = serde_json::to_value(items).unwrap_or_default();
    storage.set(StorageArea::Local, HISTORY_KEY, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEvent {
    Activation,
    Capture,
    ClipboardWrite,
    Download,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub activations: u64,
    pub captures: u64,
    pub clipboard_writes: u64,
    pub downloads: u64,
    pub last_used: Option<DateTime<Utc>>,
}

impl UsageStats {
    pub fn record(&mut self, event: UsageEvent) {
        let counter = match event {
            UsageEvent::Activation => &mut self.activations,
            UsageEvent::Capture => &mut self.captures,
            UsageEvent::ClipboardWrite => &mut self.clipboard_writes,
            UsageEvent::Download => &mut self.downloads,
        };
        *counter += 1;
        self.last_used = Some(Utc::now());
    }
}

pub fn load_stats(storage: &impl Storage) -> Result<UsageStats, StorageError> {
    Ok(storage
        .get(StorageArea::Local, USAGE_KEY)?
        .and_then(|raw| serde_json::from_value(raw).ok())
        .unwrap_or_default())
}

/// Increments one counter and persists the record.
pub fn bump(storage: &impl Storage, event: UsageEvent) -> Result<UsageStats, StorageError> {
    let mut stats = load_stats(storage)?;
    stats.record(event);
    let value = serde_json::to_value(&stats).unwrap_or_default();
    storage.set(StorageArea::Local, USAGE_KEY, value)?;
    Ok(stats)
}
