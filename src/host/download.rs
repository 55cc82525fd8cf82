//! Download requests — payload validation, filename hygiene, and the
//! bounded wait for a terminal state.

use chrono::Local;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::capture::data_uri;
use crate::error::SnipError;
use crate::platform::{Browser, ConflictAction, DownloadRequest, DownloadState};
use crate::protocol::DownloadId;

pub const FILENAME_PREFIX: &str = "snipping-tool";

/// Characters no mainstream file system accepts in a name.
static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Replaces every character in `<>:"/\|?*` with `_`. Idempotent.
pub fn sanitize_filename(name: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// `snipping-tool-2024-05-01T09-30-00.png`, local time.
pub fn default_filename(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        FILENAME_PREFIX,
        Local::now().format("%Y-%m-%dT%H-%M-%S"),
        extension
    )
}

/// How a download ended from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(DownloadId),
    /// Still running when the wait ceiling passed; reported as started.
    Initiated(DownloadId),
}

impl DownloadOutcome {
    pub fn id(&self) -> DownloadId {
        match self {
            DownloadOutcome::Completed(id) | DownloadOutcome::Initiated(id) => *id,
        }
    }
}

/// Validates, names, starts, and waits for one download.
pub async fn download_image<B: Browser>(
    browser: &B,
    image_data: &str,
    filename: Option<&str>,
    wait_limit: Duration,
) -> Result<DownloadOutcome, SnipError> {
    let payload = data_uri::decode(image_data)?;

    let filename = match filename.map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => sanitize_filename(name),
        None => default_filename(payload.extension()),
    };

    let size = payload.bytes.len();
    let request = DownloadRequest {
        filename: filename.clone(),
        mime: payload.mime,
        bytes: payload.bytes,
        conflict: ConflictAction::Uniquify,
    };

    let id = browser
        .start_download(request)
        .await
        .map_err(|e| SnipError::DownloadInterrupted(e.to_string()))?;
    log::info!("[DOWNLOAD] Started #{} {} ({} bytes)", id, filename, size);

    match tokio::time::timeout(wait_limit, browser.wait_for_download(id)).await {
        Ok(DownloadState::Complete) => {
            log::info!("[DOWNLOAD] #{} complete", id);
            Ok(DownloadOutcome::Completed(id))
        }
        Ok(DownloadState::Interrupted(reason)) => {
            log::warn!("[DOWNLOAD] #{} interrupted: {}", id, reason);
            Err(SnipError::DownloadInterrupted(reason))
        }
        Ok(DownloadState::InProgress) | Err(_) => {
            log::info!(
                "[DOWNLOAD] #{} still running after {:?}, reporting as initiated",
                id,
                wait_limit
            );
            Ok(DownloadOutcome::Initiated(id))
        }
    }
}
