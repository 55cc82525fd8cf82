//! Crate-wide error taxonomy.
//!
//! Each variant maps to one failure the user can see. Handlers convert
//! these into `Response::failure` at the message boundary.

use crate::capture::CropError;
use crate::messaging::MessagingError;
use crate::platform::PlatformError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum SnipError {
    #[error("Capture agent did not become ready after {attempts} attempts")]
    InjectionTimeout { attempts: u32 },

    #[error("Failed to inject capture agent: {0}")]
    InjectionFailed(String),

    #[error("Capture agent refused to activate: {0}")]
    ActivationRejected(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Invalid crop dimensions ({width}x{height})")]
    InvalidCropDimensions { width: i64, height: i64 },

    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Download interrupted: {0}")]
    DownloadInterrupted(String),

    #[error("No active tab to snip")]
    NoActiveTab,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

impl From<CropError> for SnipError {
    fn from(err: CropError) -> Self {
        match err {
            CropError::InvalidDimensions { width, height } => {
                SnipError::InvalidCropDimensions { width, height }
            }
            CropError::Decode(msg) => SnipError::InvalidImageData(msg),
            CropError::EncodingFailed(msg) => SnipError::CaptureFailed(msg),
        }
    }
}

impl From<PlatformError> for SnipError {
    fn from(err: PlatformError) -> Self {
        SnipError::CaptureFailed(err.to_string())
    }
}

pub type Result<T, E = SnipError> = std::result::Result<T, E>;
