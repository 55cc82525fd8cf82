//! Snipping Tool — select a rectangle of the visible page, copy it to the
//! clipboard or download it.
//!
//! The library wires together:
//! - Host controller (host/): enablement, readiness handshake, capture,
//!   clipboard fallback, downloads, persistence
//! - Capture agent (agent/): overlay, selection state machine, capture pipeline
//! - Popup controller (popup/): settings form and quick actions
//! - Platform seams (platform/) the controllers are generic over
//! - Desktop rendition (desktop/, `desktop` feature): the primary display as
//!   the page, driven by the `snip` CLI

pub mod agent;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod messaging;
pub mod platform;
pub mod popup;
pub mod protocol;
pub mod settings;
pub mod storage;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use error::{Result, SnipError};
