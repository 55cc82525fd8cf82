//! Runtime knobs — retry bounds, timeouts, history cap, storage location.
//!
//! Defaults match the documented behavior; each can be overridden from the
//! environment (a `.env` file is honored via `dotenvy`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SnipConfig {
    /// Readiness probes after injecting the capture agent.
    pub ready_attempts: u32,
    /// Delay before each readiness probe.
    pub ready_delay: Duration,
    /// Ceiling on any single host→agent message.
    pub probe_timeout: Duration,
    /// Ceiling on the wait for a download to reach a terminal state.
    pub download_timeout: Duration,
    pub history_limit: usize,
    pub data_dir: PathBuf,
}

impl Default for SnipConfig {
    fn default() -> Self {
        Self {
            ready_attempts: 10,
            ready_delay: Duration::from_millis(200),
            probe_timeout: Duration::from_millis(150),
            download_timeout: Duration::from_secs(5),
            history_limit: 5,
            data_dir: default_data_dir(),
        }
    }
}

impl SnipConfig {
    /// Defaults overlaid with `SNIP_*` environment variables.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("[CONFIG] No .env loaded: {}", e);
        }

        let defaults = Self::default();
        Self {
            ready_attempts: env_or("SNIP_READY_ATTEMPTS", defaults.ready_attempts),
            ready_delay: Duration::from_millis(env_or(
                "SNIP_READY_DELAY_MS",
                defaults.ready_delay.as_millis() as u64,
            )),
            probe_timeout: Duration::from_millis(env_or(
                "SNIP_PROBE_TIMEOUT_MS",
                defaults.probe_timeout.as_millis() as u64,
            )),
            download_timeout: Duration::from_millis(env_or(
                "SNIP_DOWNLOAD_TIMEOUT_MS",
                defaults.download_timeout.as_millis() as u64,
            )),
            history_limit: env_or("SNIP_HISTORY_LIMIT", defaults.history_limit),
            data_dir: std::env::var_os("SNIP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// Upper bound on how long activation waits for a fresh agent.
    pub fn ready_budget(&self) -> Duration {
        self.ready_delay * self.ready_attempts
    }
}

/// Platform config directory, e.g. `~/.config/snipping-tool` on Linux.
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snipping-tool")
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("[CONFIG] {}={:?} is not valid, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
