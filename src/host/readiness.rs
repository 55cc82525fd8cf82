//! Agent readiness — probe, inject, and a bounded wait for the fresh agent.

use std::time::Duration;

use crate::config::SnipConfig;
use crate::error::SnipError;
use crate::platform::Browser;
use crate::protocol::{AgentRequest, TabId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The first probe answered; nothing was injected.
    AlreadyLoaded,
    /// Injected, then ready on the given retry attempt (1-based).
    Injected { attempts: u32 },
}

/// One liveness probe. Ready only if the agent answered within `limit`
/// and reports its overlay node as present.
pub async fn probe<B: Browser>(browser: &B, tab: TabId, limit: Duration) -> bool {
    match tokio::time::timeout(limit, browser.send_to_tab(tab, AgentRequest::Ping)).await {
        Ok(Ok(response)) => response.is_ready(),
        Ok(Err(e)) => {
            log::debug!("[HOST] Probe of tab {} failed: {}", tab, e);
            false
        }
        Err(_) => {
            log::debug!("[HOST] Probe of tab {} timed out after {:?}", tab, limit);
            false
        }
    }
}

/// Makes sure `tab` has a live agent, injecting one if needed.
pub async fn ensure_agent<B: Browser>(
    browser: &B,
    tab: TabId,
    config: &SnipConfig,
) -> Result<Readiness, SnipError> {
    if probe(browser, tab, config.probe_timeout).await {
        return Ok(Readiness::AlreadyLoaded);
    }

    log::info!(
        "[HOST] No live agent in tab {}, injecting (waiting up to {:?})",
        tab,
        config.ready_budget()
    );
    browser
        .inject_agent(tab)
        .await
        .map_err(|e| SnipError::InjectionFailed(e.to_string()))?;

    let attempts = wait_until_ready(
        browser,
        tab,
        config.ready_attempts,
        config.ready_delay,
        config.probe_timeout,
    )
    .await?;
    Ok(Readiness::Injected { attempts })
}

/// Probes up to `attempts` times, sleeping `delay` before each probe.
///
/// Returns the attempt that succeeded, or `InjectionTimeout` once the
/// bound is exhausted. Never probes more than `attempts` times.
pub async fn wait_until_ready<B: Browser>(
    browser: &B,
    tab: TabId,
    attempts: u32,
    delay: Duration,
    probe_timeout: Duration,
) -> Result<u32, SnipError> {
    for attempt in 1..=attempts {
        tokio::time::sleep(delay).await;
        if probe(browser, tab, probe_timeout).await {
            log::info!("[HOST] Agent in tab {} ready after {} attempt(s)", tab, attempt);
            return Ok(attempt);
        }
    }

    log::warn!("[HOST] Agent in tab {} never became ready ({} attempts)", tab, attempts);
    Err(SnipError::InjectionTimeout { attempts })
}
