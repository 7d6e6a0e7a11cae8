//! Liveness supervision of the radio link

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::bluetooth::Link;
use crate::error::SessionError;
use crate::models::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// How long to wait for the first boot event before resetting
    pub grace: Duration,
    pub max_resets: u32,
    /// Wait for a boot event after each reset
    pub retry_wait: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            max_resets: 3,
            retry_wait: Duration::from_secs(10),
        }
    }
}

/// Wait up to `wait` for the ready latch; a closed latch counts as not ready
async fn wait_ready(ready: &mut watch::Receiver<bool>, wait: Duration) -> bool {
    timeout(wait, ready.wait_for(|ready| *ready))
        .await
        .map(|seen| seen.is_ok())
        .unwrap_or(false)
}

/// Reset the link until it reports ready or the reset budget is spent
///
/// Only the state transitions of the recovery cycle are written here:
/// `Resetting` before each reboot and `Scanning` once ready is seen again.
pub async fn supervise(
    link: &dyn Link,
    mut ready: watch::Receiver<bool>,
    state: &watch::Sender<SessionState>,
    config: WatchdogConfig,
) -> Result<(), SessionError> {
    if wait_ready(&mut ready, config.grace).await {
        debug!("Device ready within {:?}", config.grace);
        return Ok(());
    }

    for attempt in 1..=config.max_resets {
        warn!("Resetting device ({})...", attempt);
        state.send_replace(SessionState::Resetting);

        // A failed reboot still uses up the attempt
        if let Err(e) = link.reboot().await {
            error!("Failed to reset device: {}", e);
        }

        if wait_ready(&mut ready, config.retry_wait).await {
            info!("Device ready after {} reset(s)", attempt);
            state.send_replace(SessionState::Scanning);
            return Ok(());
        }
    }

    error!("Device unreachable.");
    Err(SessionError::Unreachable {
        attempts: config.max_resets,
    })
}
