use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::bluetooth::{
    BootInfo, Link, LinkError, LinkEvent, CONNECTION_DEFAULTS, SCAN_PARAMETERS,
};
use crate::error::SessionError;
use crate::models::{RawAdvertisement, SessionState};
use crate::session::watchdog::{self, WatchdogConfig};
use crate::store::TelemetryStore;
use crate::tag::{decode, FrameValidator};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Frames carry a trailing CRC32 and a packed status byte
    pub use_checksum: bool,
    /// Upper bound on one wait for a link event; also bounds stop latency
    pub poll_interval: Duration,
    pub watchdog: WatchdogConfig,
    /// Treat a decode contract violation as fatal instead of dropping the frame
    pub strict_decode: bool,
    pub expected_stack_version: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            use_checksum: true,
            poll_interval: Duration::from_millis(100),
            watchdog: WatchdogConfig::default(),
            strict_decode: true,
            expected_stack_version: None,
        }
    }
}

/// Cloneable control surface of a running session
#[derive(Clone)]
pub struct SessionHandle {
    link: Arc<dyn Link>,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    store: TelemetryStore,
}

impl SessionHandle {
    /// Request a clean stop; observed within one poll interval
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Re-issue the reboot command without touching the session state
    pub async fn reset(&self) -> Result<(), LinkError> {
        info!("Reset requested");
        self.link.reboot().await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }
}

/// One radio-link session: event loop, frame pipeline and watchdog
pub struct SessionRuntime {
    link: Arc<dyn Link>,
    config: SessionConfig,
    validator: FrameValidator,
    store: TelemetryStore,
    ready: watch::Sender<bool>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
}

impl SessionRuntime {
    pub fn new(link: Arc<dyn Link>, config: SessionConfig) -> Self {
        let (ready, _) = watch::channel(false);
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            link,
            validator: FrameValidator::new(config.use_checksum),
            config,
            store: TelemetryStore::new(),
            ready,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            link: Arc::clone(&self.link),
            cancel: self.cancel.clone(),
            state: self.state.subscribe(),
            store: self.store.clone(),
        }
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Drive the session until it is stopped or fails
    ///
    /// Returns `Ok` only for an external stop. The link is closed and the
    /// state is `Terminated` on every return path.
    pub async fn run(&self) -> Result<(), SessionError> {
        info!("Starting asset tag session");
        self.ready.send_replace(false);

        if let Err(e) = self.link.open().await {
            error!("Failed to open link: {}", e);
            self.state.send_replace(SessionState::Terminated);
            return Err(SessionError::LinkOpen(e));
        }
        self.state.send_replace(SessionState::Scanning);

        let result = self.event_loop().await;

        if let Err(e) = self.link.close().await {
            warn!("Failed to close link: {}", e);
        }
        self.state.send_replace(SessionState::Terminated);

        match &result {
            Ok(()) => info!("Session stopped"),
            Err(e) => error!("Session terminated: {}", e),
        }
        result
    }

    async fn event_loop(&self) -> Result<(), SessionError> {
        let watchdog = watchdog::supervise(
            self.link.as_ref(),
            self.ready.subscribe(),
            &self.state,
            self.config.watchdog,
        );
        tokio::pin!(watchdog);
        let mut watchdog_done = false;

        loop {
            if self.cancel.is_cancelled() {
                info!("Stop requested");
                return Ok(());
            }

            tokio::select! {
                outcome = &mut watchdog, if !watchdog_done => {
                    watchdog_done = true;
                    outcome?;
                }
                event = self.link.next_event(self.config.poll_interval) => {
                    if let Some(event) = event? {
                        self.handle_event(event).await?;
                    }
                }
            }
        }
    }

    async fn handle_event(&self, event: LinkEvent) -> Result<(), SessionError> {
        let ready = *self.ready.borrow();
        match event {
            LinkEvent::SystemBoot(boot) => self.on_boot(boot).await,
            // Leftovers of a previous session that was not shut down cleanly
            event if !ready => {
                debug!("Ignoring {} event received before boot", event.name());
                Ok(())
            }
            LinkEvent::AdvertisementReport(advertisement) => self.on_advertisement(advertisement),
            LinkEvent::SystemError { reason, data } => {
                warn!(
                    "Link reported error {:#06x}: '{}' (data: {})",
                    reason,
                    reason,
                    hex::encode(&data)
                );
                Ok(())
            }
            LinkEvent::Ignored { name } => {
                trace!("Ignoring {} event", name);
                Ok(())
            }
        }
    }

    async fn on_boot(&self, boot: BootInfo) -> Result<(), SessionError> {
        self.ready.send_replace(true);
        info!("Bluetooth stack booted: {}", boot);

        if let Some(expected) = &self.config.expected_stack_version {
            if boot.version() != *expected {
                warn!(
                    "Bluetooth stack version {} does not match expected version {}",
                    boot.version(),
                    expected
                );
            }
        }

        let identity = self.link.identity_address().await?;
        info!("Bluetooth {} address: {}", identity.kind, identity.address);

        self.link
            .set_default_connection_parameters(&CONNECTION_DEFAULTS)
            .await?;
        self.link.start_scan(&SCAN_PARAMETERS).await?;
        info!("Scanning started...");
        Ok(())
    }

    fn on_advertisement(&self, advertisement: RawAdvertisement) -> Result<(), SessionError> {
        // Noise never surfaces as an error
        let Some(frame) = self.validator.validate(&advertisement.payload) else {
            return Ok(());
        };

        match decode(&frame, &advertisement) {
            Ok(record) => {
                info!("{}", record);
                self.store.append(advertisement.address, record);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to decode frame from {} ({}): {}",
                    advertisement.address,
                    hex::encode(&advertisement.payload),
                    e
                );
                if self.config.strict_decode {
                    Err(SessionError::Decode {
                        address: advertisement.address,
                        source: e,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}
