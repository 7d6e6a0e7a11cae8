//! Radio-link abstraction the session runtime drives

use async_trait::async_trait;
use bluer::Address;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::models::{AddressKind, RawAdvertisement};
use crate::status::{CommandFailed, Status};

/// Connection defaults applied after every boot, in controller units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// 1.25 ms units
    pub interval_min: u16,
    pub interval_max: u16,
    pub peripheral_latency: u16,
    /// 10 ms units
    pub supervision_timeout: u16,
    pub min_ce_length: u16,
    pub max_ce_length: u16,
}

pub const CONNECTION_DEFAULTS: ConnectionParameters = ConnectionParameters {
    interval_min: 80,         // 100 ms
    interval_max: 80,         // 100 ms
    peripheral_latency: 0,    // no latency
    supervision_timeout: 100, // 1000 ms
    min_ce_length: 0,
    max_ce_length: 65535,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhy {
    Le1M,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverMode {
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    /// 0.625 ms units
    pub interval: u16,
    pub window: u16,
    pub passive: bool,
    pub phy: ScanPhy,
    pub mode: DiscoverMode,
}

pub const SCAN_PARAMETERS: ScanParameters = ScanParameters {
    interval: 16, // 10 ms
    window: 16,   // 10 ms
    passive: true,
    phy: ScanPhy::Le1M,
    mode: DiscoverMode::Generic,
};

/// Version information announced by the link when its stack has booted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
}

impl BootInfo {
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Display for BootInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}-b{}", self.version(), self.build)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkIdentity {
    pub address: Address,
    pub kind: AddressKind,
}

/// Events the runtime understands; everything else arrives as `Ignored`
#[derive(Debug, Clone)]
pub enum LinkEvent {
    SystemBoot(BootInfo),
    AdvertisementReport(RawAdvertisement),
    SystemError { reason: Status, data: Vec<u8> },
    Ignored { name: String },
}

impl LinkEvent {
    pub fn name(&self) -> &str {
        match self {
            LinkEvent::SystemBoot(_) => "system_boot",
            LinkEvent::AdvertisementReport(_) => "scanner_legacy_advertisement_report",
            LinkEvent::SystemError { .. } => "system_error",
            LinkEvent::Ignored { name } => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{0}")]
    Open(String),

    #[error(transparent)]
    Command(#[from] CommandFailed),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("event queue closed")]
    Closed,

    #[error("link is not open")]
    NotOpen,
}

/// The connection to the radio controller
///
/// Implementations queue events internally; `next_event` waits at most
/// `wait` and returns `Ok(None)` when nothing arrived in time.
#[async_trait]
pub trait Link: Send + Sync {
    async fn open(&self) -> Result<(), LinkError>;

    async fn close(&self) -> Result<(), LinkError>;

    async fn next_event(&self, wait: Duration) -> Result<Option<LinkEvent>, LinkError>;

    /// Reboot the controller; a `SystemBoot` event follows once it is back
    async fn reboot(&self) -> Result<(), LinkError>;

    async fn identity_address(&self) -> Result<LinkIdentity, LinkError>;

    async fn set_default_connection_parameters(
        &self,
        params: &ConnectionParameters,
    ) -> Result<(), LinkError>;

    async fn start_scan(&self, params: &ScanParameters) -> Result<(), LinkError>;
}
