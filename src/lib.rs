//! Reader for energy-harvesting asset tags
//!
//! Validates and decodes the tags' broadcast frames and keeps a per-address
//! telemetry history while a supervised radio-link session is running.
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod status;
pub mod store;
pub mod tag;
pub mod utils;

pub use config::ReaderConfig;
pub use error::{DecodeError, SessionError};
pub use models::{
    AddressKind, DeviceId, Measurements, PowerState, RawAdvertisement, SessionState,
    TelemetryRecord,
};
pub use session::{SessionConfig, SessionHandle, SessionRuntime, WatchdogConfig};
pub use status::{CommandFailed, Status, StatusKind};
pub use store::{History, Snapshot, TelemetryStore};
