use bluer::Address;
use std::fmt;
use time::OffsetDateTime;

use crate::utils::format_datetime;

/// Kind of the Bluetooth address a frame was broadcast from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Public,
    Random,
}

impl From<bluer::AddressType> for AddressKind {
    fn from(kind: bluer::AddressType) -> Self {
        match kind {
            bluer::AddressType::LeRandom => AddressKind::Random,
            _ => AddressKind::Public,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Public => write!(f, "public device"),
            AddressKind::Random => write!(f, "static random"),
        }
    }
}

/// One broadcast observed by the link, before any validation
#[derive(Debug, Clone)]
pub struct RawAdvertisement {
    pub address: Address,
    pub address_kind: AddressKind,
    pub payload: Vec<u8>,
    pub received_at: OffsetDateTime,
}

impl RawAdvertisement {
    pub fn new(address: Address, address_kind: AddressKind, payload: Vec<u8>) -> Self {
        Self {
            address,
            address_kind,
            payload,
            received_at: OffsetDateTime::now_utc(),
        }
    }
}

/// 8-byte tag identifier carried inside every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub [u8; 8]);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Harvesting power level the tag selected for its next report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    Skip2nd,
    Min,
    Medium,
    High,
    Max,
}

impl PowerState {
    pub const ALL: [PowerState; 5] = [
        PowerState::Skip2nd,
        PowerState::Min,
        PowerState::Medium,
        PowerState::High,
        PowerState::Max,
    ];

    /// Look up a state by its on-wire index. `None` for anything past `MAX`.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::Skip2nd => "SKIP_2ND",
            PowerState::Min => "MIN",
            PowerState::Medium => "MEDIUM",
            PowerState::High => "HIGH",
            PowerState::Max => "MAX",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POWER_LEVEL_{}", self.as_str())
    }
}

/// Measurement set of a full frame
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub temperature: f32,
    pub vcap_mv: u16,
    pub delta_vcap_mv: i16,
    pub intensity: u8,
    pub power_dbm: f32,
    pub next_interval_ms: u32,
    pub mode: u8,
    pub state: PowerState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub device_id: DeviceId,
    pub timestamp: OffsetDateTime,
    pub address: Address,
    pub address_kind: AddressKind,
    pub raw: Vec<u8>,
    pub payload_len: usize,
    /// Absent for low-power frames, which carry only the device id
    pub measurements: Option<Measurements>,
}

impl TelemetryRecord {
    pub fn is_low_power(&self) -> bool {
        self.measurements.is_none()
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] MAC = {}, Raw data = {}, payload length = {}: ",
            format_datetime(&self.timestamp),
            self.address,
            hex::encode(&self.raw),
            self.payload_len
        )?;
        match &self.measurements {
            Some(m) => write!(
                f,
                "ID = {} Temperature = {:+5.2} °C, Vcap = {:4} mV, deltaVcap = {:+4} mV, Power = {:+4.1} dBm, Next = {:5} ms, Mode = {}, State = {}",
                self.device_id,
                m.temperature,
                m.vcap_mv,
                m.delta_vcap_mv,
                m.power_dbm,
                m.next_interval_ms,
                m.mode,
                m.state
            ),
            None => write!(f, "Low power mode, only devId available: {}", self.device_id),
        }
    }
}

/// Lifecycle of one radio-link session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Resetting,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Resetting => "resetting",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
