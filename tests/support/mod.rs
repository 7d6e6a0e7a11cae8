//! In-memory radio link and frame helpers for session tests.
//!
//! `MockLink` replays queued events and records every command it receives,
//! so tests can drive `SessionRuntime` without a Bluetooth adapter.
#![allow(dead_code)]

use async_trait::async_trait;
use asset_tag_reader::bluetooth::{
    BootInfo, ConnectionParameters, Link, LinkError, LinkEvent, LinkIdentity, ScanParameters,
};
use asset_tag_reader::tag::crc32_default;
use asset_tag_reader::{AddressKind, CommandFailed, RawAdvertisement, Status};
use bluer::Address;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const BOOT: BootInfo = BootInfo {
    major: 5,
    minor: 66,
    patch: 0,
    build: 0,
};

pub const TAG_ADDRESS: Address = Address([0xD0, 0xCF, 0x5E, 0x12, 0x34, 0x56]);

/// Reference full frame: device 0102030405060708, 25.50 °C, 2100 mV, -50 mV,
/// intensity 42, -3.5 dBm, next 500 ms, mode 1, MEDIUM
pub const FULL_FRAME: [u8; 31] = [
    0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0xF6, 0x09, 0x34, 0x08, 0xCE, 0xFF, 0x2A, 0xDD, 0xF4, 0x01, 0x00, 0x22, 0x8C, 0xCA, 0x88,
    0xF3,
];

pub const LOW_POWER_FRAME: [u8; 19] = [
    0x02, 0x01, 0x06, 0x0F, 0xFF, 0xFF, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x62, 0xFC, 0x00, 0xD4,
];

/// Device 05187a6525686bfe with a valid CRC but a power state nibble of 7;
/// equals `full_frame` with mode 3 and state 7
pub const BAD_STATE_FRAME: [u8; 31] = [
    0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02, 0x05, 0x18, 0x7A, 0x65, 0x25, 0x68, 0x6B, 0xFE,
    0x2E, 0xFB, 0x08, 0x07, 0x78, 0x00, 0xC8, 0x28, 0xE0, 0x2E, 0x00, 0x07, 0xDC, 0x7A, 0xCB,
    0x6A,
];

/// Field values of a full frame as they travel on the air
#[derive(Debug, Clone, Copy)]
pub struct RawFields {
    pub device_id: [u8; 8],
    pub temperature: i16,
    pub vcap_mv: u16,
    pub delta_vcap_mv: i16,
    pub intensity: u8,
    pub power: i8,
    pub next_interval_ms: u32,
    pub mode: u8,
    pub state: u8,
}

/// Build a 31-byte checksummed frame the way the tag firmware lays it out
pub fn full_frame(fields: &RawFields) -> Vec<u8> {
    let mut frame = vec![0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02];
    frame.extend_from_slice(&fields.device_id);
    frame.extend_from_slice(&fields.temperature.to_le_bytes());
    frame.extend_from_slice(&fields.vcap_mv.to_le_bytes());
    frame.extend_from_slice(&fields.delta_vcap_mv.to_le_bytes());
    frame.push(fields.intensity);
    frame.push(fields.power as u8);
    frame.extend_from_slice(&fields.next_interval_ms.to_le_bytes()[..3]);
    frame.push(((!fields.mode & 0b11) << 4) | (fields.state & 0b1111));

    let mut crc_input = b"SLBS".to_vec();
    crc_input.extend_from_slice(&frame[5..]);
    frame.extend_from_slice(&crc32_default(&crc_input).to_le_bytes());
    frame
}

pub fn advertisement(address: Address, payload: &[u8]) -> LinkEvent {
    LinkEvent::AdvertisementReport(RawAdvertisement::new(
        address,
        AddressKind::Random,
        payload.to_vec(),
    ))
}

#[derive(Default)]
struct MockState {
    events: VecDeque<LinkEvent>,
    boot_on_open: bool,
    boot_on_reboot: bool,
    open_failure: Option<String>,
    scan_failure: Option<Status>,
    opened: bool,
    closed: bool,
    reboots: Vec<Instant>,
    scans: usize,
}

pub struct MockLink {
    state: Mutex<MockState>,
}

impl MockLink {
    /// A link that boots on open and after every reboot
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                boot_on_open: true,
                boot_on_reboot: true,
                ..Default::default()
            }),
        }
    }

    /// A link that never announces a boot on its own
    pub fn silent() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn boot_on_reboot(self, enabled: bool) -> Self {
        self.state.lock().unwrap().boot_on_reboot = enabled;
        self
    }

    pub fn failing_open(self, reason: &str) -> Self {
        self.state.lock().unwrap().open_failure = Some(reason.to_string());
        self
    }

    pub fn failing_scan(self, status: Status) -> Self {
        self.state.lock().unwrap().scan_failure = Some(status);
        self
    }

    pub fn push(&self, event: LinkEvent) {
        self.state.lock().unwrap().events.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    pub fn reboots(&self) -> Vec<Instant> {
        self.state.lock().unwrap().reboots.clone()
    }

    pub fn scans(&self) -> usize {
        self.state.lock().unwrap().scans
    }

    pub fn opened(&self) -> bool {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Link for MockLink {
    async fn open(&self) -> Result<(), LinkError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.open_failure {
            return Err(LinkError::Open(reason.clone()));
        }
        state.opened = true;
        if state.boot_on_open {
            state.events.push_front(LinkEvent::SystemBoot(BOOT));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    async fn next_event(&self, wait: Duration) -> Result<Option<LinkEvent>, LinkError> {
        let next = self.state.lock().unwrap().events.pop_front();
        match next {
            Some(event) => Ok(Some(event)),
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn reboot(&self) -> Result<(), LinkError> {
        let mut state = self.state.lock().unwrap();
        state.reboots.push(Instant::now());
        if state.boot_on_reboot {
            state.events.push_back(LinkEvent::SystemBoot(BOOT));
        }
        Ok(())
    }

    async fn identity_address(&self) -> Result<LinkIdentity, LinkError> {
        Ok(LinkIdentity {
            address: Address([0x00, 0x0B, 0x57, 0xAA, 0xBB, 0xCC]),
            kind: AddressKind::Public,
        })
    }

    async fn set_default_connection_parameters(
        &self,
        _params: &ConnectionParameters,
    ) -> Result<(), LinkError> {
        Ok(())
    }

    async fn start_scan(&self, _params: &ScanParameters) -> Result<(), LinkError> {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.scan_failure {
            return Err(CommandFailed::new(
                status,
                "scanner.start(phy=1M, mode=generic)",
                "scanner_start rsp",
            )
            .into());
        }
        state.scans += 1;
        Ok(())
    }
}

/// Poll `condition` on the test clock until it holds
pub async fn until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(120), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
