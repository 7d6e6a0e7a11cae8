//! BlueZ-backed radio link
//!
//! BlueZ parses advertisements itself and only exposes manufacturer data per
//! company id, so this link rebuilds the legacy advertising payload the tag
//! sent: the flags AD followed by the manufacturer-specific AD for 0x02FF.
//! Controller "reboots" are adapter power cycles, each followed by a
//! synthesised `SystemBoot` event.

use async_trait::async_trait;
use bluer::{Adapter, AdapterEvent, Address, Device, DeviceEvent, DeviceProperty, Session};
use futures_util::stream::{self, BoxStream, SelectAll};
use futures_util::{pin_mut, StreamExt};
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::bluetooth::link::{
    BootInfo, ConnectionParameters, Link, LinkError, LinkEvent, LinkIdentity, ScanParameters,
};
use crate::models::{AddressKind, RawAdvertisement};
use crate::status::{CommandFailed, Status};
use crate::tag::frame::FLAGS_AD;

/// Silicon Labs company identifier used by the asset tags
pub const ASSET_TAG_COMPANY_ID: u16 = 0x02FF;
const AD_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;

/// Map a BlueZ error onto the link status vocabulary
fn status_of(err: &bluer::Error) -> Status {
    match err.kind {
        bluer::ErrorKind::NotReady => Status::NOT_READY,
        bluer::ErrorKind::InProgress => Status::IN_PROGRESS,
        bluer::ErrorKind::NotAuthorized => Status::PERMISSION,
        bluer::ErrorKind::NotSupported => Status::NOT_SUPPORTED,
        bluer::ErrorKind::NotAvailable => Status::NOT_AVAILABLE,
        bluer::ErrorKind::InvalidArguments => Status::INVALID_PARAMETER,
        bluer::ErrorKind::DoesNotExist => Status::NOT_FOUND,
        bluer::ErrorKind::AlreadyExists => Status::ALREADY_EXISTS,
        _ => Status::FAIL,
    }
}

fn command_failed(command: &str, err: bluer::Error) -> LinkError {
    let status = status_of(&err);
    LinkError::Command(CommandFailed::new(status, command, err.to_string()))
}

/// Rebuild the legacy advertising payload from one manufacturer data entry
pub fn advertising_payload(company_id: u16, data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(FLAGS_AD.len() + 4 + data.len());
    payload.extend_from_slice(&FLAGS_AD);
    // AD length counts the type byte and the company id
    payload.push((data.len() + 3).min(u8::MAX as usize) as u8);
    payload.push(AD_TYPE_MANUFACTURER_SPECIFIC);
    payload.extend_from_slice(&company_id.to_le_bytes());
    payload.extend_from_slice(data);
    payload
}

/// BlueZ encodes its version in the modalias device field as 0xMMmm (hex digits)
fn boot_info_from_modalias(device: u32) -> BootInfo {
    let major = (device >> 8) & 0xFF;
    let minor = device & 0xFF;
    let decimal = |v: u32| ((v >> 4) * 10 + (v & 0x0F)) as u16;
    BootInfo {
        major: decimal(major),
        minor: decimal(minor),
        patch: 0,
        build: 0,
    }
}

struct Connected {
    _session: Session,
    adapter: Adapter,
}

pub struct BluerLink {
    adapter_name: Option<String>,
    connected: Mutex<Option<Connected>>,
    discovery: StdMutex<Option<JoinHandle<()>>>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    events_rx: Mutex<mpsc::UnboundedReceiver<LinkEvent>>,
}

impl BluerLink {
    pub fn new(adapter_name: Option<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            adapter_name,
            connected: Mutex::new(None),
            discovery: StdMutex::new(None),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    async fn adapter(&self) -> Result<Adapter, LinkError> {
        self.connected
            .lock()
            .await
            .as_ref()
            .map(|c| c.adapter.clone())
            .ok_or(LinkError::NotOpen)
    }

    fn stop_discovery(&self) {
        let handle = self
            .discovery
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Announce the adapter as booted, reading its BlueZ version
    async fn announce_boot(&self, adapter: &Adapter) {
        let boot = match adapter.modalias().await {
            Ok(modalias) => modalias
                .map(|m| boot_info_from_modalias(m.device))
                .unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read adapter modalias: {}", e);
                BootInfo::default()
            }
        };
        let _ = self.events_tx.send(LinkEvent::SystemBoot(boot));
    }
}

/// Manufacturer data carried by a device property change, if that is what changed
fn manufacturer_update(event: &DeviceEvent) -> Option<&HashMap<u16, Vec<u8>>> {
    match event {
        DeviceEvent::PropertyChanged(DeviceProperty::ManufacturerData(data)) => Some(data),
        _ => None,
    }
}

/// Queue a report for the asset-tag entry of one manufacturer data map
async fn report_device(
    device: &Device,
    manufacturer_data: &HashMap<u16, Vec<u8>>,
    events: &mpsc::UnboundedSender<LinkEvent>,
) {
    let Some(data) = manufacturer_data.get(&ASSET_TAG_COMPANY_ID) else {
        return;
    };

    let address_kind = match device.address_type().await {
        Ok(kind) => AddressKind::from(kind),
        Err(_) => AddressKind::Public,
    };

    let advertisement = RawAdvertisement::new(
        device.address(),
        address_kind,
        advertising_payload(ASSET_TAG_COMPANY_ID, data),
    );
    let _ = events.send(LinkEvent::AdvertisementReport(advertisement));
}

/// Report a newly listed device only if it was heard during this discovery
///
/// BlueZ lists cached devices as added when discovery starts; those carry no RSSI.
async fn report_if_heard(device: &Device, events: &mpsc::UnboundedSender<LinkEvent>) {
    match device.rssi().await {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!("Skipping cached device {}", device.address());
            return;
        }
        Err(e) => {
            debug!("Failed to get RSSI for {}: {}", device.address(), e);
            return;
        }
    }

    match device.manufacturer_data().await {
        Ok(Some(data)) => report_device(device, &data, events).await,
        Ok(None) => {}
        Err(e) => debug!("Failed to get manufacturer data for {}: {}", device.address(), e),
    }
}

/// Per-device property changes; `None` marks the end of a device's stream
type DeviceChanges = SelectAll<BoxStream<'static, (Address, Option<DeviceEvent>)>>;

/// Subscribe to property changes of a device not watched yet
async fn watch_device(
    device: &Device,
    watched: &mut HashSet<Address>,
    changes: &mut DeviceChanges,
) {
    let addr = device.address();
    if !watched.insert(addr) {
        return;
    }
    match device.events().await {
        Ok(device_events) => {
            let device_events = device_events
                .map(move |event| (addr, Some(event)))
                .chain(stream::once(async move { (addr, None) }));
            changes.push(device_events.boxed());
        }
        Err(e) => {
            debug!("Failed to watch device {}: {}", addr, e);
            watched.remove(&addr);
        }
    }
}

/// Run one discovery until it is aborted or BlueZ ends it
///
/// Every fresh manufacturer data value is one advertisement. Other property
/// changes (RSSI, name, services) are not reports.
async fn discover(
    adapter: Adapter,
    events: mpsc::UnboundedSender<LinkEvent>,
    started: oneshot::Sender<bluer::Result<()>>,
) {
    let discovery = match adapter.discover_devices().await {
        Ok(discovery) => {
            let _ = started.send(Ok(()));
            discovery
        }
        Err(e) => {
            let _ = started.send(Err(e));
            return;
        }
    };
    pin_mut!(discovery);

    let mut watched = HashSet::new();
    let mut changes: DeviceChanges = SelectAll::new();

    loop {
        tokio::select! {
            Some(event) = discovery.next() => match event {
                AdapterEvent::DeviceAdded(addr) => {
                    let Ok(device) = adapter.device(addr) else {
                        continue;
                    };
                    watch_device(&device, &mut watched, &mut changes).await;
                    report_if_heard(&device, &events).await;
                }
                other => debug!("Discovery event: {:?}", other),
            },
            Some((addr, change)) = changes.next(), if !changes.is_empty() => {
                let Some(change) = change else {
                    watched.remove(&addr);
                    continue;
                };
                let Some(data) = manufacturer_update(&change) else {
                    continue;
                };
                if let Ok(device) = adapter.device(addr) {
                    report_device(&device, data, &events).await;
                }
            }
            else => break,
        }
    }
    debug!("Discovery ended");
}

#[async_trait]
impl Link for BluerLink {
    async fn open(&self) -> Result<(), LinkError> {
        // Initialize Bluetooth session
        let session = match Session::new().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create Bluetooth session: {}", e);
                return Err(LinkError::Open(e.to_string()));
            }
        };

        let adapter = match &self.adapter_name {
            Some(name) => session.adapter(name),
            None => session.default_adapter().await,
        };
        let adapter = match adapter {
            Ok(adapter) => adapter,
            Err(e) => {
                error!("Failed to get Bluetooth adapter: {}", e);
                return Err(LinkError::Open(e.to_string()));
            }
        };

        // Ensure Bluetooth adapter is powered on
        if let Err(e) = adapter.set_powered(true).await {
            error!("Failed to power on adapter: {}", e);
            return Err(LinkError::Open(e.to_string()));
        }

        info!("Opened Bluetooth adapter {}", adapter.name());
        *self.connected.lock().await = Some(Connected {
            _session: session,
            adapter: adapter.clone(),
        });
        self.announce_boot(&adapter).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.stop_discovery();
        self.connected.lock().await.take();
        Ok(())
    }

    async fn next_event(&self, wait: Duration) -> Result<Option<LinkEvent>, LinkError> {
        let mut events = self.events_rx.lock().await;
        match tokio::time::timeout(wait, events.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(LinkError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn reboot(&self) -> Result<(), LinkError> {
        let adapter = self.adapter().await?;
        self.stop_discovery();

        adapter
            .set_powered(false)
            .await
            .map_err(|e| command_failed("system.reboot() power off", e))?;
        adapter
            .set_powered(true)
            .await
            .map_err(|e| command_failed("system.reboot() power on", e))?;

        self.announce_boot(&adapter).await;
        Ok(())
    }

    async fn identity_address(&self) -> Result<LinkIdentity, LinkError> {
        let adapter = self.adapter().await?;
        let address = adapter
            .address()
            .await
            .map_err(|e| command_failed("system.get_identity_address()", e))?;
        let kind = adapter
            .address_type()
            .await
            .map_err(|e| command_failed("system.get_identity_address()", e))?;
        Ok(LinkIdentity {
            address,
            kind: AddressKind::from(kind),
        })
    }

    async fn set_default_connection_parameters(
        &self,
        params: &ConnectionParameters,
    ) -> Result<(), LinkError> {
        // BlueZ owns connection parameters; nothing to push over D-Bus
        debug!("Default connection parameters: {:?}", params);
        Ok(())
    }

    async fn start_scan(&self, params: &ScanParameters) -> Result<(), LinkError> {
        let adapter = self.adapter().await?;
        debug!("Scan parameters: {:?}", params);

        // Configure discovery filter for Low Energy devices, reporting every advertisement
        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        };
        if let Err(e) = adapter.set_discovery_filter(filter).await {
            warn!("Failed to set discovery filter: {}", e);
        }

        self.stop_discovery();

        // The discovery stream borrows the adapter, so both live in the task
        let (started_tx, started_rx) = oneshot::channel();
        let handle = tokio::spawn(discover(adapter, self.events_tx.clone(), started_tx));

        match started_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(command_failed("scanner.start(phy=1M, mode=generic)", e)),
            Err(_) => return Err(LinkError::Transport("discovery task ended".to_string())),
        }

        *self
            .discovery
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::fixtures::{FULL_FRAME, LOW_POWER_FRAME};
    use crate::tag::FrameValidator;

    #[test]
    fn test_payload_rebuilt_from_manufacturer_data() {
        // BlueZ strips the AD headers and the company id
        let payload = advertising_payload(ASSET_TAG_COMPANY_ID, &FULL_FRAME[7..]);
        assert_eq!(payload, FULL_FRAME.to_vec());

        let payload = advertising_payload(ASSET_TAG_COMPANY_ID, &LOW_POWER_FRAME[7..]);
        assert_eq!(payload, LOW_POWER_FRAME.to_vec());
        assert!(FrameValidator::new(true).validate(&payload).is_some());
    }

    #[test]
    fn test_only_manufacturer_data_changes_are_reports() {
        let rssi = DeviceEvent::PropertyChanged(DeviceProperty::Rssi(-40));
        assert!(manufacturer_update(&rssi).is_none());

        let name = DeviceEvent::PropertyChanged(DeviceProperty::Name("tag".to_string()));
        assert!(manufacturer_update(&name).is_none());

        let data = HashMap::from([(ASSET_TAG_COMPANY_ID, FULL_FRAME[7..].to_vec())]);
        let update = DeviceEvent::PropertyChanged(DeviceProperty::ManufacturerData(data.clone()));
        assert_eq!(manufacturer_update(&update), Some(&data));
    }

    #[test]
    fn test_bluez_version_from_modalias() {
        let boot = boot_info_from_modalias(0x0566);
        assert_eq!(boot.version(), "5.66.0");
    }
}
