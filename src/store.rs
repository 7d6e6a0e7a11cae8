//! In-memory telemetry history, one append-only sequence per source address

use bluer::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::TelemetryRecord;

/// History of one address; records are shared and immutable
pub type History = Arc<Vec<Arc<TelemetryRecord>>>;

/// Published view of the store, never modified once handed out
pub type Snapshot = HashMap<Address, History>;

/// Per-address telemetry history
///
/// Written by the session's event loop, read by any number of independent
/// consumers. Every append publishes a new snapshot through a watch channel.
/// Taking a snapshot is a reference count bump, so readers never hold up the
/// writer. The writer copies a history only while a reader still holds the
/// previous version of it.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    inner: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        let (inner, _) = watch::channel(Arc::new(Snapshot::new()));
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record under its source address; returns the new history length
    pub fn append(&self, address: Address, record: TelemetryRecord) -> usize {
        let mut len = 0;
        self.inner.send_modify(|snapshot| {
            let history = Arc::make_mut(snapshot).entry(address).or_default();
            let records = Arc::make_mut(history);
            records.push(Arc::new(record));
            len = records.len();
        });
        len
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.borrow().clone()
    }

    /// History of a single address, empty if it was never seen
    pub fn history(&self, address: &Address) -> History {
        self.inner
            .borrow()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    pub fn device_count(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn record_count(&self) -> usize {
        self.inner.borrow().values().map(|history| history.len()).sum()
    }
}
