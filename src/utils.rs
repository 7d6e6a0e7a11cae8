//! Utility functions for formatting and summarising telemetry

use bluer::Address;
use std::sync::Arc;
use time::{format_description, OffsetDateTime};

use crate::models::TelemetryRecord;
use crate::store::Snapshot;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD/MM/YYYY HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day]/[month]/[year] [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Latest reading of one address, as shown in the periodic summary
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub address: Address,
    pub latest: Arc<TelemetryRecord>,
    pub samples: usize,
    pub low_power_samples: usize,
}

/// Reduce a store snapshot to the latest record per address
///
/// Addresses with an empty history are skipped. The result is ordered by
/// address so log output is stable between refreshes.
pub fn summarize(snapshot: &Snapshot) -> Vec<DeviceSummary> {
    let mut summaries: Vec<DeviceSummary> = snapshot
        .iter()
        .filter_map(|(address, records)| {
            let latest = records.last()?;
            Some(DeviceSummary {
                address: *address,
                latest: Arc::clone(latest),
                samples: records.len(),
                low_power_samples: records.iter().filter(|r| r.is_low_power()).count(),
            })
        })
        .collect();

    summaries.sort_by_key(|s| s.address.0);
    summaries
}
