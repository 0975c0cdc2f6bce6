//! Device Event Normalizer
//!
//! Turns raw found-device notifications and bonded-device snapshots into
//! [`DeviceRecord`]s. Never fails: missing metadata falls back to defaults.

use crate::domain::device_class::UNCATEGORIZED;
use crate::domain::models::{DeviceRecord, RawFoundEvent, RemoteDevice};

/// Name used when neither the event nor the device carries one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Build a record from a found-device notification.
///
/// Name resolution: the name on the event, then the device's cached name,
/// then [`UNKNOWN_NAME`]. The first non-empty value wins.
pub fn normalize(event: &RawFoundEvent) -> DeviceRecord {
    build_record(event.name.as_deref(), &event.device)
}

/// Build a record for a device taken from the bonded set.
pub fn normalize_remote(device: &RemoteDevice) -> DeviceRecord {
    build_record(None, device)
}

fn build_record(event_name: Option<&str>, device: &RemoteDevice) -> DeviceRecord {
    let name = [event_name, device.cached_name.as_deref()]
        .into_iter()
        .flatten()
        .find(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string();

    let device_class = device
        .class
        .map(|c| c.major_code())
        .unwrap_or(UNCATEGORIZED);

    DeviceRecord {
        name,
        address: device.address.to_string(),
        device_class,
    }
}
