//! Timed discovery sweep
//!
//! One-shot helper on top of the service: listen for a fixed window, merge
//! what was found with the bonded list and hand back a deduplicated result.

use super::service::BluetoothService;
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{DeviceRecord, DiscoveryState, SweptDevice};
use crate::domain::settings::DiscoverySettings;
use futures::{FutureExt, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct DeviceSweep<'a> {
    service: &'a BluetoothService,
    settings: DiscoverySettings,
}

impl<'a> DeviceSweep<'a> {
    pub fn new(service: &'a BluetoothService, settings: DiscoverySettings) -> Self {
        Self { service, settings }
    }

    /// Bonded devices first, then newly found ones in discovery order.
    pub async fn run(self) -> BluetoothResult<Vec<SweptDevice>> {
        if !self.service.enable_bluetooth().await? {
            info!("Sweep skipped: radio is off");
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut seen = HashSet::new();

        if self.settings.include_paired {
            match self.service.get_paired_devices().await {
                Ok(paired) => {
                    for record in paired {
                        if seen.insert(record.address.clone()) {
                            results.push(SweptDevice {
                                record,
                                paired: true,
                            });
                        }
                    }
                }
                Err(BluetoothError::NoRadio) => return Err(BluetoothError::NoRadio),
                Err(e) => warn!("Could not read bonded devices: {}", e),
            }
        }

        // Subscribe before starting so nothing found early is missed.
        let mut found = self.service.devices();
        // A session someone else opened is left running afterwards.
        let owns_session = self.service.discovery_state().await == DiscoveryState::Idle;

        match self.service.start_discovery().await {
            Ok(_) => {}
            Err(BluetoothError::NoRadio) => return Err(BluetoothError::NoRadio),
            Err(e) => {
                warn!("Sweep could not start discovery, returning bonded devices: {}", e);
                return Ok(results);
            }
        }

        let window = tokio::time::sleep(self.settings.scan_window());
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => break,
                next = found.next() => match next {
                    Some(record) => self.collect(record, &mut seen, &mut results),
                    None => break,
                },
            }
        }

        if owns_session {
            if let Err(e) = self.service.stop_discovery().await {
                warn!("Failed to stop discovery after sweep: {}", e);
            }
            // Stop flushes what the radio delivered inside the window.
            while let Some(Some(record)) = found.next().now_or_never() {
                self.collect(record, &mut seen, &mut results);
            }
        } else {
            debug!("Leaving the running discovery session open");
        }

        info!("Sweep complete, {} devices", results.len());
        Ok(results)
    }

    fn collect(
        &self,
        record: DeviceRecord,
        seen: &mut HashSet<String>,
        results: &mut Vec<SweptDevice>,
    ) {
        if seen.contains(&record.address) {
            return;
        }
        if self.settings.printer_filter && !record.is_likely_printer() {
            debug!(
                "Ignoring {} ({}): {}",
                record.name,
                record.address,
                record.major_class().label()
            );
            return;
        }
        seen.insert(record.address.clone());
        results.push(SweptDevice {
            record,
            paired: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::BluetoothAddress;
    use crate::domain::device_class::ClassOfDevice;
    use crate::domain::models::{AppEvent, DiscoveryState, RemoteDevice};
    use crate::domain::permissions::AssumeGranted;
    use crate::infrastructure::bluetooth::fake::FakeRadio;
    use crate::infrastructure::bluetooth::radio::UnavailableRadio;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn device(addr: &str, name: &str, class: u32) -> RemoteDevice {
        RemoteDevice::new(addr.parse::<BluetoothAddress>().unwrap())
            .with_name(name)
            .with_class(ClassOfDevice::from_raw(class))
    }

    fn settings(window_ms: u64) -> DiscoverySettings {
        DiscoverySettings {
            scan_window_ms: window_ms,
            ..DiscoverySettings::default()
        }
    }

    fn service(radio: Arc<FakeRadio>) -> (BluetoothService, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BluetoothService::new(radio, Arc::new(AssumeGranted), tx), rx)
    }

    /// Emit once the sweep has registered its listener.
    async fn emit_when_listening(radio: Arc<FakeRadio>, devices: Vec<RemoteDevice>) {
        while radio.listener_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for d in devices {
            radio.emit_found(d, None);
        }
    }

    #[tokio::test]
    async fn test_sweep_merges_filters_and_dedups() {
        let radio = Arc::new(FakeRadio::new());
        radio.add_bonded(device("AA:BB:CC:DD:EE:01", "Paired Printer", 0x0680));
        let (service, _rx) = service(radio.clone());

        let emitter = tokio::spawn(emit_when_listening(
            radio.clone(),
            vec![
                device("AA:BB:CC:DD:EE:01", "Paired Printer", 0x0680),
                device("AA:BB:CC:DD:EE:02", "Thermal", 0x0680),
                device("AA:BB:CC:DD:EE:03", "Phone", 0x020C),
                device("AA:BB:CC:DD:EE:02", "Thermal", 0x0680),
                device("AA:BB:CC:DD:EE:04", "Scanner", 0x1F00),
            ],
        ));

        let results = DeviceSweep::new(&service, settings(300)).run().await.unwrap();
        emitter.await.unwrap();

        let addresses: Vec<_> = results.iter().map(|d| d.record.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["AA:BB:CC:DD:EE:01", "AA:BB:CC:DD:EE:02", "AA:BB:CC:DD:EE:04"]
        );
        assert!(results[0].paired);
        assert!(!results[1].paired);

        assert_eq!(service.discovery_state().await, DiscoveryState::Idle);
        assert_eq!(radio.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_without_filter_keeps_everything() {
        let radio = Arc::new(FakeRadio::new());
        let (service, _rx) = service(radio.clone());

        let emitter = tokio::spawn(emit_when_listening(
            radio.clone(),
            vec![device("AA:BB:CC:DD:EE:03", "Phone", 0x020C)],
        ));

        let settings = DiscoverySettings {
            printer_filter: false,
            ..settings(200)
        };
        let results = DeviceSweep::new(&service, settings).run().await.unwrap();
        emitter.await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.device_class, 512);
    }

    #[tokio::test]
    async fn test_sweep_falls_back_to_bonded() {
        let radio = Arc::new(FakeRadio::new());
        radio.add_bonded(device("AA:BB:CC:DD:EE:01", "Paired Printer", 0x0680));
        radio.set_scan_result(Err(BluetoothError::platform("inquiry busy")));
        let (service, _rx) = service(radio.clone());

        let results = DeviceSweep::new(&service, settings(5_000)).run().await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].paired);
        assert_eq!(radio.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_with_radio_off_is_empty() {
        let radio = Arc::new(FakeRadio::new());
        radio.set_enabled(false);
        radio.add_bonded(device("AA:BB:CC:DD:EE:01", "Paired Printer", 0x0680));
        let (service, _rx) = service(radio.clone());

        let results = DeviceSweep::new(&service, settings(5_000)).run().await.unwrap();
        assert!(results.is_empty());
        assert_eq!(radio.registrations(), 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_running_session_open() {
        let radio = Arc::new(FakeRadio::new());
        let (service, _rx) = service(radio.clone());
        service.start_discovery().await.unwrap();

        // The listener already exists, so give the sweep time to subscribe.
        let emitter = tokio::spawn({
            let radio = radio.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                radio.emit_found(device("AA:BB:CC:DD:EE:02", "Thermal", 0x0680), None);
            }
        });
        let results = DeviceSweep::new(&service, settings(300)).run().await.unwrap();
        emitter.await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(service.discovery_state().await, DiscoveryState::Scanning);
        assert_eq!(radio.listener_count(), 1);
        assert_eq!(radio.registrations(), 1);
        assert_eq!(radio.cancels(), 0);
    }

    #[tokio::test]
    async fn test_sweep_without_radio() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = BluetoothService::new(Arc::new(UnavailableRadio), Arc::new(AssumeGranted), tx);
        let result = DeviceSweep::new(&service, settings(100)).run().await;
        assert_eq!(result, Err(BluetoothError::NoRadio));
    }
}
