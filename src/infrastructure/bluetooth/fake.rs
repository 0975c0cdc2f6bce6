//! In-memory radio for tests

use super::radio::{ListenerId, RadioEventSink, RadioHandle};
use crate::domain::address::BluetoothAddress;
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{RadioEvent, RawFoundEvent, RemoteDevice};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

struct FakeState {
    enabled: bool,
    bonded: Vec<RemoteDevice>,
    known: HashMap<BluetoothAddress, RemoteDevice>,
    bond_result: BluetoothResult<bool>,
    scan_result: BluetoothResult<bool>,
    cancel_result: BluetoothResult<()>,
    unregister_error: Option<BluetoothError>,
    scanning: bool,
    listeners: HashMap<ListenerId, RadioEventSink>,
    next_id: i64,
    registrations: usize,
    cancels: usize,
    bond_requests: Vec<BluetoothAddress>,
    power_notifications: bool,
}

pub(crate) struct FakeRadio {
    state: Mutex<FakeState>,
    power: watch::Sender<bool>,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                enabled: true,
                bonded: Vec::new(),
                known: HashMap::new(),
                bond_result: Ok(true),
                scan_result: Ok(true),
                cancel_result: Ok(()),
                unregister_error: None,
                scanning: false,
                listeners: HashMap::new(),
                next_id: 1,
                registrations: 0,
                cancels: 0,
                bond_requests: Vec::new(),
                power_notifications: true,
            }),
            power: watch::channel(true).0,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Flip the power state, notifying power watchers.
    pub fn set_enabled(&self, enabled: bool) {
        self.with(|s| s.enabled = enabled);
        self.power.send_replace(enabled);
    }

    /// Behave like a platform that cannot report power changes.
    pub fn without_power_notifications(self) -> Self {
        self.with(|s| s.power_notifications = false);
        self
    }

    pub fn add_bonded(&self, device: RemoteDevice) {
        self.with(|s| {
            s.known.insert(device.address, device.clone());
            s.bonded.push(device);
        });
    }

    pub fn add_known(&self, device: RemoteDevice) {
        self.with(|s| {
            s.known.insert(device.address, device);
        });
    }

    pub fn set_bond_result(&self, result: BluetoothResult<bool>) {
        self.with(|s| s.bond_result = result);
    }

    pub fn set_scan_result(&self, result: BluetoothResult<bool>) {
        self.with(|s| s.scan_result = result);
    }

    pub fn set_cancel_result(&self, result: BluetoothResult<()>) {
        self.with(|s| s.cancel_result = result);
    }

    pub fn set_unregister_error(&self, error: Option<BluetoothError>) {
        self.with(|s| s.unregister_error = error);
    }

    /// Platform stopped the inquiry on its own.
    pub fn end_scan(&self) {
        self.emit(RadioEvent::ScanFinished);
        self.with(|s| s.scanning = false);
    }

    pub fn emit(&self, event: RadioEvent) {
        self.with(|s| {
            for sink in s.listeners.values() {
                let _ = sink.send(event.clone());
            }
        });
    }

    pub fn emit_found(&self, device: RemoteDevice, name: Option<&str>) {
        self.emit(RadioEvent::Found(RawFoundEvent {
            device,
            name: name.map(str::to_string),
        }));
    }

    pub fn listener_count(&self) -> usize {
        self.with(|s| s.listeners.len())
    }

    pub fn registrations(&self) -> usize {
        self.with(|s| s.registrations)
    }

    pub fn cancels(&self) -> usize {
        self.with(|s| s.cancels)
    }

    pub fn bond_requests(&self) -> Vec<BluetoothAddress> {
        self.with(|s| s.bond_requests.clone())
    }
}

#[async_trait]
impl RadioHandle for FakeRadio {
    async fn is_enabled(&self) -> BluetoothResult<bool> {
        Ok(self.with(|s| s.enabled))
    }

    async fn bonded_devices(&self) -> BluetoothResult<Vec<RemoteDevice>> {
        Ok(self.with(|s| s.bonded.clone()))
    }

    async fn resolve_address(
        &self,
        address: &BluetoothAddress,
    ) -> BluetoothResult<Option<RemoteDevice>> {
        Ok(self.with(|s| s.known.get(address).cloned()))
    }

    async fn create_bond(&self, device: &RemoteDevice) -> BluetoothResult<bool> {
        self.with(|s| {
            s.bond_requests.push(device.address);
            s.bond_result.clone()
        })
    }

    async fn start_scan(&self) -> BluetoothResult<bool> {
        self.with(|s| {
            let result = s.scan_result.clone();
            if let Ok(accepted) = result {
                s.scanning = accepted;
            }
            result
        })
    }

    async fn cancel_scan(&self) -> BluetoothResult<()> {
        self.with(|s| {
            s.cancels += 1;
            let result = s.cancel_result.clone();
            if result.is_ok() {
                s.scanning = false;
            }
            result
        })
    }

    fn is_scanning(&self) -> bool {
        self.with(|s| s.scanning)
    }

    fn register_listener(&self, sink: RadioEventSink) -> BluetoothResult<ListenerId> {
        Ok(self.with(|s| {
            let id = ListenerId(s.next_id);
            s.next_id += 1;
            s.registrations += 1;
            s.listeners.insert(id, sink);
            id
        }))
    }

    fn unregister_listener(&self, id: ListenerId) -> BluetoothResult<()> {
        self.with(|s| {
            if let Some(error) = s.unregister_error.clone() {
                return Err(error);
            }
            s.listeners
                .remove(&id)
                .map(|_| ())
                .ok_or(BluetoothError::ListenerNotRegistered)
        })
    }

    fn watch_power(&self) -> BluetoothResult<watch::Receiver<bool>> {
        if !self.with(|s| s.power_notifications) {
            return Err(BluetoothError::Unsupported(
                "radio state notifications".to_string(),
            ));
        }
        Ok(self.power.subscribe())
    }
}
