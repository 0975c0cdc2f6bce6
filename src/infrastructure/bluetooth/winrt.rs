//! WinRT radio backend
//!
//! Classic Bluetooth through `Windows.Devices.Bluetooth` and
//! `Windows.Devices.Enumeration`. Discovery runs a `DeviceWatcher` over
//! unpaired devices; each registered listener is one `Added` handler on it.
//! Power changes come from the adapter's `Radio::StateChanged`.

use super::radio::{ListenerId, RadioEventSink, RadioHandle};
use crate::domain::address::BluetoothAddress;
use crate::domain::device_class::ClassOfDevice;
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{RadioEvent, RawFoundEvent, RemoteDevice};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use windows::core::{IInspectable, HSTRING};
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothDevice};
use windows::Devices::Enumeration::{
    DeviceAccessInformation, DeviceAccessStatus, DeviceInformation, DevicePairingResultStatus,
    DeviceWatcher, DeviceWatcherStatus,
};
use windows::Devices::Radios::{Radio, RadioState};
use windows::Foundation::TypedEventHandler;
use windows::Win32::Foundation::E_ACCESSDENIED;

impl From<windows::core::Error> for BluetoothError {
    fn from(e: windows::core::Error) -> Self {
        if e.code() == E_ACCESSDENIED {
            BluetoothError::PermissionDenied(e.message())
        } else {
            BluetoothError::Platform(e.message())
        }
    }
}

struct Registration {
    sink: RadioEventSink,
    stopped_token: i64,
}

type Registrations = Arc<Mutex<HashMap<ListenerId, Registration>>>;

struct PowerMonitor {
    radio: Radio,
    token: i64,
    state: Arc<watch::Sender<bool>>,
}

pub struct WindowsRadio {
    adapter: BluetoothAdapter,
    watcher: DeviceWatcher,
    /// Set while a stop we asked for is in flight, so `Stopped` is not
    /// reported as the platform ending the scan.
    stop_requested: Arc<AtomicBool>,
    listeners: Registrations,
    power: Option<PowerMonitor>,
}

impl WindowsRadio {
    /// Bind to the default adapter. Hosts without one get [`BluetoothError::NoRadio`].
    pub async fn new() -> BluetoothResult<Self> {
        let adapter = BluetoothAdapter::GetDefaultAsync()?
            .await
            .map_err(|e| {
                debug!("No default Bluetooth adapter: {}", e);
                BluetoothError::NoRadio
            })?;

        if !adapter.IsClassicSupported()? {
            info!("Default adapter has no classic Bluetooth support");
            return Err(BluetoothError::NoRadio);
        }

        let selector = BluetoothDevice::GetDeviceSelectorFromPairingState(false)?;
        let watcher = DeviceInformation::CreateWatcherAqsFilter(&selector)?;

        info!("Using Bluetooth adapter {}", adapter.DeviceId()?);

        let power = match Self::monitor_power(&adapter).await {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                warn!("Radio state notifications unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            adapter,
            watcher,
            stop_requested: Arc::new(AtomicBool::new(false)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            power,
        })
    }

    async fn monitor_power(adapter: &BluetoothAdapter) -> BluetoothResult<PowerMonitor> {
        let radio = adapter.GetRadioAsync()?.await?;
        let (state, _) = watch::channel(radio.State()? == RadioState::On);
        let state = Arc::new(state);

        let sender = state.clone();
        let handler = TypedEventHandler::new(
            move |radio: windows::core::Ref<Radio>, _: windows::core::Ref<IInspectable>| {
                if let Some(radio) = radio.as_ref() {
                    let on = radio.State()? == RadioState::On;
                    if *sender.borrow() != on {
                        info!("Radio switched {}", if on { "on" } else { "off" });
                    }
                    sender.send_replace(on);
                }
                Ok(())
            },
        );
        let token = radio.StateChanged(&handler)?;

        Ok(PowerMonitor {
            radio,
            token,
            state,
        })
    }

    fn lock_listeners(
        listeners: &Registrations,
    ) -> BluetoothResult<std::sync::MutexGuard<'_, HashMap<ListenerId, Registration>>> {
        listeners
            .lock()
            .map_err(|_| BluetoothError::platform("Listener table lock poisoned"))
    }

    fn stop_watcher(&self) -> BluetoothResult<()> {
        if self.is_scanning() {
            info!("Stopping device watcher");
            self.stop_requested.store(true, Ordering::SeqCst);
            self.watcher.Stop()?;
        }
        Ok(())
    }

    fn broadcast(listeners: &Registrations, event: RadioEvent) {
        if let Ok(listeners) = listeners.lock() {
            for registration in listeners.values() {
                let _ = registration.sink.send(event.clone());
            }
        }
    }
}

async fn remote_from_id(id: &HSTRING) -> BluetoothResult<RemoteDevice> {
    let device = BluetoothDevice::FromIdAsync(id)?.await?;
    remote_from_device(&device)
}

fn remote_from_device(device: &BluetoothDevice) -> BluetoothResult<RemoteDevice> {
    let address = BluetoothAddress::from_u64(device.BluetoothAddress()?);
    let mut remote = RemoteDevice::new(address);

    let name = device.Name()?.to_string();
    if !name.is_empty() {
        remote = remote.with_name(name);
    }
    if let Ok(class) = device.ClassOfDevice() {
        remote = remote.with_class(ClassOfDevice::from_raw(class.RawValue()?));
    }
    Ok(remote)
}

#[async_trait]
impl RadioHandle for WindowsRadio {
    async fn is_enabled(&self) -> BluetoothResult<bool> {
        let radio = self.adapter.GetRadioAsync()?.await?;
        Ok(radio.State()? == RadioState::On)
    }

    async fn bonded_devices(&self) -> BluetoothResult<Vec<RemoteDevice>> {
        let selector = BluetoothDevice::GetDeviceSelectorFromPairingState(true)?;
        let infos = DeviceInformation::FindAllAsyncAqsFilter(&selector)?.await?;

        let mut devices = Vec::new();
        for i in 0..infos.Size()? {
            let info = infos.GetAt(i)?;
            match remote_from_id(&info.Id()?).await {
                Ok(device) => devices.push(device),
                Err(e) => warn!("Skipping bonded device {}: {}", info.Id()?, e),
            }
        }
        Ok(devices)
    }

    async fn resolve_address(
        &self,
        address: &BluetoothAddress,
    ) -> BluetoothResult<Option<RemoteDevice>> {
        match BluetoothDevice::FromBluetoothAddressAsync(address.to_u64())?.await {
            Ok(device) => Ok(Some(remote_from_device(&device)?)),
            Err(e) if e.code() == E_ACCESSDENIED => Err(e.into()),
            Err(e) => {
                debug!("No device handle for {}: {}", address, e);
                Ok(None)
            }
        }
    }

    async fn create_bond(&self, device: &RemoteDevice) -> BluetoothResult<bool> {
        let handle = BluetoothDevice::FromBluetoothAddressAsync(device.address.to_u64())?.await?;
        let info = handle.DeviceInformation()?;

        let access = DeviceAccessInformation::CreateFromId(&info.Id()?)?.CurrentStatus()?;
        if access == DeviceAccessStatus::DeniedByUser || access == DeviceAccessStatus::DeniedBySystem
        {
            return Err(BluetoothError::permission(format!(
                "Access to {} denied ({:?})",
                device.address, access
            )));
        }

        let pairing = info.Pairing()?;
        if pairing.IsPaired()? {
            info!("{} is already bonded", device.address);
            return Ok(false);
        }
        if !pairing.CanPair()? {
            info!("{} does not accept pairing", device.address);
            return Ok(false);
        }

        let operation = pairing.PairAsync()?;
        let listeners = self.listeners.clone();
        let address = device.address;

        tokio::spawn(async move {
            let bonded = match operation.await.and_then(|result| result.Status()) {
                Ok(status) => {
                    info!("Bond with {} finished: {:?}", address, status);
                    status == DevicePairingResultStatus::Paired
                        || status == DevicePairingResultStatus::AlreadyPaired
                }
                Err(e) => {
                    warn!("Bond with {} failed: {}", address, e);
                    false
                }
            };
            WindowsRadio::broadcast(&listeners, RadioEvent::BondStateChanged { address, bonded });
        });

        Ok(true)
    }

    async fn start_scan(&self) -> BluetoothResult<bool> {
        match self.watcher.Status()? {
            DeviceWatcherStatus::Started | DeviceWatcherStatus::EnumerationCompleted => Ok(true),
            DeviceWatcherStatus::Stopping => {
                debug!("Watcher still stopping, scan request declined");
                Ok(false)
            }
            _ => {
                self.stop_requested.store(false, Ordering::SeqCst);
                self.watcher.Start()?;
                Ok(true)
            }
        }
    }

    async fn cancel_scan(&self) -> BluetoothResult<()> {
        self.stop_watcher()
    }

    fn is_scanning(&self) -> bool {
        matches!(
            self.watcher.Status(),
            Ok(DeviceWatcherStatus::Started) | Ok(DeviceWatcherStatus::EnumerationCompleted)
        )
    }

    fn register_listener(&self, sink: RadioEventSink) -> BluetoothResult<ListenerId> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BluetoothError::platform(format!("No async runtime: {}", e)))?;

        let (added_tx, mut added_rx) = mpsc::unbounded_channel::<(HSTRING, String)>();
        let added = TypedEventHandler::new(
            move |_: windows::core::Ref<DeviceWatcher>,
                  info: windows::core::Ref<DeviceInformation>| {
                if let Some(info) = info.as_ref() {
                    let _ = added_tx.send((info.Id()?, info.Name()?.to_string()));
                }
                Ok(())
            },
        );

        // EnumerationCompleted only ends the initial pass; the watcher keeps
        // reporting arrivals until it is stopped.
        let stopped_sink = sink.clone();
        let stop_requested = self.stop_requested.clone();
        let stopped = TypedEventHandler::new(
            move |_: windows::core::Ref<DeviceWatcher>, _: windows::core::Ref<IInspectable>| {
                if !stop_requested.load(Ordering::SeqCst) {
                    let _ = stopped_sink.send(RadioEvent::ScanFinished);
                }
                Ok(())
            },
        );

        let id = ListenerId(self.watcher.Added(&added)?);
        let stopped_token = match self.watcher.Stopped(&stopped) {
            Ok(token) => token,
            Err(e) => {
                let _ = self.watcher.RemoveAdded(id.0);
                return Err(e.into());
            }
        };

        // Device lookups are sequential so found events keep watcher order.
        // The task ends once the `Added` handler, and with it `added_tx`, is
        // dropped on unregister.
        let found_sink = sink.clone();
        runtime.spawn(async move {
            while let Some((device_id, name)) = added_rx.recv().await {
                match remote_from_id(&device_id).await {
                    Ok(device) => {
                        let _ = found_sink.send(RadioEvent::Found(RawFoundEvent {
                            device,
                            name: Some(name),
                        }));
                    }
                    Err(e) => debug!("Could not open {}: {}", device_id, e),
                }
            }
        });

        Self::lock_listeners(&self.listeners)?.insert(
            id,
            Registration {
                sink,
                stopped_token,
            },
        );
        debug!("Watcher listener {:?} registered", id);
        Ok(id)
    }

    fn unregister_listener(&self, id: ListenerId) -> BluetoothResult<()> {
        let registration = Self::lock_listeners(&self.listeners)?
            .remove(&id)
            .ok_or(BluetoothError::ListenerNotRegistered)?;

        self.watcher.RemoveAdded(id.0)?;
        self.watcher.RemoveStopped(registration.stopped_token)?;
        Ok(())
    }

    fn watch_power(&self) -> BluetoothResult<watch::Receiver<bool>> {
        match &self.power {
            Some(monitor) => Ok(monitor.state.subscribe()),
            None => Err(BluetoothError::Unsupported(
                "radio state notifications".to_string(),
            )),
        }
    }
}

impl Drop for WindowsRadio {
    fn drop(&mut self) {
        let _ = self.stop_watcher();
        if let Some(monitor) = &self.power {
            let _ = monitor.radio.RemoveStateChanged(monitor.token);
        }
    }
}
