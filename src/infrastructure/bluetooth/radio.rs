//! Radio Handle
//!
//! Query/command surface over the host's Bluetooth adapter. The adapter is a
//! process-wide singleton, so implementations are shared behind an `Arc` and
//! every scan start/cancel is visible to all other users of the same radio.

use crate::domain::address::BluetoothAddress;
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{RadioEvent, RemoteDevice};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Where a registered listener receives radio notifications.
pub type RadioEventSink = mpsc::UnboundedSender<RadioEvent>;

/// Identifies one listener registration with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub i64);

#[async_trait]
pub trait RadioHandle: Send + Sync {
    /// Whether an adapter exists at all.
    fn is_present(&self) -> bool {
        true
    }

    /// Current power state. Never tries to switch the radio on.
    async fn is_enabled(&self) -> BluetoothResult<bool>;

    /// Snapshot of the OS pairing database.
    async fn bonded_devices(&self) -> BluetoothResult<Vec<RemoteDevice>>;

    /// Look up a device handle for an address. `Ok(None)` means the platform
    /// can't produce a handle; reachability is not checked.
    async fn resolve_address(
        &self,
        address: &BluetoothAddress,
    ) -> BluetoothResult<Option<RemoteDevice>>;

    /// Ask the OS to start bonding. `true` means the request was accepted,
    /// not that the bond completed.
    async fn create_bond(&self, device: &RemoteDevice) -> BluetoothResult<bool>;

    /// Ask the OS to start an inquiry. Returns whether the request was accepted.
    async fn start_scan(&self) -> BluetoothResult<bool>;

    /// Cancel the running inquiry. No-op when nothing is running.
    async fn cancel_scan(&self) -> BluetoothResult<()>;

    fn is_scanning(&self) -> bool;

    /// Start delivering found-device notifications to `sink`.
    fn register_listener(&self, sink: RadioEventSink) -> BluetoothResult<ListenerId>;

    /// Stop delivering to a listener. Returns
    /// [`BluetoothError::ListenerNotRegistered`] for unknown ids.
    fn unregister_listener(&self, id: ListenerId) -> BluetoothResult<()>;

    /// Follow the power state. The receiver holds the current state and is
    /// updated whenever the radio is switched on or off.
    fn watch_power(&self) -> BluetoothResult<watch::Receiver<bool>> {
        Err(BluetoothError::Unsupported(
            "radio state notifications".to_string(),
        ))
    }
}

/// Stand-in used when the host has no Bluetooth support at all.
#[derive(Debug, Default)]
pub struct UnavailableRadio;

#[async_trait]
impl RadioHandle for UnavailableRadio {
    fn is_present(&self) -> bool {
        false
    }

    async fn is_enabled(&self) -> BluetoothResult<bool> {
        Err(BluetoothError::NoRadio)
    }

    async fn bonded_devices(&self) -> BluetoothResult<Vec<RemoteDevice>> {
        Err(BluetoothError::NoRadio)
    }

    async fn resolve_address(
        &self,
        _address: &BluetoothAddress,
    ) -> BluetoothResult<Option<RemoteDevice>> {
        Err(BluetoothError::NoRadio)
    }

    async fn create_bond(&self, _device: &RemoteDevice) -> BluetoothResult<bool> {
        Err(BluetoothError::NoRadio)
    }

    async fn start_scan(&self) -> BluetoothResult<bool> {
        Err(BluetoothError::NoRadio)
    }

    async fn cancel_scan(&self) -> BluetoothResult<()> {
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        false
    }

    fn register_listener(&self, _sink: RadioEventSink) -> BluetoothResult<ListenerId> {
        Err(BluetoothError::NoRadio)
    }

    fn unregister_listener(&self, _id: ListenerId) -> BluetoothResult<()> {
        Err(BluetoothError::ListenerNotRegistered)
    }

    fn watch_power(&self) -> BluetoothResult<watch::Receiver<bool>> {
        Err(BluetoothError::NoRadio)
    }
}

/// Radio for the current host, or [`UnavailableRadio`] when none is usable.
pub async fn platform_radio() -> Arc<dyn RadioHandle> {
    #[cfg(windows)]
    {
        match super::winrt::WindowsRadio::new().await {
            Ok(radio) => return Arc::new(radio),
            Err(e) => tracing::warn!("Bluetooth unavailable: {}", e),
        }
    }

    #[cfg(not(windows))]
    tracing::info!("No Bluetooth backend for this platform");

    Arc::new(UnavailableRadio)
}
