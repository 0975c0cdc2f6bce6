//! Bluetooth Service Module
//!
//! Command surface for the host application. Checks the permissions each
//! command declares, then delegates to the radio, the discovery session or
//! the pairing coordinator. Every command resolves to a value or one
//! [`BluetoothError`] kind.

use super::discovery::DiscoveryManager;
use super::pairing::PairingCoordinator;
use super::radio::RadioHandle;
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{
    AppEvent, BluetoothCommand, CommandReply, DeviceRecord, DiscoveryState,
};
use crate::domain::normalizer::normalize_remote;
use crate::domain::permissions::PermissionGate;
use crate::domain::settings::DiscoverySettings;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Poll interval for radios that cannot push power changes.
const POWER_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BluetoothService {
    radio: Arc<dyn RadioHandle>,
    discovery: DiscoveryManager,
    pairing: PairingCoordinator,
    permissions: Arc<dyn PermissionGate>,
    discovery_settings: DiscoverySettings,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl BluetoothService {
    pub fn new(
        radio: Arc<dyn RadioHandle>,
        permissions: Arc<dyn PermissionGate>,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            discovery: DiscoveryManager::new(radio.clone(), event_sender.clone()),
            pairing: PairingCoordinator::new(radio.clone()),
            radio,
            permissions,
            discovery_settings: DiscoverySettings::default(),
            event_sender,
        }
    }

    pub fn with_discovery_settings(mut self, settings: DiscoverySettings) -> Self {
        self.discovery_settings = settings;
        self
    }

    fn ensure_ready(&self, command: &BluetoothCommand) -> BluetoothResult<()> {
        if !self.radio.is_present() {
            return Err(BluetoothError::NoRadio);
        }
        self.permissions.check(command)
    }

    /// Report whether the radio is on. Does not try to switch it on.
    pub async fn enable_bluetooth(&self) -> BluetoothResult<bool> {
        self.ensure_ready(&BluetoothCommand::CheckEnabled)?;
        let enabled = self.radio.is_enabled().await?;
        debug!("Radio enabled: {}", enabled);
        Ok(enabled)
    }

    /// Wait until the radio is on or `timeout` passes. Resolves to whether
    /// it came on; never tries to switch it on itself.
    pub async fn wait_for_enabled(&self, timeout: Duration) -> BluetoothResult<bool> {
        let command = BluetoothCommand::WaitForRadio(timeout.as_millis() as u64);
        self.ensure_ready(&command)?;
        if self.radio.is_enabled().await? {
            return Ok(true);
        }

        match self.radio.watch_power() {
            Ok(mut power) => {
                let reached = tokio::time::timeout(timeout, power.wait_for(|on| *on))
                    .await
                    .map(|changed| changed.is_ok());
                Ok(matches!(reached, Ok(true)))
            }
            Err(BluetoothError::Unsupported(_)) => {
                debug!("No power notifications, polling the radio");
                let polled = tokio::time::timeout(timeout, async {
                    loop {
                        tokio::time::sleep(POWER_POLL_INTERVAL).await;
                        if self.radio.is_enabled().await? {
                            return Ok::<_, BluetoothError>(());
                        }
                    }
                })
                .await;
                match polled {
                    Ok(result) => result.map(|()| true),
                    Err(_) => Ok(false),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Forward radio on/off changes as [`AppEvent::RadioStateChanged`]
    /// until the radio goes away.
    pub fn monitor_radio_state(&self) -> BluetoothResult<JoinHandle<()>> {
        if !self.radio.is_present() {
            return Err(BluetoothError::NoRadio);
        }
        let mut power = self.radio.watch_power()?;
        let event_sender = self.event_sender.clone();

        Ok(tokio::spawn(async move {
            while power.changed().await.is_ok() {
                let enabled = *power.borrow_and_update();
                info!("Radio is now {}", if enabled { "on" } else { "off" });
                if event_sender
                    .send(AppEvent::RadioStateChanged { enabled })
                    .is_err()
                {
                    break;
                }
            }
        }))
    }

    /// Snapshot of bonded devices, order unspecified.
    pub async fn get_paired_devices(&self) -> BluetoothResult<Vec<DeviceRecord>> {
        self.ensure_ready(&BluetoothCommand::GetPairedDevices)?;
        let devices = self.radio.bonded_devices().await?;
        debug!("{} bonded devices", devices.len());
        Ok(devices.iter().map(normalize_remote).collect())
    }

    pub async fn start_discovery(&self) -> BluetoothResult<bool> {
        self.ensure_ready(&BluetoothCommand::StartDiscovery)?;
        self.discovery.start_discovery().await
    }

    pub async fn stop_discovery(&self) -> BluetoothResult<bool> {
        self.ensure_ready(&BluetoothCommand::StopDiscovery)?;
        self.discovery.stop_discovery().await
    }

    pub async fn discovery_state(&self) -> DiscoveryState {
        self.discovery.state().await
    }

    pub async fn pair_device(&self, address: &str) -> BluetoothResult<bool> {
        self.ensure_ready(&BluetoothCommand::Pair(address.to_string()))?;
        self.pairing.pair_device(address).await
    }

    /// Always `false`: bond removal is not performed.
    pub async fn unpair_device(&self, address: &str) -> BluetoothResult<bool> {
        self.ensure_ready(&BluetoothCommand::Unpair(address.to_string()))?;
        Ok(self.pairing.unpair_device(address).performed())
    }

    /// Lazy stream of normalized found devices.
    pub fn devices(&self) -> BoxStream<'static, DeviceRecord> {
        self.discovery.devices()
    }

    /// Run one command and package its outcome for the host.
    pub async fn execute(&self, command: BluetoothCommand) -> BluetoothResult<CommandReply> {
        info!("Executing {:?}", command);
        match command {
            BluetoothCommand::CheckEnabled => {
                self.enable_bluetooth().await.map(CommandReply::RadioEnabled)
            }
            BluetoothCommand::WaitForRadio(timeout_ms) => self
                .wait_for_enabled(Duration::from_millis(timeout_ms))
                .await
                .map(CommandReply::RadioEnabled),
            BluetoothCommand::GetPairedDevices => self
                .get_paired_devices()
                .await
                .map(CommandReply::PairedDevices),
            BluetoothCommand::StartDiscovery => self
                .start_discovery()
                .await
                .map(CommandReply::DiscoveryStarted),
            BluetoothCommand::StopDiscovery => self
                .stop_discovery()
                .await
                .map(CommandReply::DiscoveryStopped),
            BluetoothCommand::Pair(address) => {
                let initiated = self.pair_device(&address).await?;
                Ok(CommandReply::PairRequested { address, initiated })
            }
            BluetoothCommand::Unpair(address) => {
                let performed = self.unpair_device(&address).await?;
                Ok(CommandReply::UnpairRequested { address, performed })
            }
            BluetoothCommand::Sweep => {
                self.ensure_ready(&BluetoothCommand::Sweep)?;
                let settings = self.discovery_settings.clone();
                super::sweep::DeviceSweep::new(self, settings)
                    .run()
                    .await
                    .map(CommandReply::SweepCompleted)
            }
        }
    }
}
