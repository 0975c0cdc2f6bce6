//! Command worker
//!
//! Runs the [`BluetoothService`] on its own thread with a current-thread
//! tokio runtime so the UI thread never blocks on radio calls. Commands go in
//! over a channel; every outcome comes back as [`AppEvent::CommandResult`].

use super::radio::{platform_radio, RadioHandle};
use super::service::BluetoothService;
use crate::domain::models::{AppEvent, BluetoothCommand, MessageSeverity, StatusMessage};
use crate::domain::permissions::PermissionGate;
use crate::domain::settings::DiscoverySettings;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

enum RadioSource {
    Platform,
    Provided(Arc<dyn RadioHandle>),
}

/// Start the worker on the host's radio.
pub fn spawn_worker(
    permissions: Arc<dyn PermissionGate>,
    discovery: DiscoverySettings,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<BluetoothCommand>> {
    spawn(RadioSource::Platform, permissions, discovery, events)
}

/// Start the worker on a given radio.
pub fn spawn_worker_with_radio(
    radio: Arc<dyn RadioHandle>,
    permissions: Arc<dyn PermissionGate>,
    discovery: DiscoverySettings,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<BluetoothCommand>> {
    spawn(RadioSource::Provided(radio), permissions, discovery, events)
}

fn spawn(
    source: RadioSource,
    permissions: Arc<dyn PermissionGate>,
    discovery: DiscoverySettings,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<BluetoothCommand>> {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<BluetoothCommand>();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("bluetooth-worker".to_string())
        .spawn(move || {
            rt.block_on(async move {
                let radio = match source {
                    RadioSource::Platform => platform_radio().await,
                    RadioSource::Provided(radio) => radio,
                };
                let service = Arc::new(
                    BluetoothService::new(radio, permissions, events.clone())
                        .with_discovery_settings(discovery),
                );
                info!("Bluetooth worker ready");

                if let Err(e) = service.monitor_radio_state() {
                    warn!("Not following radio state: {}", e);
                }

                // One task per command so a running sweep can still be stopped.
                while let Some(cmd) = cmd_rx.recv().await {
                    let service = service.clone();
                    let events = events.clone();
                    tokio::spawn(async move {
                        let result = service.execute(cmd.clone()).await;
                        if let Err(e) = &result {
                            error!("{:?} failed: {}", cmd, e);
                            let _ = events.send(AppEvent::LogMessage(StatusMessage {
                                message: format!("{} failed: {}", cmd.label(), e),
                                severity: MessageSeverity::Error,
                            }));
                        }
                        let _ = events.send(AppEvent::CommandResult(result));
                    });
                }

                if let Err(e) = service.stop_discovery().await {
                    error!("Failed to stop discovery on shutdown: {}", e);
                }
                info!("Bluetooth worker stopped");
            });
        })?;

    Ok(cmd_tx)
}
