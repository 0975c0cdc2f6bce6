//! Discovery Session Manager
//!
//! Owns the `Idle -> Scanning -> Idle` lifecycle. Entering `Scanning`
//! registers exactly one listener with the radio; leaving it releases that
//! listener. Start and stop are serialized through the session lock.
//! Notifications the radio delivered before the listener was released are
//! still forwarded when a session stops.

use super::radio::{ListenerId, RadioHandle};
use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::{AppEvent, DeviceRecord, DiscoveryState, RadioEvent};
use crate::domain::normalizer::normalize;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEVICE_STREAM_CAPACITY: usize = 256;

/// Listener registration held for the lifetime of one session.
struct ListenerSubscription {
    id: ListenerId,
    /// Tells the forwarder to flush what is queued and exit.
    stop: oneshot::Sender<()>,
    forwarder: JoinHandle<()>,
}

#[derive(Default)]
struct Session {
    state: DiscoveryState,
    /// What the radio answered to the scan request of this session.
    accepted: bool,
    subscription: Option<ListenerSubscription>,
}

pub struct DiscoveryManager {
    radio: Arc<dyn RadioHandle>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    devices_tx: broadcast::Sender<DeviceRecord>,
    session: Mutex<Session>,
}

impl DiscoveryManager {
    pub fn new(radio: Arc<dyn RadioHandle>, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        let (devices_tx, _) = broadcast::channel(DEVICE_STREAM_CAPACITY);
        Self {
            radio,
            event_sender,
            devices_tx,
            session: Mutex::new(Session::default()),
        }
    }

    /// Begin a discovery session.
    ///
    /// Registers the found-device listener, then asks the radio to scan and
    /// returns whether it accepted. While a session is already running this
    /// returns that session's answer without touching the listener.
    pub async fn start_discovery(&self) -> BluetoothResult<bool> {
        let mut session = self.session.lock().await;

        if session.state == DiscoveryState::Scanning {
            debug!("Discovery already running, keeping the current listener");
            return Ok(session.accepted);
        }

        let subscription = self.subscribe()?;

        match self.radio.start_scan().await {
            Ok(accepted) => {
                info!("Discovery started (accepted by radio: {})", accepted);
                session.state = DiscoveryState::Scanning;
                session.accepted = accepted;
                session.subscription = Some(subscription);
                let _ = self
                    .event_sender
                    .send(AppEvent::DiscoveryState(DiscoveryState::Scanning));
                Ok(accepted)
            }
            Err(e) => {
                warn!("Scan request failed: {}", e);
                if let Err(release_err) = self.release(subscription).await {
                    warn!("Failed to release listener after scan failure: {}", release_err);
                }
                Err(e)
            }
        }
    }

    /// End the current session. Safe to call in any state.
    ///
    /// The session always ends up `Idle`. A cancel failure or a listener
    /// failure other than "not registered" is still returned to the caller.
    pub async fn stop_discovery(&self) -> BluetoothResult<bool> {
        let mut session = self.session.lock().await;

        let cancelled = if self.radio.is_scanning() {
            self.radio.cancel_scan().await
        } else {
            Ok(())
        };

        let released = match session.subscription.take() {
            Some(subscription) => self.release(subscription).await,
            None => Ok(()),
        };

        let was_scanning = session.state == DiscoveryState::Scanning;
        session.state = DiscoveryState::Idle;
        session.accepted = false;

        if was_scanning {
            info!("Discovery stopped");
            let _ = self
                .event_sender
                .send(AppEvent::DiscoveryState(DiscoveryState::Idle));
        }

        cancelled?;
        released?;
        Ok(true)
    }

    pub async fn state(&self) -> DiscoveryState {
        self.session.lock().await.state
    }

    /// Found devices of every later session, in discovery order.
    ///
    /// Nothing is buffered for the caller until this is called; dropping the
    /// stream unsubscribes.
    pub fn devices(&self) -> BoxStream<'static, DeviceRecord> {
        let rx = self.devices_tx.subscribe();
        futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(record) => return Some((record, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Device stream lagged, skipped {} records", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    fn subscribe(&self) -> BluetoothResult<ListenerSubscription> {
        let (sink, mut rx) = mpsc::unbounded_channel();
        let id = self.radio.register_listener(sink)?;
        debug!("Registered discovery listener {:?}", id);

        let event_sender = self.event_sender.clone();
        let devices_tx = self.devices_tx.clone();
        let (stop, mut stop_rx) = oneshot::channel();

        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    event = rx.recv() => match event {
                        Some(event) => dispatch(event, &event_sender, &devices_tx),
                        None => break,
                    },
                    _ = &mut stop_rx => {
                        while let Ok(event) = rx.try_recv() {
                            dispatch(event, &event_sender, &devices_tx);
                        }
                        break;
                    }
                }
            }
        });

        Ok(ListenerSubscription {
            id,
            stop,
            forwarder,
        })
    }

    /// Unregister the listener, then wait until the forwarder has emitted
    /// everything the radio queued before that point.
    async fn release(&self, subscription: ListenerSubscription) -> BluetoothResult<()> {
        let result = self.unregister(subscription.id);
        let _ = subscription.stop.send(());
        if let Err(e) = subscription.forwarder.await {
            warn!("Discovery forwarder ended abnormally: {}", e);
        }
        result
    }

    fn unregister(&self, id: ListenerId) -> BluetoothResult<()> {
        match self.radio.unregister_listener(id) {
            Ok(()) => Ok(()),
            Err(BluetoothError::ListenerNotRegistered) => {
                debug!("Listener {:?} was already released", id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn dispatch(
    event: RadioEvent,
    event_sender: &mpsc::UnboundedSender<AppEvent>,
    devices_tx: &broadcast::Sender<DeviceRecord>,
) {
    match event {
        RadioEvent::Found(raw) => {
            let record = normalize(&raw);
            debug!(
                "Device found: {} ({}) class {}",
                record.name, record.address, record.device_class
            );
            let _ = devices_tx.send(record.clone());
            let _ = event_sender.send(AppEvent::DeviceFound(record));
        }
        RadioEvent::ScanFinished => {
            info!("Radio stopped the inquiry");
            let _ = event_sender.send(AppEvent::DiscoveryFinished);
        }
        RadioEvent::BondStateChanged { address, bonded } => {
            let _ = event_sender.send(AppEvent::BondStateChanged {
                address: address.to_string(),
                bonded,
            });
        }
    }
}

impl Drop for DiscoveryManager {
    fn drop(&mut self) {
        if let Some(subscription) = self.session.get_mut().subscription.take() {
            let _ = self.unregister(subscription.id);
            // The forwarder flushes and exits on its own.
            let _ = subscription.stop.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::BluetoothAddress;
    use crate::domain::models::RemoteDevice;
    use crate::infrastructure::bluetooth::fake::FakeRadio;
    use std::time::Duration;

    fn device(addr: &str) -> RemoteDevice {
        RemoteDevice::new(addr.parse::<BluetoothAddress>().unwrap())
    }

    fn setup() -> (
        Arc<FakeRadio>,
        DiscoveryManager,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let radio = Arc::new(FakeRadio::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = DiscoveryManager::new(radio.clone(), tx);
        (radio, manager, rx)
    }

    async fn next_device(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> DeviceRecord {
        let wait = async {
            loop {
                match rx.recv().await {
                    Some(AppEvent::DeviceFound(record)) => return record,
                    Some(_) => continue,
                    None => panic!("event channel closed"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("no DeviceFound event")
    }

    #[tokio::test]
    async fn test_stop_when_never_started() {
        let (radio, manager, _rx) = setup();
        assert_eq!(manager.stop_discovery().await, Ok(true));
        assert_eq!(manager.state().await, DiscoveryState::Idle);
        assert_eq!(radio.cancels(), 0);
    }

    #[tokio::test]
    async fn test_found_event_is_normalized() {
        let (radio, manager, mut rx) = setup();

        assert_eq!(manager.start_discovery().await, Ok(true));
        assert_eq!(manager.state().await, DiscoveryState::Scanning);
        assert_eq!(radio.listener_count(), 1);

        radio.emit_found(device("00:11:22:33:44:55").with_name("Printer-01"), Some(""));

        let record = next_device(&mut rx).await;
        assert_eq!(
            record,
            DeviceRecord {
                name: "Printer-01".to_string(),
                address: "00:11:22:33:44:55".to_string(),
                device_class: 7936,
            }
        );

        assert_eq!(manager.stop_discovery().await, Ok(true));
        assert_eq!(manager.state().await, DiscoveryState::Idle);
        assert_eq!(radio.listener_count(), 0);
        assert!(!radio.is_scanning());
    }

    #[tokio::test]
    async fn test_second_start_keeps_single_listener() {
        let (radio, manager, mut rx) = setup();

        assert_eq!(manager.start_discovery().await, Ok(true));
        assert_eq!(manager.start_discovery().await, Ok(true));
        assert_eq!(radio.registrations(), 1);
        assert_eq!(radio.listener_count(), 1);

        radio.emit_found(device("00:00:00:00:00:01"), Some("first"));
        radio.emit_found(device("00:00:00:00:00:02"), Some("second"));

        assert_eq!(next_device(&mut rx).await.name, "first");
        assert_eq!(next_device(&mut rx).await.name, "second");
    }

    #[tokio::test]
    async fn test_second_start_reports_first_acceptance() {
        let (radio, manager, _rx) = setup();
        radio.set_scan_result(Ok(false));

        assert_eq!(manager.start_discovery().await, Ok(false));
        radio.set_scan_result(Ok(true));
        assert_eq!(manager.start_discovery().await, Ok(false));
        assert_eq!(radio.registrations(), 1);
    }

    #[tokio::test]
    async fn test_rediscovered_devices_are_not_deduplicated() {
        let (radio, manager, mut rx) = setup();
        manager.start_discovery().await.unwrap();

        radio.emit_found(device("00:00:00:00:00:01"), Some("same"));
        radio.emit_found(device("00:00:00:00:00:01"), Some("same"));

        let first = next_device(&mut rx).await;
        let second = next_device(&mut rx).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_permission_denied_start_leaves_session_idle() {
        let (radio, manager, _rx) = setup();
        radio.set_scan_result(Err(BluetoothError::permission("bluetooth-scan")));

        let err = manager.start_discovery().await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(manager.state().await, DiscoveryState::Idle);
        assert_eq!(radio.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_swallows_unregistered_listener() {
        let (radio, manager, _rx) = setup();
        manager.start_discovery().await.unwrap();
        radio.set_unregister_error(Some(BluetoothError::ListenerNotRegistered));

        assert_eq!(manager.stop_discovery().await, Ok(true));
        assert_eq!(manager.state().await, DiscoveryState::Idle);
    }

    #[tokio::test]
    async fn test_stop_propagates_other_failures_but_resets() {
        let (radio, manager, _rx) = setup();
        manager.start_discovery().await.unwrap();
        radio.set_cancel_result(Err(BluetoothError::platform("radio busy")));

        let err = manager.stop_discovery().await.unwrap_err();
        assert_eq!(err, BluetoothError::platform("radio busy"));
        assert_eq!(manager.state().await, DiscoveryState::Idle);
        assert_eq!(radio.listener_count(), 0);

        // A fresh session can start afterwards.
        radio.set_cancel_result(Ok(()));
        assert_eq!(manager.start_discovery().await, Ok(true));
        assert_eq!(radio.registrations(), 2);
    }

    #[tokio::test]
    async fn test_stop_propagates_release_failure_but_resets() {
        let (radio, manager, _rx) = setup();
        manager.start_discovery().await.unwrap();
        radio.set_unregister_error(Some(BluetoothError::platform("watcher gone")));

        let err = manager.stop_discovery().await.unwrap_err();
        assert_eq!(err, BluetoothError::platform("watcher gone"));
        assert_eq!(manager.state().await, DiscoveryState::Idle);
        assert!(!radio.is_scanning());
    }

    #[tokio::test]
    async fn test_found_right_before_stop_is_delivered() {
        let (radio, manager, mut rx) = setup();
        let mut devices = manager.devices();
        manager.start_discovery().await.unwrap();

        radio.emit_found(device("00:00:00:00:00:09"), Some("late"));
        assert_eq!(manager.stop_discovery().await, Ok(true));

        let mut found = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::DeviceFound(record) = event {
                found.push(record);
            }
        }
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "late");

        // Also already on the device stream when stop returns.
        let record = futures::FutureExt::now_or_never(devices.next())
            .flatten()
            .expect("record queued before stop returned");
        assert_eq!(record.address, "00:00:00:00:00:09");
    }

    #[tokio::test]
    async fn test_nothing_is_forwarded_after_stop() {
        let (radio, manager, mut rx) = setup();
        manager.start_discovery().await.unwrap();
        manager.stop_discovery().await.unwrap();

        radio.emit_found(device("00:00:00:00:00:07"), Some("too late"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, AppEvent::DeviceFound(_)));
        }
    }

    #[tokio::test]
    async fn test_scan_finished_is_reported() {
        let (radio, manager, mut rx) = setup();
        manager.start_discovery().await.unwrap();
        radio.end_scan();

        let finished = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(AppEvent::DiscoveryFinished) = rx.recv().await {
                    return;
                }
            }
        })
        .await;
        assert!(finished.is_ok());

        // Session stays open until stopped; stop does not cancel an idle radio.
        assert_eq!(manager.state().await, DiscoveryState::Scanning);
        assert_eq!(manager.stop_discovery().await, Ok(true));
        assert_eq!(radio.cancels(), 0);
    }

    #[tokio::test]
    async fn test_device_stream_yields_in_order() {
        let (radio, manager, _rx) = setup();
        let mut devices = manager.devices();

        manager.start_discovery().await.unwrap();
        radio.emit_found(device("00:00:00:00:00:01"), Some("a"));
        radio.emit_found(device("00:00:00:00:00:02"), Some("b"));

        let first = tokio::time::timeout(Duration::from_secs(2), devices.next())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), devices.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(second.name, "b");
    }
}
