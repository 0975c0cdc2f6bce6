use crate::domain::address::BluetoothAddress;
use crate::domain::device_class::{ClassOfDevice, MajorDeviceClass};
use crate::domain::error::BluetoothError;
use serde::{Deserialize, Serialize};

/// Host event name for a normalized discovery result.
pub const DEVICE_FOUND_EVENT: &str = "BluetoothDeviceFound";
pub const DISCOVERY_STATE_EVENT: &str = "BluetoothDiscoveryState";
pub const DISCOVERY_FINISHED_EVENT: &str = "BluetoothDiscoveryFinished";
pub const BOND_STATE_EVENT: &str = "BluetoothBondStateChanged";
pub const RADIO_STATE_EVENT: &str = "BluetoothStateChanged";

/// Canonical device record handed to the host. The address is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub address: String,
    #[serde(rename = "class")]
    pub device_class: u32,
}

impl DeviceRecord {
    pub fn major_class(&self) -> MajorDeviceClass {
        MajorDeviceClass::from_code(self.device_class)
    }

    /// Receipt printers report as Imaging, Peripheral or not at all, so only
    /// classes that are clearly something else are rejected.
    pub fn is_likely_printer(&self) -> bool {
        !self.major_class().is_excluded_from_printers()
    }
}

/// What the platform knows about a remote device, independent of any event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDevice {
    pub address: BluetoothAddress,
    /// Name cached by the OS from an earlier inquiry or bond.
    pub cached_name: Option<String>,
    pub class: Option<ClassOfDevice>,
}

impl RemoteDevice {
    pub fn new(address: BluetoothAddress) -> Self {
        Self {
            address,
            cached_name: None,
            class: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.cached_name = Some(name.into());
        self
    }

    pub fn with_class(mut self, class: ClassOfDevice) -> Self {
        self.class = Some(class);
        self
    }
}

/// Raw found-device notification as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFoundEvent {
    pub device: RemoteDevice,
    /// Name carried on the notification itself, when the platform attaches one.
    pub name: Option<String>,
}

/// Notifications pushed by the radio to a registered listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    Found(RawFoundEvent),
    /// The platform ended the inquiry on its own.
    ScanFinished,
    BondStateChanged {
        address: BluetoothAddress,
        bonded: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscoveryState {
    #[default]
    Idle,
    Scanning,
}

/// Device shown by a timed sweep: discovery result plus bond status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweptDevice {
    #[serde(flatten)]
    pub record: DeviceRecord,
    pub paired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BluetoothCommand {
    CheckEnabled,
    GetPairedDevices,
    StartDiscovery,
    StopDiscovery,
    Pair(String),
    Unpair(String),
    Sweep,
    /// Wait up to the given number of milliseconds for the radio to be on.
    WaitForRadio(u64),
}

impl BluetoothCommand {
    pub fn label(&self) -> &'static str {
        match self {
            BluetoothCommand::CheckEnabled => "Radio check",
            BluetoothCommand::GetPairedDevices => "Paired device lookup",
            BluetoothCommand::StartDiscovery => "Start discovery",
            BluetoothCommand::StopDiscovery => "Stop discovery",
            BluetoothCommand::Pair(_) => "Pairing",
            BluetoothCommand::Unpair(_) => "Unpairing",
            BluetoothCommand::Sweep => "Device sweep",
            BluetoothCommand::WaitForRadio(_) => "Waiting for Bluetooth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    RadioEnabled(bool),
    PairedDevices(Vec<DeviceRecord>),
    DiscoveryStarted(bool),
    DiscoveryStopped(bool),
    PairRequested { address: String, initiated: bool },
    UnpairRequested { address: String, performed: bool },
    SweepCompleted(Vec<SweptDevice>),
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    DeviceFound(DeviceRecord),
    DiscoveryState(DiscoveryState),
    DiscoveryFinished,
    BondStateChanged { address: String, bonded: bool },
    RadioStateChanged { enabled: bool },
    CommandResult(Result<CommandReply, BluetoothError>),
    LogMessage(StatusMessage),
}

impl AppEvent {
    /// Name and JSON payload for host transports that deliver named events.
    /// Command results and log lines stay in-process.
    pub fn to_host_event(&self) -> Option<(&'static str, serde_json::Value)> {
        match self {
            AppEvent::DeviceFound(record) => {
                Some((DEVICE_FOUND_EVENT, serde_json::to_value(record).ok()?))
            }
            AppEvent::DiscoveryState(state) => {
                Some((DISCOVERY_STATE_EVENT, serde_json::to_value(state).ok()?))
            }
            AppEvent::DiscoveryFinished => {
                Some((DISCOVERY_FINISHED_EVENT, serde_json::Value::Null))
            }
            AppEvent::BondStateChanged { address, bonded } => Some((
                BOND_STATE_EVENT,
                serde_json::json!({ "address": address, "bonded": bonded }),
            )),
            AppEvent::RadioStateChanged { enabled } => Some((
                RADIO_STATE_EVENT,
                serde_json::json!({ "enabled": enabled }),
            )),
            AppEvent::CommandResult(_) | AppEvent::LogMessage(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Devices,
    Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(class: u32) -> DeviceRecord {
        DeviceRecord {
            name: "Printer-01".to_string(),
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            device_class: class,
        }
    }

    #[test]
    fn test_record_payload_uses_class_key() {
        let (name, payload) = AppEvent::DeviceFound(record(7936))
            .to_host_event()
            .unwrap();
        assert_eq!(name, DEVICE_FOUND_EVENT);
        assert_eq!(
            payload,
            serde_json::json!({
                "name": "Printer-01",
                "address": "AA:BB:CC:DD:EE:FF",
                "class": 7936
            })
        );
    }

    #[test]
    fn test_printer_likelihood() {
        assert!(record(1536).is_likely_printer());
        assert!(record(1280).is_likely_printer());
        assert!(record(7936).is_likely_printer());
        assert!(!record(512).is_likely_printer());
        assert!(!record(256).is_likely_printer());
    }

    #[test]
    fn test_radio_state_payload() {
        let (name, payload) = AppEvent::RadioStateChanged { enabled: false }
            .to_host_event()
            .unwrap();
        assert_eq!(name, RADIO_STATE_EVENT);
        assert_eq!(payload, serde_json::json!({ "enabled": false }));
    }

    #[test]
    fn test_log_messages_are_not_host_events() {
        let event = AppEvent::LogMessage(StatusMessage {
            message: "hello".to_string(),
            severity: MessageSeverity::Info,
        });
        assert!(event.to_host_event().is_none());
    }
}
