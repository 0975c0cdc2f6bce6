//! Error kinds reported by the radio, the discovery session and the pairing flow.
//!
//! Host-facing errors must serialize, so every variant flattens to
//! `{ kind, message }` where `kind` is a stable code.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BluetoothError {
    /// No adapter exists on this host. Not retryable.
    #[error("Bluetooth adapter not available")]
    NoRadio,

    /// An OS-level permission is missing; re-request and retry.
    #[error("Bluetooth permission missing: {0}")]
    PermissionDenied(String),

    /// The address does not resolve to a remote device.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The operation is intentionally not performed.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The found-event listener was already released.
    #[error("Listener was not registered")]
    ListenerNotRegistered,

    /// Any other platform failure. Caller may retry.
    #[error("{0}")]
    Platform(String),
}

impl BluetoothError {
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Stable code handed to the host application.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoRadio => "NO_BLUETOOTH",
            Self::PermissionDenied(_) => "PERMISSION_ERROR",
            Self::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::ListenerNotRegistered | Self::Platform(_) => "ERROR",
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl Serialize for BluetoothError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("BluetoothError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type BluetoothResult<T> = Result<T, BluetoothError>;
