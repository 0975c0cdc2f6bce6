//! Permission preconditions
//!
//! Every command declares the OS permissions it needs. The command layer asks
//! a [`PermissionGate`] before calling into the radio; the core itself never
//! requests permissions, it only reports [`BluetoothError::PermissionDenied`].

use crate::domain::error::{BluetoothError, BluetoothResult};
use crate::domain::models::BluetoothCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Run an inquiry scan.
    BluetoothScan,
    /// Read bonded devices and create bonds.
    BluetoothConnect,
    /// Location access, required for scanning on some platforms.
    Location,
}

impl Permission {
    pub fn label(&self) -> &'static str {
        match self {
            Permission::BluetoothScan => "bluetooth-scan",
            Permission::BluetoothConnect => "bluetooth-connect",
            Permission::Location => "location",
        }
    }
}

impl BluetoothCommand {
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            BluetoothCommand::CheckEnabled
            | BluetoothCommand::WaitForRadio(_)
            | BluetoothCommand::Unpair(_) => &[],
            BluetoothCommand::GetPairedDevices | BluetoothCommand::Pair(_) => {
                &[Permission::BluetoothConnect]
            }
            BluetoothCommand::StartDiscovery => {
                &[Permission::BluetoothScan, Permission::Location]
            }
            // Cancelling must work even if a grant was revoked mid-scan.
            BluetoothCommand::StopDiscovery => &[],
            BluetoothCommand::Sweep => &[
                Permission::BluetoothConnect,
                Permission::BluetoothScan,
                Permission::Location,
            ],
        }
    }
}

/// Answers whether the host has been granted a permission.
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;

    fn check(&self, command: &BluetoothCommand) -> BluetoothResult<()> {
        let missing: Vec<&str> = command
            .required_permissions()
            .iter()
            .filter(|p| !self.is_granted(**p))
            .map(|p| p.label())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BluetoothError::permission(missing.join(", ")))
        }
    }
}

/// Gate for hosts where the OS enforces permissions at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeGranted;

impl PermissionGate for AssumeGranted {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }
}

/// Fixed set of grants, e.g. loaded from settings.
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions(HashSet<Permission>);

impl GrantedPermissions {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self(granted.into_iter().collect())
    }
}

impl PermissionGate for GrantedPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }
}
