//! Pairing Coordinator
//!
//! Resolves an address through the radio and asks the OS to bond with it.
//! Bond completion happens later at the OS level and is not awaited here.

use super::radio::RadioHandle;
use crate::domain::address::BluetoothAddress;
use crate::domain::error::{BluetoothError, BluetoothResult};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BondOutcome {
    Pending,
    /// The OS accepted the request and started bonding.
    Initiated,
    /// The OS declined to start, e.g. because the device is already bonded.
    Declined,
    Failed(BluetoothError),
}

/// One bond attempt. Lives only for the duration of a `pair_device` call.
#[derive(Debug, Clone)]
pub struct BondRequest {
    pub address: String,
    pub outcome: BondOutcome,
}

impl BondRequest {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            outcome: BondOutcome::Pending,
        }
    }

    fn complete(&mut self, result: BluetoothResult<bool>) {
        self.outcome = match result {
            Ok(true) => BondOutcome::Initiated,
            Ok(false) => BondOutcome::Declined,
            Err(e) => BondOutcome::Failed(e),
        };
    }

    fn into_result(self) -> BluetoothResult<bool> {
        match self.outcome {
            BondOutcome::Initiated => Ok(true),
            BondOutcome::Declined => Ok(false),
            BondOutcome::Failed(e) => Err(e),
            BondOutcome::Pending => Err(BluetoothError::platform(format!(
                "Bond request for {} never completed",
                self.address
            ))),
        }
    }
}

/// Result of an unpair request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpairOutcome {
    /// Removing a bond needs privileged platform calls; never attempted.
    Unsupported,
}

impl UnpairOutcome {
    pub fn performed(&self) -> bool {
        match self {
            UnpairOutcome::Unsupported => false,
        }
    }
}

pub struct PairingCoordinator {
    radio: Arc<dyn RadioHandle>,
}

impl PairingCoordinator {
    pub fn new(radio: Arc<dyn RadioHandle>) -> Self {
        Self { radio }
    }

    /// Start bonding with `address`.
    ///
    /// Returns `true` when bonding was initiated. An address that can't be
    /// parsed or resolved is [`BluetoothError::DeviceNotFound`]; platform
    /// security failures stay [`BluetoothError::PermissionDenied`].
    pub async fn pair_device(&self, address: &str) -> BluetoothResult<bool> {
        let mut request = BondRequest::new(address);
        info!("Requesting bond with {}", request.address);

        let result = self.request_bond(address).await;
        request.complete(result);

        match &request.outcome {
            BondOutcome::Initiated => info!("Bond initiated with {}", request.address),
            BondOutcome::Declined => info!("Radio declined bond with {}", request.address),
            BondOutcome::Failed(e) => warn!("Bond with {} failed: {}", request.address, e),
            BondOutcome::Pending => {}
        }

        request.into_result()
    }

    async fn request_bond(&self, address: &str) -> BluetoothResult<bool> {
        let parsed: BluetoothAddress = address
            .parse()
            .map_err(|_| BluetoothError::DeviceNotFound(address.to_string()))?;

        let device = self
            .radio
            .resolve_address(&parsed)
            .await?
            .ok_or_else(|| BluetoothError::DeviceNotFound(address.to_string()))?;

        self.radio.create_bond(&device).await
    }

    pub fn unpair_device(&self, address: &str) -> UnpairOutcome {
        info!("Unpair requested for {}; bond removal is not supported", address);
        UnpairOutcome::Unsupported
    }
}
