//! Bluetooth Module
//!
//! Classic Bluetooth discovery and pairing for the host application.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   BluetoothService                       │
//! │  (command surface: permissions, radio checks, replies)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌────────────┐ ┌────────────┐ ┌────────────┐
//! │ Discovery  │ │  Pairing   │ │   Sweep    │
//! │ - session  │ │ - resolve  │ │ - timed    │
//! │ - listener │ │ - bond     │ │   window   │
//! └─────┬──────┘ └─────┬──────┘ └────────────┘
//!       └──────┬───────┘
//!              ▼
//!      ┌──────────────┐
//!      │ RadioHandle  │  WindowsRadio / UnavailableRadio
//!      └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`radio`] - Adapter abstraction and platform selection
//! - [`discovery`] - Discovery session and found-device fan-out
//! - [`pairing`] - Bond requests
//! - [`service`] - Command surface and radio power notifications
//! - [`sweep`] - Timed discovery returning a merged device list
//! - [`worker`] - Background thread running the service

pub mod discovery;
pub mod pairing;
pub mod radio;
pub mod service;
pub mod sweep;
pub mod worker;

#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub(crate) mod fake;

pub use radio::{platform_radio, RadioHandle, UnavailableRadio};
pub use service::BluetoothService;
pub use sweep::DeviceSweep;
pub use worker::spawn_worker;
