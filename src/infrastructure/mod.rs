//! Platform-facing services: the Bluetooth stack and logging setup.

pub mod bluetooth;
pub mod logging;
