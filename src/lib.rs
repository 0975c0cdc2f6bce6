//! Classic Bluetooth discovery and pairing for receipt-printer hosts.
//!
//! [`domain`] holds the platform-independent records, errors and settings.
//! [`infrastructure`] drives the radio: discovery sessions, pairing, timed
//! sweeps and the background command worker. [`presentation`] is the egui
//! front end used by the binary.

pub mod domain;
pub mod infrastructure;
pub mod presentation;
