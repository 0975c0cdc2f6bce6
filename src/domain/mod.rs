//! Platform-independent types: addresses, device classes, records, errors,
//! permissions and persisted settings.

pub mod address;
pub mod device_class;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod permissions;
pub mod settings;
