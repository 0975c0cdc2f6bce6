//! Bluetooth device address (BD_ADDR)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid Bluetooth address: {0}")]
pub struct AddressParseError(pub String);

/// Six-octet hardware address, most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BluetoothAddress([u8; 6]);

impl BluetoothAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Packed form used by platform APIs that take a 48-bit integer.
    pub fn to_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    pub fn from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bytes[2..]);
        Self(octets)
    }
}

impl FromStr for BluetoothAddress {
    type Err = AddressParseError;

    /// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF` and bare `AABBCCDDEEFF`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex: String = trimmed.chars().filter(|c| *c != ':' && *c != '-').collect();

        let separators = trimmed.len() - hex.len();
        if hex.len() != 12
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
            || !(separators == 0 || separators == 5)
        {
            return Err(AddressParseError(s.to_string()));
        }
        if separators == 5 && trimmed.split([':', '-']).any(|part| part.len() != 2) {
            return Err(AddressParseError(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| AddressParseError(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for BluetoothAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BluetoothAddress> for String {
    fn from(value: BluetoothAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}
