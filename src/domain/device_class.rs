//! Class of Device helpers
//!
//! The major device class occupies bits 8..=12 of the 24-bit class-of-device
//! field. Codes are reported unshifted, so "uncategorized" is `0x1F00` (7936).

use serde::{Deserialize, Serialize};

/// Mask selecting the major device class bits of a raw class-of-device value.
pub const MAJOR_CLASS_MASK: u32 = 0x1F00;

/// Major class reported when the device exposes no class metadata.
pub const UNCATEGORIZED: u32 = 0x1F00;

/// Raw 24-bit class-of-device value as advertised by the remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOfDevice(u32);

impl ClassOfDevice {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    pub fn major_code(&self) -> u32 {
        self.0 & MAJOR_CLASS_MASK
    }

    pub fn major(&self) -> MajorDeviceClass {
        MajorDeviceClass::from_code(self.major_code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorDeviceClass {
    Miscellaneous,
    Computer,
    Phone,
    Networking,
    AudioVideo,
    Peripheral,
    Imaging,
    Wearable,
    Toy,
    Health,
    Uncategorized,
    Reserved(u32),
}

impl MajorDeviceClass {
    pub fn from_code(code: u32) -> Self {
        match code & MAJOR_CLASS_MASK {
            0x0000 => Self::Miscellaneous,
            0x0100 => Self::Computer,
            0x0200 => Self::Phone,
            0x0300 => Self::Networking,
            0x0400 => Self::AudioVideo,
            0x0500 => Self::Peripheral,
            0x0600 => Self::Imaging,
            0x0700 => Self::Wearable,
            0x0800 => Self::Toy,
            0x0900 => Self::Health,
            0x1F00 => Self::Uncategorized,
            other => Self::Reserved(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Miscellaneous => 0x0000,
            Self::Computer => 0x0100,
            Self::Phone => 0x0200,
            Self::Networking => 0x0300,
            Self::AudioVideo => 0x0400,
            Self::Peripheral => 0x0500,
            Self::Imaging => 0x0600,
            Self::Wearable => 0x0700,
            Self::Toy => 0x0800,
            Self::Health => 0x0900,
            Self::Uncategorized => UNCATEGORIZED,
            Self::Reserved(code) => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Miscellaneous => "Miscellaneous",
            Self::Computer => "Computer",
            Self::Phone => "Phone",
            Self::Networking => "Networking",
            Self::AudioVideo => "Audio/Video",
            Self::Peripheral => "Peripheral",
            Self::Imaging => "Imaging",
            Self::Wearable => "Wearable",
            Self::Toy => "Toy",
            Self::Health => "Health",
            Self::Uncategorized => "Uncategorized",
            Self::Reserved(_) => "Reserved",
        }
    }

    /// Classes that are never receipt printers.
    pub fn is_excluded_from_printers(&self) -> bool {
        matches!(
            self,
            Self::Computer | Self::Phone | Self::AudioVideo | Self::Wearable | Self::Toy | Self::Health
        )
    }
}
