//! Common types for GATT operations

use bitflags::bitflags;
use std::fmt;

/// Connection handle assigned by the link layer
pub type ConnectionHandle = u8;

/// Attribute handle within the local or remote GATT database
pub type AttributeHandle = u16;

/// Handle value marking an absent characteristic
pub const INVALID_HANDLE: AttributeHandle = 0x0000;

/// UUID for GATT attributes and OTS object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uuid {
    /// 16-bit UUID
    Uuid16(u16),
    /// 128-bit UUID (full UUID, little-endian)
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Convert raw bytes to UUID based on length
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            2 => Some(Uuid::Uuid16(u16::from_le_bytes([bytes[0], bytes[1]]))),
            16 => {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(bytes);
                Some(Uuid::Uuid128(uuid))
            }
            _ => None,
        }
    }

    /// Create a UUID from a 128-bit value
    pub fn from_u128(uuid: u128) -> Self {
        Uuid::Uuid128(uuid.to_le_bytes())
    }

    /// Get the bytes representation of this UUID
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Uuid::Uuid16(uuid) => uuid.to_le_bytes().to_vec(),
            Uuid::Uuid128(uuid) => uuid.to_vec(),
        }
    }

    /// Encoded length in bytes (2 or 16)
    pub fn encoded_len(&self) -> usize {
        match self {
            Uuid::Uuid16(_) => 2,
            Uuid::Uuid128(_) => 16,
        }
    }

    /// Get the 16-bit UUID value if this is a 16-bit UUID
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Uuid::Uuid16(uuid) => Some(*uuid),
            _ => None,
        }
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uuid::Uuid16(uuid) => write!(f, "{:04x}", uuid),
            Uuid::Uuid128(uuid) => {
                write!(
                    f,
                    "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                    uuid[15], uuid[14], uuid[13], uuid[12],
                    uuid[11], uuid[10],
                    uuid[9], uuid[8],
                    uuid[7], uuid[6],
                    uuid[5], uuid[4], uuid[3], uuid[2], uuid[1], uuid[0]
                )
            }
        }
    }
}

bitflags! {
    /// Client Characteristic Configuration Descriptor bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CccdFlags: u16 {
        const NOTIFICATION = 0x0001;
        const INDICATION = 0x0002;
    }
}

/// Characteristic status event delivered by the server stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicStatus {
    /// The peer wrote the CCCD of the characteristic
    ClientConfig(CccdFlags),
    /// The peer confirmed an indication on the characteristic
    Confirmation,
}
