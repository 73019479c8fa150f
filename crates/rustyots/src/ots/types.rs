//! OTS value types: object identifiers, feature and property bitsets, size
//! and date-time records, and the characteristic handle table.

use super::constants::*;
use crate::gatt::{AttributeHandle, INVALID_HANDLE};
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Cursor, Read, Write};

/// 48-bit object identifier
///
/// On the wire the five usable bytes come first (least significant first)
/// followed by the RFU byte. An all-zero usable part is only a valid ID
/// when the RFU byte holds the valid-zero sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub usable: [u8; OBJECT_ID_USABLE_SIZE],
    pub rfu: u8,
}

impl ObjectId {
    /// The "no object selected" marker
    pub const INVALID: ObjectId = ObjectId {
        usable: [0; OBJECT_ID_USABLE_SIZE],
        rfu: OBJECT_ID_RFU_INVALID,
    };

    /// Object ID zero, reserved for the directory listing object
    pub const DIRECTORY_LISTING: ObjectId = ObjectId {
        usable: [0; OBJECT_ID_USABLE_SIZE],
        rfu: OBJECT_ID_RFU_VALID_ZERO,
    };

    pub fn new(usable: [u8; OBJECT_ID_USABLE_SIZE], rfu: u8) -> Self {
        Self { usable, rfu }
    }

    /// Build an ID from the low 40 bits of `value`
    pub fn from_u64(value: u64) -> Self {
        let bytes = value.to_le_bytes();
        let mut usable = [0u8; OBJECT_ID_USABLE_SIZE];
        usable.copy_from_slice(&bytes[..OBJECT_ID_USABLE_SIZE]);
        Self {
            usable,
            rfu: OBJECT_ID_RFU_VALID_ZERO,
        }
    }

    /// The usable 40 bits as an integer
    pub fn to_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[..OBJECT_ID_USABLE_SIZE].copy_from_slice(&self.usable);
        u64::from_le_bytes(bytes)
    }

    pub fn is_valid(&self) -> bool {
        self.usable.iter().any(|b| *b != 0) || self.rfu == OBJECT_ID_RFU_VALID_ZERO
    }

    pub fn set_invalid(&mut self) {
        *self = Self::INVALID;
    }

    pub fn to_bytes(&self) -> [u8; OBJECT_ID_SIZE] {
        let mut bytes = [0u8; OBJECT_ID_SIZE];
        bytes[..OBJECT_ID_USABLE_SIZE].copy_from_slice(&self.usable);
        bytes[OBJECT_ID_USABLE_SIZE] = self.rfu;
        bytes
    }

    /// Decode an ID; the slice must be exactly six bytes long
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OBJECT_ID_SIZE {
            return None;
        }
        let mut usable = [0u8; OBJECT_ID_USABLE_SIZE];
        usable.copy_from_slice(&bytes[..OBJECT_ID_USABLE_SIZE]);
        Some(Self {
            usable,
            rfu: bytes[OBJECT_ID_USABLE_SIZE],
        })
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.to_bytes();
        bytes.reverse();
        write!(f, "0x{}", hex::encode(bytes))
    }
}

/// Current and allocated size of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectSize {
    pub current: u32,
    pub allocated: u32,
}

impl ObjectSize {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            current: reader.read_u32::<LittleEndian>()?,
            allocated: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.current)?;
        writer.write_u32::<LittleEndian>(self.allocated)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OBJECT_SIZE_SIZE {
            return None;
        }
        Self::read_from(&mut Cursor::new(bytes)).ok()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OBJECT_SIZE_SIZE);
        let _ = self.write_to(&mut buf);
        buf
    }
}

/// Calendar date and time
///
/// Ordering compares the year first and then the remaining fields in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl DateTime {
    pub fn new(year: u16, month: u8, day: u8, hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            year,
            month,
            day,
            hours,
            minutes,
            seconds,
        }
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            year: reader.read_u16::<LittleEndian>()?,
            month: reader.read_u8()?,
            day: reader.read_u8()?,
            hours: reader.read_u8()?,
            minutes: reader.read_u8()?,
            seconds: reader.read_u8()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.year)?;
        writer.write_all(&[self.month, self.day, self.hours, self.minutes, self.seconds])
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != DATE_TIME_SIZE {
            return None;
        }
        Self::read_from(&mut Cursor::new(bytes)).ok()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DATE_TIME_SIZE);
        let _ = self.write_to(&mut buf);
        buf
    }
}

bitflags! {
    /// OACP procedures supported by the server
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OacpFeatures: u32 {
        const CREATE = 1 << 0;
        const DELETE = 1 << 1;
        const CALCULATE_CHECKSUM = 1 << 2;
        const EXECUTE = 1 << 3;
        const READ = 1 << 4;
        const WRITE = 1 << 5;
        const APPEND = 1 << 6;
        const TRUNCATE = 1 << 7;
        const PATCH = 1 << 8;
        const ABORT = 1 << 9;
    }
}

bitflags! {
    /// OLCP procedures supported by the server
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OlcpFeatures: u32 {
        const GO_TO = 1 << 0;
        const ORDER = 1 << 1;
        const REQUEST_NUMBER_OF_OBJECTS = 1 << 2;
        const CLEAR_MARKING = 1 << 3;
    }
}

bitflags! {
    /// Properties of the current object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectProperties: u32 {
        const DELETE = 1 << 0;
        const EXECUTE = 1 << 1;
        const READ = 1 << 2;
        const WRITE = 1 << 3;
        const APPEND = 1 << 4;
        const TRUNCATE = 1 << 5;
        const PATCH = 1 << 6;
        const MARK = 1 << 7;
    }
}

impl ObjectProperties {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OBJECT_PROPERTIES_SIZE {
            return None;
        }
        let mut cursor = Cursor::new(bytes);
        cursor
            .read_u32::<LittleEndian>()
            .ok()
            .map(Self::from_bits_retain)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.bits().to_le_bytes().to_vec()
    }
}

bitflags! {
    /// Mode byte of an OACP Write request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WriteMode: u8 {
        const TRUNCATE = 1 << 1;
    }
}

impl WriteMode {
    /// Whether any reserved bit is set
    pub fn has_reserved_bits(&self) -> bool {
        self.bits() & !Self::all().bits() != 0
    }
}

bitflags! {
    /// Flags of an Object Changed indication
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectChangedFlags: u8 {
        /// Change was initiated by a client
        const SOURCE = 1 << 0;
        const CONTENTS = 1 << 1;
        const METADATA = 1 << 2;
        const CREATION = 1 << 3;
        const DELETION = 1 << 4;
    }
}

bitflags! {
    /// Indication subscriptions held by a peer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SubscriptionStatus: u8 {
        const OACP = 1 << 0;
        const OLCP = 1 << 1;
        const OBJECT_CHANGED = 1 << 2;
    }
}

/// Content of the OTS Feature characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OtsFeatures {
    pub oacp: OacpFeatures,
    pub olcp: OlcpFeatures,
}

impl OtsFeatures {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OTS_FEATURE_SIZE {
            return None;
        }
        let mut cursor = Cursor::new(bytes);
        let oacp = cursor.read_u32::<LittleEndian>().ok()?;
        let olcp = cursor.read_u32::<LittleEndian>().ok()?;
        Some(Self {
            oacp: OacpFeatures::from_bits_retain(oacp),
            olcp: OlcpFeatures::from_bits_retain(olcp),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OTS_FEATURE_SIZE);
        buf.extend_from_slice(&self.oacp.bits().to_le_bytes());
        buf.extend_from_slice(&self.olcp.bits().to_le_bytes());
        buf
    }
}

/// Payload of an Object Changed indication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectChanged {
    pub flags: ObjectChangedFlags,
    pub object: ObjectId,
}

impl ObjectChanged {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != OBJECT_CHANGED_SIZE {
            return None;
        }
        Some(Self {
            flags: ObjectChangedFlags::from_bits_retain(bytes[0]),
            object: ObjectId::from_bytes(&bytes[1..])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OBJECT_CHANGED_SIZE);
        buf.push(self.flags.bits());
        buf.extend_from_slice(&self.object.to_bytes());
        buf
    }
}

/// Logical index of each OTS characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicIndex {
    OtsFeature = 0,
    ObjectName,
    ObjectType,
    ObjectSize,
    ObjectFirstCreated,
    ObjectLastModified,
    ObjectId,
    ObjectProperties,
    Oacp,
    Olcp,
    ObjectListFilter,
    ObjectChanged,
}

/// Number of OTS characteristics
pub const CHARACTERISTIC_COUNT: usize = 12;

impl CharacteristicIndex {
    pub const ALL: [CharacteristicIndex; CHARACTERISTIC_COUNT] = [
        CharacteristicIndex::OtsFeature,
        CharacteristicIndex::ObjectName,
        CharacteristicIndex::ObjectType,
        CharacteristicIndex::ObjectSize,
        CharacteristicIndex::ObjectFirstCreated,
        CharacteristicIndex::ObjectLastModified,
        CharacteristicIndex::ObjectId,
        CharacteristicIndex::ObjectProperties,
        CharacteristicIndex::Oacp,
        CharacteristicIndex::Olcp,
        CharacteristicIndex::ObjectListFilter,
        CharacteristicIndex::ObjectChanged,
    ];

    /// 16-bit UUID of the characteristic
    pub fn uuid(&self) -> u16 {
        match self {
            CharacteristicIndex::OtsFeature => OTS_FEATURE_UUID,
            CharacteristicIndex::ObjectName => OBJECT_NAME_UUID,
            CharacteristicIndex::ObjectType => OBJECT_TYPE_UUID,
            CharacteristicIndex::ObjectSize => OBJECT_SIZE_UUID,
            CharacteristicIndex::ObjectFirstCreated => OBJECT_FIRST_CREATED_UUID,
            CharacteristicIndex::ObjectLastModified => OBJECT_LAST_MODIFIED_UUID,
            CharacteristicIndex::ObjectId => OBJECT_ID_UUID,
            CharacteristicIndex::ObjectProperties => OBJECT_PROPERTIES_UUID,
            CharacteristicIndex::Oacp => OACP_UUID,
            CharacteristicIndex::Olcp => OLCP_UUID,
            CharacteristicIndex::ObjectListFilter => OBJECT_LIST_FILTER_UUID,
            CharacteristicIndex::ObjectChanged => OBJECT_CHANGED_UUID,
        }
    }

    pub fn from_uuid(uuid: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|index| index.uuid() == uuid)
    }
}

/// Attribute handles of one OTS instance, by characteristic index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattHandles {
    handles: [AttributeHandle; CHARACTERISTIC_COUNT],
}

impl Default for GattHandles {
    fn default() -> Self {
        Self {
            handles: [INVALID_HANDLE; CHARACTERISTIC_COUNT],
        }
    }
}

impl GattHandles {
    /// Build a table from handles listed in characteristic index order
    pub fn new(handles: [AttributeHandle; CHARACTERISTIC_COUNT]) -> Self {
        Self { handles }
    }

    /// Handle of a characteristic, if present
    pub fn get(&self, index: CharacteristicIndex) -> Option<AttributeHandle> {
        match self.handles[index as usize] {
            INVALID_HANDLE => None,
            handle => Some(handle),
        }
    }

    pub fn set(&mut self, index: CharacteristicIndex, handle: AttributeHandle) {
        self.handles[index as usize] = handle;
    }

    pub fn contains(&self, index: CharacteristicIndex) -> bool {
        self.get(index).is_some()
    }

    /// Resolve a handle back to its characteristic
    pub fn find(&self, handle: AttributeHandle) -> Option<CharacteristicIndex> {
        if handle == INVALID_HANDLE {
            return None;
        }
        CharacteristicIndex::ALL
            .iter()
            .copied()
            .find(|index| self.handles[*index as usize] == handle)
    }
}
