//! Object metadata characteristics

use super::types::{CharacteristicIndex, DateTime, ObjectId, ObjectProperties, ObjectSize};
use crate::gatt::Uuid;
use bitflags::bitflags;

/// Metadata characteristic of the current object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Name,
    Type,
    Size,
    FirstCreated,
    LastModified,
    Id,
    Properties,
}

impl MetadataField {
    pub const ALL: [MetadataField; 7] = [
        MetadataField::Name,
        MetadataField::Type,
        MetadataField::Size,
        MetadataField::FirstCreated,
        MetadataField::LastModified,
        MetadataField::Id,
        MetadataField::Properties,
    ];

    pub fn characteristic(&self) -> CharacteristicIndex {
        match self {
            MetadataField::Name => CharacteristicIndex::ObjectName,
            MetadataField::Type => CharacteristicIndex::ObjectType,
            MetadataField::Size => CharacteristicIndex::ObjectSize,
            MetadataField::FirstCreated => CharacteristicIndex::ObjectFirstCreated,
            MetadataField::LastModified => CharacteristicIndex::ObjectLastModified,
            MetadataField::Id => CharacteristicIndex::ObjectId,
            MetadataField::Properties => CharacteristicIndex::ObjectProperties,
        }
    }

    pub fn from_characteristic(index: CharacteristicIndex) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.characteristic() == index)
    }

    /// Bit of this field in a [`MetadataFields`] set
    pub fn flag(&self) -> MetadataFields {
        match self {
            MetadataField::Name => MetadataFields::NAME,
            MetadataField::Type => MetadataFields::TYPE,
            MetadataField::Size => MetadataFields::SIZE,
            MetadataField::FirstCreated => MetadataFields::FIRST_CREATED,
            MetadataField::LastModified => MetadataFields::LAST_MODIFIED,
            MetadataField::Id => MetadataFields::ID,
            MetadataField::Properties => MetadataFields::PROPERTIES,
        }
    }
}

bitflags! {
    /// A set of metadata fields, used for grouped reads
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MetadataFields: u8 {
        const NAME = 1 << 0;
        const TYPE = 1 << 1;
        const SIZE = 1 << 2;
        const FIRST_CREATED = 1 << 3;
        const LAST_MODIFIED = 1 << 4;
        const ID = 1 << 5;
        const PROPERTIES = 1 << 6;
    }
}

impl MetadataFields {
    /// Fields of the set in characteristic order
    pub fn fields(&self) -> Vec<MetadataField> {
        MetadataField::ALL
            .iter()
            .copied()
            .filter(|field| self.contains(field.flag()))
            .collect()
    }
}

/// Value of one metadata characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// UTF-8 object name, not NUL terminated
    Name(Vec<u8>),
    Type(Uuid),
    Size(ObjectSize),
    FirstCreated(DateTime),
    LastModified(DateTime),
    Id(ObjectId),
    Properties(ObjectProperties),
}

impl MetadataValue {
    pub fn field(&self) -> MetadataField {
        match self {
            MetadataValue::Name(_) => MetadataField::Name,
            MetadataValue::Type(_) => MetadataField::Type,
            MetadataValue::Size(_) => MetadataField::Size,
            MetadataValue::FirstCreated(_) => MetadataField::FirstCreated,
            MetadataValue::LastModified(_) => MetadataField::LastModified,
            MetadataValue::Id(_) => MetadataField::Id,
            MetadataValue::Properties(_) => MetadataField::Properties,
        }
    }

    /// Decode a characteristic value, enforcing the field's length rules
    pub fn decode(field: MetadataField, bytes: &[u8]) -> Option<Self> {
        let value = match field {
            MetadataField::Name => MetadataValue::Name(bytes.to_vec()),
            MetadataField::Type => MetadataValue::Type(Uuid::from_bytes(bytes)?),
            MetadataField::Size => MetadataValue::Size(ObjectSize::decode(bytes)?),
            MetadataField::FirstCreated => MetadataValue::FirstCreated(DateTime::decode(bytes)?),
            MetadataField::LastModified => MetadataValue::LastModified(DateTime::decode(bytes)?),
            MetadataField::Id => MetadataValue::Id(ObjectId::from_bytes(bytes)?),
            MetadataField::Properties => {
                MetadataValue::Properties(ObjectProperties::decode(bytes)?)
            }
        };
        Some(value)
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            MetadataValue::Name(name) => name.clone(),
            MetadataValue::Type(uuid) => uuid.as_bytes(),
            MetadataValue::Size(size) => size.encode(),
            MetadataValue::FirstCreated(time) | MetadataValue::LastModified(time) => time.encode(),
            MetadataValue::Id(object) => object.to_bytes().to_vec(),
            MetadataValue::Properties(properties) => properties.encode(),
        }
    }
}

/// Metadata collected by a grouped read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupedMetadata {
    pub name: Option<Vec<u8>>,
    pub object_type: Option<Uuid>,
    pub size: Option<ObjectSize>,
    pub first_created: Option<DateTime>,
    pub last_modified: Option<DateTime>,
    pub id: Option<ObjectId>,
    pub properties: Option<ObjectProperties>,
}

impl GroupedMetadata {
    pub fn store(&mut self, value: MetadataValue) {
        match value {
            MetadataValue::Name(name) => self.name = Some(name),
            MetadataValue::Type(uuid) => self.object_type = Some(uuid),
            MetadataValue::Size(size) => self.size = Some(size),
            MetadataValue::FirstCreated(time) => self.first_created = Some(time),
            MetadataValue::LastModified(time) => self.last_modified = Some(time),
            MetadataValue::Id(object) => self.id = Some(object),
            MetadataValue::Properties(properties) => self.properties = Some(properties),
        }
    }
}
