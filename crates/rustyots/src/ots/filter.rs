//! Object List Filter characteristic codec

use super::constants::*;
use super::types::DateTime;
use crate::att::{AttErrorCode, AttResult};
use crate::gatt::Uuid;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Filter applied by the server to the object list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ObjectListFilter {
    #[default]
    NoFilter,
    NameStartsWith(Vec<u8>),
    NameEndsWith(Vec<u8>),
    NameContains(Vec<u8>),
    NameIsExactly(Vec<u8>),
    ObjectType(Uuid),
    CreatedBetween { from: DateTime, to: DateTime },
    ModifiedBetween { from: DateTime, to: DateTime },
    CurrentSizeBetween { min: u32, max: u32 },
    AllocatedSizeBetween { min: u32, max: u32 },
    MarkedObjects,
}

impl ObjectListFilter {
    /// Filter type tag
    pub fn filter_type(&self) -> u8 {
        match self {
            ObjectListFilter::NoFilter => FILTER_NO_FILTER,
            ObjectListFilter::NameStartsWith(_) => FILTER_NAME_STARTS_WITH,
            ObjectListFilter::NameEndsWith(_) => FILTER_NAME_ENDS_WITH,
            ObjectListFilter::NameContains(_) => FILTER_NAME_CONTAINS,
            ObjectListFilter::NameIsExactly(_) => FILTER_NAME_IS_EXACTLY,
            ObjectListFilter::ObjectType(_) => FILTER_OBJECT_TYPE,
            ObjectListFilter::CreatedBetween { .. } => FILTER_CREATED_BETWEEN,
            ObjectListFilter::ModifiedBetween { .. } => FILTER_MODIFIED_BETWEEN,
            ObjectListFilter::CurrentSizeBetween { .. } => FILTER_CURRENT_SIZE_BETWEEN,
            ObjectListFilter::AllocatedSizeBetween { .. } => FILTER_ALLOCATED_SIZE_BETWEEN,
            ObjectListFilter::MarkedObjects => FILTER_MARKED_OBJECTS,
        }
    }

    /// Decode and validate a written filter value
    ///
    /// Length errors are reported as invalid attribute value length; an
    /// unknown tag or an inverted range is a rejected write request.
    pub fn decode(bytes: &[u8]) -> AttResult<Self> {
        let (&filter_type, parameters) = bytes
            .split_first()
            .ok_or(AttErrorCode::InvalidAttributeValueLength)?;
        let mut cursor = Cursor::new(parameters);
        let filter = match filter_type {
            FILTER_NO_FILTER | FILTER_MARKED_OBJECTS => {
                if !parameters.is_empty() {
                    return Err(AttErrorCode::InvalidAttributeValueLength);
                }
                if filter_type == FILTER_NO_FILTER {
                    ObjectListFilter::NoFilter
                } else {
                    ObjectListFilter::MarkedObjects
                }
            }
            FILTER_NAME_STARTS_WITH => ObjectListFilter::NameStartsWith(parameters.to_vec()),
            FILTER_NAME_ENDS_WITH => ObjectListFilter::NameEndsWith(parameters.to_vec()),
            FILTER_NAME_CONTAINS => ObjectListFilter::NameContains(parameters.to_vec()),
            FILTER_NAME_IS_EXACTLY => ObjectListFilter::NameIsExactly(parameters.to_vec()),
            FILTER_OBJECT_TYPE => ObjectListFilter::ObjectType(
                Uuid::from_bytes(parameters).ok_or(AttErrorCode::InvalidAttributeValueLength)?,
            ),
            FILTER_CREATED_BETWEEN | FILTER_MODIFIED_BETWEEN => {
                if parameters.len() != 2 * DATE_TIME_SIZE {
                    return Err(AttErrorCode::InvalidAttributeValueLength);
                }
                let from = DateTime::read_from(&mut cursor)
                    .map_err(|_| AttErrorCode::InvalidAttributeValueLength)?;
                let to = DateTime::read_from(&mut cursor)
                    .map_err(|_| AttErrorCode::InvalidAttributeValueLength)?;
                if from > to {
                    return Err(AttErrorCode::WriteRequestRejected);
                }
                if filter_type == FILTER_CREATED_BETWEEN {
                    ObjectListFilter::CreatedBetween { from, to }
                } else {
                    ObjectListFilter::ModifiedBetween { from, to }
                }
            }
            FILTER_CURRENT_SIZE_BETWEEN | FILTER_ALLOCATED_SIZE_BETWEEN => {
                if parameters.len() != 8 {
                    return Err(AttErrorCode::InvalidAttributeValueLength);
                }
                let min = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| AttErrorCode::InvalidAttributeValueLength)?;
                let max = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| AttErrorCode::InvalidAttributeValueLength)?;
                if min > max {
                    return Err(AttErrorCode::WriteRequestRejected);
                }
                if filter_type == FILTER_CURRENT_SIZE_BETWEEN {
                    ObjectListFilter::CurrentSizeBetween { min, max }
                } else {
                    ObjectListFilter::AllocatedSizeBetween { min, max }
                }
            }
            _ => return Err(AttErrorCode::WriteRequestRejected),
        };
        Ok(filter)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.filter_type()];
        match self {
            ObjectListFilter::NameStartsWith(name)
            | ObjectListFilter::NameEndsWith(name)
            | ObjectListFilter::NameContains(name)
            | ObjectListFilter::NameIsExactly(name) => buf.extend_from_slice(name),
            ObjectListFilter::ObjectType(uuid) => buf.extend_from_slice(&uuid.as_bytes()),
            ObjectListFilter::CreatedBetween { from, to }
            | ObjectListFilter::ModifiedBetween { from, to } => {
                buf.extend_from_slice(&from.encode());
                buf.extend_from_slice(&to.encode());
            }
            ObjectListFilter::CurrentSizeBetween { min, max }
            | ObjectListFilter::AllocatedSizeBetween { min, max } => {
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
            }
            ObjectListFilter::NoFilter | ObjectListFilter::MarkedObjects => {}
        }
        buf
    }

    /// Whether the filter compares first-created timestamps
    pub fn uses_first_created(&self) -> bool {
        matches!(self, ObjectListFilter::CreatedBetween { .. })
    }

    /// Whether the filter compares last-modified timestamps
    pub fn uses_last_modified(&self) -> bool {
        matches!(self, ObjectListFilter::ModifiedBetween { .. })
    }
}
