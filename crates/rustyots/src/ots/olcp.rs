//! Object List Control Point messages

use super::constants::*;
use super::types::{ObjectId, OlcpFeatures};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// OLCP request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlcpOpcode {
    First = 0x01,
    Last = 0x02,
    Previous = 0x03,
    Next = 0x04,
    GoTo = 0x05,
    Order = 0x06,
    RequestNumberOfObjects = 0x07,
    ClearMarking = 0x08,
}

impl TryFrom<u8> for OlcpOpcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            OLCP_OPCODE_FIRST => Ok(OlcpOpcode::First),
            OLCP_OPCODE_LAST => Ok(OlcpOpcode::Last),
            OLCP_OPCODE_PREVIOUS => Ok(OlcpOpcode::Previous),
            OLCP_OPCODE_NEXT => Ok(OlcpOpcode::Next),
            OLCP_OPCODE_GO_TO => Ok(OlcpOpcode::GoTo),
            OLCP_OPCODE_ORDER => Ok(OlcpOpcode::Order),
            OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS => Ok(OlcpOpcode::RequestNumberOfObjects),
            OLCP_OPCODE_CLEAR_MARKING => Ok(OlcpOpcode::ClearMarking),
            other => Err(other),
        }
    }
}

impl OlcpOpcode {
    /// Optional feature bit gating the opcode; navigation is always allowed
    pub fn required_feature(&self) -> Option<OlcpFeatures> {
        match self {
            OlcpOpcode::First | OlcpOpcode::Last | OlcpOpcode::Previous | OlcpOpcode::Next => None,
            OlcpOpcode::GoTo => Some(OlcpFeatures::GO_TO),
            OlcpOpcode::Order => Some(OlcpFeatures::ORDER),
            OlcpOpcode::RequestNumberOfObjects => Some(OlcpFeatures::REQUEST_NUMBER_OF_OBJECTS),
            OlcpOpcode::ClearMarking => Some(OlcpFeatures::CLEAR_MARKING),
        }
    }

    /// Parameter length (opcode excluded) of the request
    pub fn parameter_len(&self) -> usize {
        match self {
            OlcpOpcode::GoTo => OBJECT_ID_SIZE,
            OlcpOpcode::Order => 1,
            _ => 0,
        }
    }

    /// Whether the opcode moves relative to an existing selection
    pub fn needs_selection(&self) -> bool {
        matches!(self, OlcpOpcode::Previous | OlcpOpcode::Next)
    }
}

/// Sort orders accepted by the OLCP Order procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NameAscending = 0x01,
    TypeAscending = 0x02,
    CurrentSizeAscending = 0x03,
    FirstCreatedAscending = 0x04,
    LastModifiedAscending = 0x05,
    NameDescending = 0x11,
    TypeDescending = 0x12,
    CurrentSizeDescending = 0x13,
    FirstCreatedDescending = 0x14,
    LastModifiedDescending = 0x15,
}

impl TryFrom<u8> for SortOrder {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(SortOrder::NameAscending),
            0x02 => Ok(SortOrder::TypeAscending),
            0x03 => Ok(SortOrder::CurrentSizeAscending),
            0x04 => Ok(SortOrder::FirstCreatedAscending),
            0x05 => Ok(SortOrder::LastModifiedAscending),
            0x11 => Ok(SortOrder::NameDescending),
            0x12 => Ok(SortOrder::TypeDescending),
            0x13 => Ok(SortOrder::CurrentSizeDescending),
            0x14 => Ok(SortOrder::FirstCreatedDescending),
            0x15 => Ok(SortOrder::LastModifiedDescending),
            other => Err(other),
        }
    }
}

/// A decoded OLCP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlcpRequest {
    First,
    Last,
    Previous,
    Next,
    GoTo(ObjectId),
    Order(SortOrder),
    RequestNumberOfObjects,
    ClearMarking,
}

impl OlcpRequest {
    pub fn opcode(&self) -> OlcpOpcode {
        match self {
            OlcpRequest::First => OlcpOpcode::First,
            OlcpRequest::Last => OlcpOpcode::Last,
            OlcpRequest::Previous => OlcpOpcode::Previous,
            OlcpRequest::Next => OlcpOpcode::Next,
            OlcpRequest::GoTo(_) => OlcpOpcode::GoTo,
            OlcpRequest::Order(_) => OlcpOpcode::Order,
            OlcpRequest::RequestNumberOfObjects => OlcpOpcode::RequestNumberOfObjects,
            OlcpRequest::ClearMarking => OlcpOpcode::ClearMarking,
        }
    }

    /// Decode a complete control point value (opcode first)
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&opcode, parameters) = bytes.split_first()?;
        let opcode = OlcpOpcode::try_from(opcode).ok()?;
        if parameters.len() != opcode.parameter_len() {
            return None;
        }
        let request = match opcode {
            OlcpOpcode::First => OlcpRequest::First,
            OlcpOpcode::Last => OlcpRequest::Last,
            OlcpOpcode::Previous => OlcpRequest::Previous,
            OlcpOpcode::Next => OlcpRequest::Next,
            OlcpOpcode::GoTo => OlcpRequest::GoTo(ObjectId::from_bytes(parameters)?),
            OlcpOpcode::Order => OlcpRequest::Order(SortOrder::try_from(parameters[0]).ok()?),
            OlcpOpcode::RequestNumberOfObjects => OlcpRequest::RequestNumberOfObjects,
            OlcpOpcode::ClearMarking => OlcpRequest::ClearMarking,
        };
        Some(request)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.opcode() as u8];
        match self {
            OlcpRequest::GoTo(object) => buf.extend_from_slice(&object.to_bytes()),
            OlcpRequest::Order(order) => buf.push(*order as u8),
            _ => {}
        }
        buf
    }
}

/// OLCP response result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlcpResultCode {
    Success = 0x01,
    OpCodeNotSupported = 0x02,
    InvalidParameter = 0x03,
    OperationFailed = 0x04,
    OutOfBounds = 0x05,
    TooManyObjects = 0x06,
    NoObject = 0x07,
    ObjectIdNotFound = 0x08,
}

impl TryFrom<u8> for OlcpResultCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            OLCP_RESULT_SUCCESS => Ok(OlcpResultCode::Success),
            OLCP_RESULT_OPCODE_NOT_SUPPORTED => Ok(OlcpResultCode::OpCodeNotSupported),
            OLCP_RESULT_INVALID_PARAMETER => Ok(OlcpResultCode::InvalidParameter),
            OLCP_RESULT_OPERATION_FAILED => Ok(OlcpResultCode::OperationFailed),
            OLCP_RESULT_OUT_OF_BOUNDS => Ok(OlcpResultCode::OutOfBounds),
            OLCP_RESULT_TOO_MANY_OBJECTS => Ok(OlcpResultCode::TooManyObjects),
            OLCP_RESULT_NO_OBJECT => Ok(OlcpResultCode::NoObject),
            OLCP_RESULT_OBJECT_ID_NOT_FOUND => Ok(OlcpResultCode::ObjectIdNotFound),
            other => Err(other),
        }
    }
}

/// OLCP response indication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OlcpResponse {
    pub request_opcode: u8,
    pub result: OlcpResultCode,
    /// Present only in responses to Request Number Of Objects
    pub number_of_objects: Option<u32>,
}

impl OlcpResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![OLCP_OPCODE_RESPONSE, self.request_opcode, self.result as u8];
        if let Some(count) = self.number_of_objects {
            buf.extend_from_slice(&count.to_le_bytes());
        }
        buf
    }

    /// Decode a response indication
    ///
    /// A successful Request Number Of Objects response must carry the
    /// four-byte count; every other response is exactly the header.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < CONTROL_POINT_RESPONSE_HEADER_SIZE || bytes[0] != OLCP_OPCODE_RESPONSE {
            return None;
        }
        let request_opcode = bytes[1];
        let result = OlcpResultCode::try_from(bytes[2]).ok()?;
        let trailing = &bytes[CONTROL_POINT_RESPONSE_HEADER_SIZE..];
        let number_of_objects = match (request_opcode, trailing.len()) {
            (OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS, 4) => {
                Some(Cursor::new(trailing).read_u32::<LittleEndian>().ok()?)
            }
            (OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS, 0) if result != OlcpResultCode::Success => {
                None
            }
            (OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS, _) => return None,
            (_, 0) => None,
            _ => return None,
        };
        Some(Self {
            request_opcode,
            result,
            number_of_objects,
        })
    }
}
