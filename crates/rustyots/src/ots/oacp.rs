//! Object Action Control Point messages

use super::constants::*;
use super::types::{OacpFeatures, WriteMode};
use crate::gatt::Uuid;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// OACP request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OacpOpcode {
    Create = 0x01,
    Delete = 0x02,
    CalculateChecksum = 0x03,
    Execute = 0x04,
    Read = 0x05,
    Write = 0x06,
    Abort = 0x07,
}

impl TryFrom<u8> for OacpOpcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            OACP_OPCODE_CREATE => Ok(OacpOpcode::Create),
            OACP_OPCODE_DELETE => Ok(OacpOpcode::Delete),
            OACP_OPCODE_CALCULATE_CHECKSUM => Ok(OacpOpcode::CalculateChecksum),
            OACP_OPCODE_EXECUTE => Ok(OacpOpcode::Execute),
            OACP_OPCODE_READ => Ok(OacpOpcode::Read),
            OACP_OPCODE_WRITE => Ok(OacpOpcode::Write),
            OACP_OPCODE_ABORT => Ok(OacpOpcode::Abort),
            other => Err(other),
        }
    }
}

impl OacpOpcode {
    /// Feature bit that must be set for the server to accept the opcode
    pub fn required_feature(&self) -> OacpFeatures {
        match self {
            OacpOpcode::Create => OacpFeatures::CREATE,
            OacpOpcode::Delete => OacpFeatures::DELETE,
            OacpOpcode::CalculateChecksum => OacpFeatures::CALCULATE_CHECKSUM,
            OacpOpcode::Execute => OacpFeatures::EXECUTE,
            OacpOpcode::Read => OacpFeatures::READ,
            OacpOpcode::Write => OacpFeatures::WRITE,
            OacpOpcode::Abort => OacpFeatures::ABORT,
        }
    }

    /// Whether a parameter block of `len` bytes (opcode excluded) is well formed
    pub fn accepts_parameter_len(&self, len: usize) -> bool {
        match self {
            OacpOpcode::Create => len == 4 + UUID16_SIZE || len == 4 + UUID128_SIZE,
            OacpOpcode::Delete | OacpOpcode::Abort => len == 0,
            OacpOpcode::CalculateChecksum | OacpOpcode::Read => len == 8,
            OacpOpcode::Write => len == 9,
            OacpOpcode::Execute => true,
        }
    }
}

/// A decoded OACP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OacpRequest {
    Create { size: u32, object_type: Uuid },
    Delete,
    CalculateChecksum { offset: u32, length: u32 },
    Execute { parameter: Vec<u8> },
    Read { offset: u32, length: u32 },
    Write { offset: u32, length: u32, mode: WriteMode },
    Abort,
}

impl OacpRequest {
    pub fn opcode(&self) -> OacpOpcode {
        match self {
            OacpRequest::Create { .. } => OacpOpcode::Create,
            OacpRequest::Delete => OacpOpcode::Delete,
            OacpRequest::CalculateChecksum { .. } => OacpOpcode::CalculateChecksum,
            OacpRequest::Execute { .. } => OacpOpcode::Execute,
            OacpRequest::Read { .. } => OacpOpcode::Read,
            OacpRequest::Write { .. } => OacpOpcode::Write,
            OacpRequest::Abort => OacpOpcode::Abort,
        }
    }

    /// Decode a complete control point value (opcode first)
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&opcode, parameters) = bytes.split_first()?;
        let opcode = OacpOpcode::try_from(opcode).ok()?;
        if !opcode.accepts_parameter_len(parameters.len()) {
            return None;
        }
        let mut cursor = Cursor::new(parameters);
        let request = match opcode {
            OacpOpcode::Create => {
                let size = cursor.read_u32::<LittleEndian>().ok()?;
                let object_type = Uuid::from_bytes(&parameters[4..])?;
                OacpRequest::Create { size, object_type }
            }
            OacpOpcode::Delete => OacpRequest::Delete,
            OacpOpcode::CalculateChecksum => OacpRequest::CalculateChecksum {
                offset: cursor.read_u32::<LittleEndian>().ok()?,
                length: cursor.read_u32::<LittleEndian>().ok()?,
            },
            OacpOpcode::Execute => OacpRequest::Execute {
                parameter: parameters.to_vec(),
            },
            OacpOpcode::Read => OacpRequest::Read {
                offset: cursor.read_u32::<LittleEndian>().ok()?,
                length: cursor.read_u32::<LittleEndian>().ok()?,
            },
            OacpOpcode::Write => OacpRequest::Write {
                offset: cursor.read_u32::<LittleEndian>().ok()?,
                length: cursor.read_u32::<LittleEndian>().ok()?,
                mode: WriteMode::from_bits_retain(cursor.read_u8().ok()?),
            },
            OacpOpcode::Abort => OacpRequest::Abort,
        };
        Some(request)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.opcode() as u8];
        match self {
            OacpRequest::Create { size, object_type } => {
                let _ = buf.write_u32::<LittleEndian>(*size);
                buf.extend_from_slice(&object_type.as_bytes());
            }
            OacpRequest::CalculateChecksum { offset, length }
            | OacpRequest::Read { offset, length } => {
                let _ = buf.write_u32::<LittleEndian>(*offset);
                let _ = buf.write_u32::<LittleEndian>(*length);
            }
            OacpRequest::Write {
                offset,
                length,
                mode,
            } => {
                let _ = buf.write_u32::<LittleEndian>(*offset);
                let _ = buf.write_u32::<LittleEndian>(*length);
                buf.push(mode.bits());
            }
            OacpRequest::Execute { parameter } => buf.extend_from_slice(parameter),
            OacpRequest::Delete | OacpRequest::Abort => {}
        }
        buf
    }
}

/// OACP response result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OacpResultCode {
    Success = 0x01,
    OpCodeNotSupported = 0x02,
    InvalidParameter = 0x03,
    InsufficientResources = 0x04,
    InvalidObject = 0x05,
    ChannelUnavailable = 0x06,
    UnsupportedType = 0x07,
    ProcedureNotPermitted = 0x08,
    ObjectLocked = 0x09,
    OperationFailed = 0x0A,
}

impl TryFrom<u8> for OacpResultCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            OACP_RESULT_SUCCESS => Ok(OacpResultCode::Success),
            OACP_RESULT_OPCODE_NOT_SUPPORTED => Ok(OacpResultCode::OpCodeNotSupported),
            OACP_RESULT_INVALID_PARAMETER => Ok(OacpResultCode::InvalidParameter),
            OACP_RESULT_INSUFFICIENT_RESOURCES => Ok(OacpResultCode::InsufficientResources),
            OACP_RESULT_INVALID_OBJECT => Ok(OacpResultCode::InvalidObject),
            OACP_RESULT_CHANNEL_UNAVAILABLE => Ok(OacpResultCode::ChannelUnavailable),
            OACP_RESULT_UNSUPPORTED_TYPE => Ok(OacpResultCode::UnsupportedType),
            OACP_RESULT_PROCEDURE_NOT_PERMITTED => Ok(OacpResultCode::ProcedureNotPermitted),
            OACP_RESULT_OBJECT_LOCKED => Ok(OacpResultCode::ObjectLocked),
            OACP_RESULT_OPERATION_FAILED => Ok(OacpResultCode::OperationFailed),
            other => Err(other),
        }
    }
}

/// OACP response indication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OacpResponse {
    /// Opcode of the request being answered
    pub request_opcode: u8,
    pub result: OacpResultCode,
    /// Trailing data: the checksum for Calculate Checksum, the execution
    /// result for Execute, empty otherwise
    pub data: Vec<u8>,
}

impl OacpResponse {
    pub fn new(request_opcode: u8, result: OacpResultCode) -> Self {
        Self {
            request_opcode,
            result,
            data: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CONTROL_POINT_RESPONSE_HEADER_SIZE + self.data.len());
        buf.push(OACP_OPCODE_RESPONSE);
        buf.push(self.request_opcode);
        buf.push(self.result as u8);
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode a response indication; the caller checks per-opcode lengths
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < CONTROL_POINT_RESPONSE_HEADER_SIZE || bytes[0] != OACP_OPCODE_RESPONSE {
            return None;
        }
        let mut cursor = Cursor::new(&bytes[1..]);
        let request_opcode = cursor.read_u8().ok()?;
        let result = OacpResultCode::try_from(cursor.read_u8().ok()?).ok()?;
        let mut data = Vec::new();
        cursor.read_to_end(&mut data).ok()?;
        Some(Self {
            request_opcode,
            result,
            data,
        })
    }

    /// Checksum carried by a Calculate Checksum response
    pub fn checksum(&self) -> Option<u32> {
        if self.request_opcode != OACP_OPCODE_CALCULATE_CHECKSUM || self.data.len() != 4 {
            return None;
        }
        Cursor::new(&self.data).read_u32::<LittleEndian>().ok()
    }
}
