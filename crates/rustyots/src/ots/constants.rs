//! OTS constants

// Service and characteristic UUIDs
pub const OTS_SERVICE_UUID: u16 = 0x1825;
pub const OTS_FEATURE_UUID: u16 = 0x2ABD;
pub const OBJECT_NAME_UUID: u16 = 0x2ABE;
pub const OBJECT_TYPE_UUID: u16 = 0x2ABF;
pub const OBJECT_SIZE_UUID: u16 = 0x2AC0;
pub const OBJECT_FIRST_CREATED_UUID: u16 = 0x2AC1;
pub const OBJECT_LAST_MODIFIED_UUID: u16 = 0x2AC2;
pub const OBJECT_ID_UUID: u16 = 0x2AC3;
pub const OBJECT_PROPERTIES_UUID: u16 = 0x2AC4;
pub const OACP_UUID: u16 = 0x2AC5;
pub const OLCP_UUID: u16 = 0x2AC6;
pub const OBJECT_LIST_FILTER_UUID: u16 = 0x2AC7;
pub const OBJECT_CHANGED_UUID: u16 = 0x2AC8;

// OACP opcodes
pub const OACP_OPCODE_CREATE: u8 = 0x01;
pub const OACP_OPCODE_DELETE: u8 = 0x02;
pub const OACP_OPCODE_CALCULATE_CHECKSUM: u8 = 0x03;
pub const OACP_OPCODE_EXECUTE: u8 = 0x04;
pub const OACP_OPCODE_READ: u8 = 0x05;
pub const OACP_OPCODE_WRITE: u8 = 0x06;
pub const OACP_OPCODE_ABORT: u8 = 0x07;
pub const OACP_OPCODE_RESPONSE: u8 = 0x60;

// OACP result codes
pub const OACP_RESULT_SUCCESS: u8 = 0x01;
pub const OACP_RESULT_OPCODE_NOT_SUPPORTED: u8 = 0x02;
pub const OACP_RESULT_INVALID_PARAMETER: u8 = 0x03;
pub const OACP_RESULT_INSUFFICIENT_RESOURCES: u8 = 0x04;
pub const OACP_RESULT_INVALID_OBJECT: u8 = 0x05;
pub const OACP_RESULT_CHANNEL_UNAVAILABLE: u8 = 0x06;
pub const OACP_RESULT_UNSUPPORTED_TYPE: u8 = 0x07;
pub const OACP_RESULT_PROCEDURE_NOT_PERMITTED: u8 = 0x08;
pub const OACP_RESULT_OBJECT_LOCKED: u8 = 0x09;
pub const OACP_RESULT_OPERATION_FAILED: u8 = 0x0A;

// OLCP opcodes
pub const OLCP_OPCODE_FIRST: u8 = 0x01;
pub const OLCP_OPCODE_LAST: u8 = 0x02;
pub const OLCP_OPCODE_PREVIOUS: u8 = 0x03;
pub const OLCP_OPCODE_NEXT: u8 = 0x04;
pub const OLCP_OPCODE_GO_TO: u8 = 0x05;
pub const OLCP_OPCODE_ORDER: u8 = 0x06;
pub const OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS: u8 = 0x07;
pub const OLCP_OPCODE_CLEAR_MARKING: u8 = 0x08;
pub const OLCP_OPCODE_RESPONSE: u8 = 0x70;

// OLCP result codes
pub const OLCP_RESULT_SUCCESS: u8 = 0x01;
pub const OLCP_RESULT_OPCODE_NOT_SUPPORTED: u8 = 0x02;
pub const OLCP_RESULT_INVALID_PARAMETER: u8 = 0x03;
pub const OLCP_RESULT_OPERATION_FAILED: u8 = 0x04;
pub const OLCP_RESULT_OUT_OF_BOUNDS: u8 = 0x05;
pub const OLCP_RESULT_TOO_MANY_OBJECTS: u8 = 0x06;
pub const OLCP_RESULT_NO_OBJECT: u8 = 0x07;
pub const OLCP_RESULT_OBJECT_ID_NOT_FOUND: u8 = 0x08;

// Object list filter types
pub const FILTER_NO_FILTER: u8 = 0x00;
pub const FILTER_NAME_STARTS_WITH: u8 = 0x01;
pub const FILTER_NAME_ENDS_WITH: u8 = 0x02;
pub const FILTER_NAME_CONTAINS: u8 = 0x03;
pub const FILTER_NAME_IS_EXACTLY: u8 = 0x04;
pub const FILTER_OBJECT_TYPE: u8 = 0x05;
pub const FILTER_CREATED_BETWEEN: u8 = 0x06;
pub const FILTER_MODIFIED_BETWEEN: u8 = 0x07;
pub const FILTER_CURRENT_SIZE_BETWEEN: u8 = 0x08;
pub const FILTER_ALLOCATED_SIZE_BETWEEN: u8 = 0x09;
pub const FILTER_MARKED_OBJECTS: u8 = 0x0A;

// Value lengths
pub const OBJECT_ID_SIZE: usize = 6;
pub const OBJECT_ID_USABLE_SIZE: usize = 5;
pub const OBJECT_ID_RFU_VALID_ZERO: u8 = 0x00;
pub const OBJECT_ID_RFU_INVALID: u8 = 0xFF;
pub const DATE_TIME_SIZE: usize = 7;
pub const OBJECT_SIZE_SIZE: usize = 8;
pub const OTS_FEATURE_SIZE: usize = 8;
pub const OBJECT_PROPERTIES_SIZE: usize = 4;
pub const OBJECT_CHANGED_SIZE: usize = 1 + OBJECT_ID_SIZE;
pub const UUID16_SIZE: usize = 2;
pub const UUID128_SIZE: usize = 16;

/// OACP/OLCP response header: response opcode, request opcode, result code
pub const CONTROL_POINT_RESPONSE_HEADER_SIZE: usize = 3;
