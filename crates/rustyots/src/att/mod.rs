//! ATT error codes used by the Object Transfer Service
//!
//! Only the error side of ATT is modelled here: the OTS engines produce and
//! consume ATT status codes, while PDU framing belongs to the stack below.

pub mod constants;
pub mod error;

pub use self::error::{check_status, AttErrorCode, AttResult};
