//! Object Transfer Service wire model
//!
//! Typed representations of every OTS characteristic value and control
//! point message, with bounds-checked decoding and little-endian encoding.

pub mod constants;
pub mod filter;
pub mod metadata;
pub mod oacp;
pub mod olcp;
pub mod types;
#[cfg(test)]
mod tests;

pub use self::filter::ObjectListFilter;
pub use self::metadata::{GroupedMetadata, MetadataField, MetadataFields, MetadataValue};
pub use self::oacp::{OacpOpcode, OacpRequest, OacpResponse, OacpResultCode};
pub use self::olcp::{OlcpOpcode, OlcpRequest, OlcpResponse, OlcpResultCode, SortOrder};
pub use self::types::*;
