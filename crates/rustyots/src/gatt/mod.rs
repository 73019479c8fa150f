//! GATT collaborator boundary
//!
//! The OTS engines do not speak ATT themselves. They are driven by events
//! delivered from the host stack and respond through the transport traits
//! defined here, which are implemented by the stack binding (or by mocks in
//! tests).

pub mod transport;
pub mod types;

pub use self::transport::{GattClientTransport, GattServerTransport};
pub use self::types::{
    AttributeHandle, CccdFlags, CharacteristicStatus, ConnectionHandle, Uuid, INVALID_HANDLE,
};
