//! Outbound side of the GATT stack, to be either mocked (in test) or bound
//! to the host stack (in production).

use super::types::{AttributeHandle, CccdFlags, ConnectionHandle};
use crate::att::AttResult;
use crate::error::Result;

/// Server-role GATT operations used by the OTS server
pub trait GattServerTransport {
    /// Answer a pending read request with either a value or an ATT error
    fn send_read_response(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        result: AttResult<&[u8]>,
    ) -> Result<()>;

    /// Answer a pending write request
    fn send_write_response(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        result: AttResult<()>,
    ) -> Result<()>;

    /// Send an indication. Returns `Error::InProgress` while a previous
    /// indication on the connection is still awaiting confirmation.
    fn send_indication(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()>;
}

/// Client-role GATT operations used by the OTS client
///
/// Each call starts an asynchronous procedure; its completion arrives later
/// as a procedure-completed event. `Error::InProgress` means the stack is
/// busy with another procedure on the connection.
pub trait GattClientTransport {
    /// Discover all characteristics of a service
    fn discover_characteristics(&mut self, connection: ConnectionHandle, service: u32)
        -> Result<()>;

    /// Write the CCCD of a characteristic
    fn set_characteristic_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        flags: CccdFlags,
    ) -> Result<()>;

    fn read_characteristic_value(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
    ) -> Result<()>;

    fn write_characteristic_value(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()>;

    /// Confirm a received indication
    fn send_characteristic_confirmation(&mut self, connection: ConnectionHandle) -> Result<()>;
}
