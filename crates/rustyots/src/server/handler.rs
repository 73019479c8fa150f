//! Application hooks of the OTS server
//!
//! The server validates and packages protocol traffic; everything that
//! needs knowledge of the object store is delegated to a [`ServerHandler`].
//! Control point handlers are required. The remaining hooks default to the
//! behaviour of an application that does not provide them.

use crate::att::{AttErrorCode, AttResult};
use crate::error::Result;
use crate::gatt::ConnectionHandle;
use crate::l2cap::TransferParameters;
use crate::ots::{
    MetadataField, MetadataValue, OacpRequest, OacpResultCode, ObjectId, ObjectListFilter,
    ObjectProperties, ObjectSize, OlcpRequest, OlcpResultCode, SubscriptionStatus,
};

/// Index of a service instance within an [`OtsServer`](super::OtsServer)
pub type ServiceId = usize;

/// Current object of a session, with optional cached metadata
///
/// When `properties` or `size` are present the OACP engine validates
/// requests against them locally before calling the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub object: ObjectId,
    pub properties: Option<ObjectProperties>,
    pub size: Option<ObjectSize>,
}

impl Selection {
    /// Select an object without cached metadata
    pub fn new(object: ObjectId) -> Self {
        Self {
            object,
            properties: None,
            size: None,
        }
    }

    pub fn with_properties(mut self, properties: ObjectProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_size(mut self, size: ObjectSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.object.is_valid()
    }

    /// Drop the selection and any cached metadata
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Callbacks from the OTS server into the application
pub trait ServerHandler {
    /// Execute a validated OACP request on the selected object
    ///
    /// `transfer` holds suggested bulk channel parameters for Read and Write
    /// and may be adjusted; out-of-range values are clamped afterwards.
    /// Checksum and Execute results go into `response_data`.
    fn on_oacp_request(
        &mut self,
        service: ServiceId,
        connection: ConnectionHandle,
        selection: &mut Selection,
        request: &OacpRequest,
        transfer: &mut TransferParameters,
        response_data: &mut Vec<u8>,
    ) -> OacpResultCode;

    /// Execute a validated OLCP request; navigation updates `selection`
    ///
    /// `number_of_objects` is reported back for Request Number Of Objects.
    fn on_olcp_request(
        &mut self,
        service: ServiceId,
        connection: ConnectionHandle,
        selection: &mut Selection,
        request: &OlcpRequest,
        number_of_objects: &mut u32,
    ) -> OlcpResultCode;

    fn on_client_connected(&mut self, _service: ServiceId, _connection: ConnectionHandle) {}

    fn on_client_disconnected(&mut self, _service: ServiceId, _connection: ConnectionHandle) {}

    fn on_subscription_changed(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _status: SubscriptionStatus,
    ) {
    }

    /// Provide a metadata value of the selected object
    fn on_metadata_read(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _object: &ObjectId,
        _field: MetadataField,
    ) -> AttResult<MetadataValue> {
        Err(AttErrorCode::RequestNotSupported)
    }

    /// Accept or reject a metadata write; the result is the ATT outcome
    fn on_metadata_write(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _object: &ObjectId,
        _value: &MetadataValue,
    ) -> AttResult<()> {
        Ok(())
    }

    fn on_filter_read(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
    ) -> AttResult<ObjectListFilter> {
        Err(AttErrorCode::RequestNotSupported)
    }

    fn on_filter_write(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _filter: &ObjectListFilter,
    ) -> AttResult<()> {
        Ok(())
    }

    /// Supply up to `max_size` object bytes starting at `offset`
    fn on_data_transmit(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _object: &ObjectId,
        _offset: u32,
        _max_size: u16,
    ) -> Vec<u8> {
        Vec::new()
    }

    /// Store received object bytes; returns the credits to grant the peer
    fn on_data_received(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _object: &ObjectId,
        _offset: u32,
        _data: &[u8],
    ) -> u16 {
        0
    }

    fn on_transfer_finished(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _object: &ObjectId,
        _result: Result<()>,
    ) {
    }
}
