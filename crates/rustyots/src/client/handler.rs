//! Application hooks of the OTS client
//!
//! Every request issued through [`OtsClient`](super::OtsClient) completes
//! asynchronously with exactly one of these callbacks. All hooks default to
//! doing nothing so an application only implements what it uses.

use crate::att::AttResult;
use crate::error::Result;
use crate::ots::{
    GroupedMetadata, MetadataField, MetadataValue, OacpResponse, ObjectChanged, ObjectId,
    ObjectListFilter, OlcpResponse, OtsFeatures, SubscriptionStatus,
};
use std::fmt;

/// Identifies a client session within an [`OtsClient`](super::OtsClient)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Callbacks from the OTS client into the application
pub trait ClientHandler {
    /// Discovery and subscription finished, successfully or not
    fn on_init(&mut self, _client: ClientId, _result: Result<()>) {}

    fn on_connect(&mut self, _client: ClientId) {}

    /// The connection closed; the session no longer exists
    fn on_disconnect(&mut self, _client: ClientId) {}

    fn on_subscription_changed(&mut self, _client: ClientId, _status: SubscriptionStatus) {}

    fn on_features_read(&mut self, _client: ClientId, _result: AttResult<OtsFeatures>) {}

    /// Completion of a single metadata read
    fn on_metadata_read(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _field: MetadataField,
        _result: AttResult<MetadataValue>,
    ) {
    }

    fn on_metadata_write(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _field: MetadataField,
        _result: AttResult<()>,
    ) {
    }

    /// Completion of a grouped metadata read
    ///
    /// `metadata` holds every value read before a failure stopped the
    /// sequence.
    fn on_grouped_metadata_read(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _result: Result<()>,
        _metadata: &GroupedMetadata,
    ) {
    }

    fn on_filter_read(&mut self, _client: ClientId, _result: AttResult<ObjectListFilter>) {}

    fn on_filter_write(&mut self, _client: ClientId, _result: AttResult<()>) {}

    /// Completion of an OACP request
    ///
    /// `opcode` is the opcode of the request. An ATT error reports a failed
    /// write or a malformed indication.
    fn on_oacp_response(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _opcode: u8,
        _result: AttResult<OacpResponse>,
    ) {
    }

    /// Completion of an OLCP request
    fn on_olcp_response(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _opcode: u8,
        _result: AttResult<OlcpResponse>,
    ) {
    }

    /// Supply up to `max_size` object bytes starting at `offset` for an
    /// OACP Write transfer
    fn on_data_transmit(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _offset: u32,
        _max_size: u16,
    ) -> Vec<u8> {
        Vec::new()
    }

    /// Consume object bytes of an OACP Read transfer; returns the credits
    /// to grant the server
    fn on_data_received(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _offset: u32,
        _data: &[u8],
    ) -> u16 {
        0
    }

    fn on_transfer_finished(&mut self, _client: ClientId, _object: &ObjectId, _result: Result<()>) {}

    fn on_object_changed(&mut self, _client: ClientId, _changed: &ObjectChanged) {}
}
