//! Metadata and object list filter handling of the server

use super::config::ServerCapabilities;
use super::handler::{ServerHandler, ServiceId};
use super::session::OtsServer;
use crate::att::{AttErrorCode, AttResult};
use crate::error::Result;
use crate::gatt::{AttributeHandle, GattServerTransport};
use crate::l2cap::BulkChannel;
use crate::ots::{
    CharacteristicIndex, MetadataField, MetadataValue, ObjectChangedFlags, ObjectListFilter,
};
use log::debug;

/// Reject fields whose capability is disabled on the instance
fn check_field_supported(capabilities: &ServerCapabilities, field: MetadataField) -> AttResult<()> {
    let supported = match field {
        MetadataField::FirstCreated => capabilities.supports_first_created(),
        MetadataField::LastModified => capabilities.supports_last_modified(),
        _ => true,
    };
    if supported {
        Ok(())
    } else {
        Err(AttErrorCode::RequestNotSupported)
    }
}

impl<T, B, H> OtsServer<T, B, H>
where
    T: GattServerTransport,
    B: BulkChannel,
    H: ServerHandler,
{
    /// Produce the value of a readable characteristic
    pub(super) fn read_characteristic(
        &mut self,
        service: ServiceId,
        slot: usize,
        index: CharacteristicIndex,
    ) -> AttResult<Vec<u8>> {
        let config = &self.services[service].config;
        let capabilities = config.capabilities;
        let session = &self.services[service].sessions[slot];
        let connection = session.transfer.connection;

        if index == CharacteristicIndex::OtsFeature {
            return Ok(config.features.encode());
        }
        if index == CharacteristicIndex::ObjectListFilter {
            if !capabilities.object_list_filter {
                return Err(AttErrorCode::RequestNotSupported);
            }
            let filter = self.handler.on_filter_read(service, connection)?;
            return Ok(filter.encode());
        }
        let Some(field) = MetadataField::from_characteristic(index) else {
            return Err(AttErrorCode::ReadNotPermitted);
        };

        check_field_supported(&capabilities, field)?;
        let object = session.selection.object;
        if !object.is_valid() {
            return Err(AttErrorCode::ObjectNotSelected);
        }
        if field == MetadataField::Id {
            return Ok(object.to_bytes().to_vec());
        }

        let value = self
            .handler
            .on_metadata_read(service, connection, &object, field)?;
        if value.field() != field {
            debug!("Handler answered {:?} with {:?}", field, value.field());
            return Err(AttErrorCode::Unlikely);
        }
        Ok(value.encode())
    }

    fn write_metadata(
        &mut self,
        service: ServiceId,
        slot: usize,
        index: CharacteristicIndex,
        value: &[u8],
    ) -> AttResult<MetadataValue> {
        let capabilities = self.services[service].config.capabilities;
        let field = MetadataField::from_characteristic(index).ok_or(AttErrorCode::WriteNotPermitted)?;
        check_field_supported(&capabilities, field)?;
        let value =
            MetadataValue::decode(field, value).ok_or(AttErrorCode::InvalidAttributeValueLength)?;

        let session = &self.services[service].sessions[slot];
        let object = session.selection.object;
        if !object.is_valid() {
            return Err(AttErrorCode::ObjectNotSelected);
        }
        self.handler
            .on_metadata_write(service, session.transfer.connection, &object, &value)?;
        Ok(value)
    }

    pub(super) fn handle_metadata_write(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        index: CharacteristicIndex,
        value: &[u8],
    ) -> Result<()> {
        let connection = self.services[service].sessions[slot].transfer.connection;
        let written = self.write_metadata(service, slot, index, value);
        let result = written.as_ref().map(|_| ()).map_err(|err| *err);
        self.transport
            .send_write_response(connection, characteristic, result)?;

        match written {
            Ok(value) => {
                debug!("Connection {} wrote {:?}", connection, value);
                if self.services[service].config.capabilities.object_changed {
                    let object = self.services[service].sessions[slot].selection.object;
                    let flags = ObjectChangedFlags::SOURCE | ObjectChangedFlags::METADATA;
                    if let Err(err) =
                        self.send_object_changed(service, &object, flags, Some(connection))
                    {
                        debug!("Object changed not sent: {}", err);
                    }
                }
            }
            Err(err) => debug!("Metadata write from connection {} rejected: {}", connection, err),
        }
        Ok(())
    }

    fn write_filter(&mut self, service: ServiceId, slot: usize, value: &[u8]) -> AttResult<()> {
        let capabilities = self.services[service].config.capabilities;
        let filter = ObjectListFilter::decode(value)?;
        if (filter.uses_first_created() && !capabilities.supports_first_created())
            || (filter.uses_last_modified() && !capabilities.supports_last_modified())
        {
            return Err(AttErrorCode::WriteRequestRejected);
        }
        let connection = self.services[service].sessions[slot].transfer.connection;
        debug!("Connection {} sets filter {:?}", connection, filter);
        self.handler.on_filter_write(service, connection, &filter)
    }

    pub(super) fn handle_filter_write(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        let connection = self.services[service].sessions[slot].transfer.connection;
        let result = self.write_filter(service, slot, value);
        if let Err(err) = result {
            debug!("Filter write from connection {} rejected: {}", connection, err);
        }
        self.transport
            .send_write_response(connection, characteristic, result)
    }
}
