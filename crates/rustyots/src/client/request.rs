//! Client request API
//!
//! Every request checks the session is idle, validates its arguments
//! locally and then issues (or queues) one GATT procedure. Results arrive
//! through the [`ClientHandler`].

use super::handler::{ClientHandler, ClientId};
use super::session::{GroupedRead, OtsClient, PendingTransfer};
use super::state::ClientStatus;
use crate::error::{Error, Result};
use crate::gatt::{GattClientTransport, Uuid};
use crate::l2cap::{BulkChannel, TransferMode, TransferParameters};
use crate::ots::{
    CharacteristicIndex, MetadataField, MetadataFields, MetadataValue, OacpRequest,
    ObjectListFilter, OlcpRequest, WriteMode,
};
use log::debug;
use std::collections::VecDeque;

impl<T, B, H> OtsClient<T, B, H>
where
    T: GattClientTransport,
    B: BulkChannel,
    H: ClientHandler,
{
    /// Session index of a client that may start a new request
    fn idle_index(&self, client: ClientId) -> Result<usize> {
        let index = self.index(client)?;
        if !self.sessions[index].status.is_idle() {
            return Err(Error::InvalidState);
        }
        Ok(index)
    }

    /// Read the OTS Feature characteristic
    pub fn read_features(&mut self, client: ClientId) -> Result<()> {
        let index = self.idle_index(client)?;
        self.send_read(index, CharacteristicIndex::OtsFeature)
    }

    /// Read one metadata characteristic of the current object
    pub fn read_metadata(&mut self, client: ClientId, field: MetadataField) -> Result<()> {
        let index = self.idle_index(client)?;
        self.send_read(index, field.characteristic())
    }

    /// Read several metadata characteristics one after the other and report
    /// them together
    pub fn read_object_metadata(&mut self, client: ClientId, fields: MetadataFields) -> Result<()> {
        let index = self.idle_index(client)?;
        let mut remaining: VecDeque<MetadataField> = fields.fields().into();
        let handles = self.sessions[index].handles;
        if remaining
            .iter()
            .any(|field| !handles.contains(field.characteristic()))
        {
            return Err(Error::NotSupported);
        }
        let Some(first) = remaining.pop_front() else {
            return Err(Error::InvalidParameter("no metadata field requested"));
        };

        self.sessions[index].grouped = Some(GroupedRead {
            remaining,
            ..GroupedRead::default()
        });
        let sent = self.send_read(index, first.characteristic());
        if sent.is_err() {
            self.sessions[index].grouped = None;
        }
        sent
    }

    /// Write a writable metadata characteristic of the current object
    pub fn write_metadata(&mut self, client: ClientId, value: &MetadataValue) -> Result<()> {
        let index = self.idle_index(client)?;
        match value.field() {
            MetadataField::Name
            | MetadataField::FirstCreated
            | MetadataField::LastModified
            | MetadataField::Properties => {}
            _ => return Err(Error::InvalidParameter("metadata field is read-only")),
        }
        self.send_write(
            index,
            value.field().characteristic(),
            value.encode(),
            ClientStatus::WaitWrite,
        )
    }

    pub fn read_filter(&mut self, client: ClientId) -> Result<()> {
        let index = self.idle_index(client)?;
        self.send_read(index, CharacteristicIndex::ObjectListFilter)
    }

    pub fn write_filter(&mut self, client: ClientId, filter: &ObjectListFilter) -> Result<()> {
        let index = self.idle_index(client)?;
        self.send_write(
            index,
            CharacteristicIndex::ObjectListFilter,
            filter.encode(),
            ClientStatus::WaitWrite,
        )
    }

    /// Send an OLCP request
    ///
    /// Not available on a server exposing a single object.
    pub fn olcp_request(&mut self, client: ClientId, request: &OlcpRequest) -> Result<()> {
        let index = self.idle_index(client)?;
        if self.sessions[index].single_object {
            return Err(Error::NotSupported);
        }
        self.send_write(
            index,
            CharacteristicIndex::Olcp,
            request.encode(),
            ClientStatus::WaitOlcp,
        )?;
        self.sessions[index].active_opcode = request.opcode() as u8;
        debug!("{} sent OLCP {:?}", client, request);
        Ok(())
    }

    fn send_oacp(
        &mut self,
        index: usize,
        request: &OacpRequest,
        transfer: Option<PendingTransfer>,
    ) -> Result<()> {
        self.send_write(
            index,
            CharacteristicIndex::Oacp,
            request.encode(),
            ClientStatus::WaitOacp,
        )?;
        let session = &mut self.sessions[index];
        session.active_opcode = request.opcode() as u8;
        session.pending_transfer = transfer;
        debug!("{} sent OACP {:?}", session.id, request.opcode());
        Ok(())
    }

    /// Ask the server to create an object of `size` bytes
    pub fn oacp_create(&mut self, client: ClientId, size: u32, object_type: Uuid) -> Result<()> {
        let index = self.idle_index(client)?;
        if size == 0 {
            return Err(Error::InvalidParameter("object size must be non-zero"));
        }
        self.send_oacp(index, &OacpRequest::Create { size, object_type }, None)
    }

    pub fn oacp_delete(&mut self, client: ClientId) -> Result<()> {
        let index = self.idle_index(client)?;
        self.send_oacp(index, &OacpRequest::Delete, None)
    }

    pub fn oacp_calculate_checksum(
        &mut self,
        client: ClientId,
        offset: u32,
        length: u32,
    ) -> Result<()> {
        let index = self.idle_index(client)?;
        if length == 0 {
            return Err(Error::InvalidParameter("checksum length must be non-zero"));
        }
        self.send_oacp(index, &OacpRequest::CalculateChecksum { offset, length }, None)
    }

    /// Execute the current object with an optional parameter
    pub fn oacp_execute(&mut self, client: ClientId, parameter: &[u8]) -> Result<()> {
        let index = self.idle_index(client)?;
        if parameter.len() >= self.config().write_request_data_size {
            return Err(Error::InvalidParameter("execute parameter too long"));
        }
        let request = OacpRequest::Execute {
            parameter: parameter.to_vec(),
        };
        self.send_oacp(index, &request, None)
    }

    /// Request `length` bytes of the current object from `offset`
    ///
    /// On success the object contents arrive over the bulk channel, which
    /// the client opens with `params`.
    pub fn oacp_read(
        &mut self,
        client: ClientId,
        offset: u32,
        length: u32,
        params: TransferParameters,
    ) -> Result<()> {
        let index = self.idle_index(client)?;
        params.validate_request()?;
        if length == 0 {
            return Err(Error::InvalidParameter("read length must be non-zero"));
        }
        let transfer = PendingTransfer {
            mode: TransferMode::Receive,
            offset,
            length,
            params,
        };
        self.send_oacp(index, &OacpRequest::Read { offset, length }, Some(transfer))
    }

    /// Request to write `length` bytes to the current object from `offset`
    pub fn oacp_write(
        &mut self,
        client: ClientId,
        offset: u32,
        length: u32,
        mode: WriteMode,
        params: TransferParameters,
    ) -> Result<()> {
        let index = self.idle_index(client)?;
        params.validate_request()?;
        if length == 0 {
            return Err(Error::InvalidParameter("write length must be non-zero"));
        }
        if mode.has_reserved_bits() {
            return Err(Error::InvalidParameter("reserved write mode bits set"));
        }
        let transfer = PendingTransfer {
            mode: TransferMode::Transmit,
            offset,
            length,
            params,
        };
        let request = OacpRequest::Write {
            offset,
            length,
            mode,
        };
        self.send_oacp(index, &request, Some(transfer))
    }

    /// Ask the server to stop a running OACP Read
    pub fn oacp_abort(&mut self, client: ClientId) -> Result<()> {
        let index = self.index(client)?;
        let session = &self.sessions[index];
        if session.status != ClientStatus::WaitOacpTransfer
            || session.transfer.mode != TransferMode::Receive
        {
            return Err(Error::InvalidState);
        }
        self.send_oacp(index, &OacpRequest::Abort, None)
    }

    /// Grant the server credits for the running Read
    pub fn increase_credit(&mut self, client: ClientId, credit: u16) -> Result<()> {
        let index = self.index(client)?;
        let session = &mut self.sessions[index];
        if session.status != ClientStatus::WaitOacpTransfer
            || !self.bulk.is_in_progress(&session.transfer)
        {
            return Err(Error::InvalidState);
        }
        self.bulk.increase_credit(&session.transfer, credit)?;
        session.transfer.add_credit(credit);
        Ok(())
    }

    /// Stop the running transfer
    ///
    /// A Read is stopped through OACP Abort so the server ends it cleanly. A
    /// Write is stopped by tearing down the bulk channel.
    pub fn abort(&mut self, client: ClientId) -> Result<()> {
        let index = self.index(client)?;
        let session = &self.sessions[index];
        if session.status != ClientStatus::WaitOacpTransfer {
            return Err(Error::InvalidState);
        }
        let mode = session.transfer.mode;
        match mode {
            TransferMode::Receive => self.oacp_abort(client),
            TransferMode::Transmit if self.bulk.is_in_progress(&session.transfer) => {
                self.bulk.abort_transfer(&session.transfer)
            }
            _ => Err(Error::InvalidState),
        }
    }
}
