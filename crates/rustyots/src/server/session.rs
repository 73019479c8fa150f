//! Server session manager
//!
//! Each service instance owns a fixed-size table of client sessions, one per
//! served connection. A session carries the peer's current object, its
//! indication subscriptions, the bulk channel binding used for object
//! transfers and a queue of indications the transport could not take yet.

use super::config::{OtsServerConfig, OtsServiceConfig};
use super::handler::{Selection, ServerHandler, ServiceId};
use crate::att::AttErrorCode;
use crate::error::{Error, Result};
use crate::gatt::{
    AttributeHandle, CccdFlags, CharacteristicStatus, ConnectionHandle, GattServerTransport,
};
use crate::l2cap::{BulkChannel, TransferBinding, TransferId};
use crate::ots::{
    CharacteristicIndex, ObjectChanged, ObjectChangedFlags, ObjectId, OtsFeatures,
    SubscriptionStatus,
};
use crate::queue::BoundedQueue;
use log::{debug, info, trace, warn};

/// Indication waiting for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PendingIndication {
    pub connection: ConnectionHandle,
    pub characteristic: AttributeHandle,
    pub value: Vec<u8>,
}

/// State of one served connection
pub(super) struct ClientSession {
    /// `None` marks an unused slot
    pub connection: Option<ConnectionHandle>,
    pub selection: Selection,
    pub subscriptions: SubscriptionStatus,
    pub transfer: TransferBinding,
    pub indications: BoundedQueue<PendingIndication>,
}

impl ClientSession {
    fn new(id: TransferId, config: &OtsServerConfig) -> Result<Self> {
        let indications = BoundedQueue::with_capacity(config.indication_queue_size)?;
        if config.replace_oldest_indication {
            indications.set_overflow_callback(Some(Box::new(|_: &PendingIndication| true)))?;
        }
        Ok(Self {
            connection: None,
            selection: Selection::default(),
            subscriptions: SubscriptionStatus::empty(),
            transfer: TransferBinding::new(id, 0),
            indications,
        })
    }

    fn bind(&mut self, connection: ConnectionHandle) {
        self.connection = Some(connection);
        self.selection.clear();
        self.subscriptions = SubscriptionStatus::empty();
        self.transfer = TransferBinding::new(self.transfer.id, connection);
        self.drain_indications();
    }

    fn drain_indications(&self) {
        if let Err(err) = self.indications.clear() {
            debug!("Indication queue not cleared: {}", err);
        }
    }

    fn release(&mut self) {
        self.selection.clear();
        self.subscriptions = SubscriptionStatus::empty();
        self.transfer.reset();
        self.drain_indications();
        self.connection = None;
    }
}

/// One OTS service instance and its session table
pub(super) struct ServiceInstance {
    pub config: OtsServiceConfig,
    pub sessions: Vec<ClientSession>,
}

/// OTS server serving one or more service instances
pub struct OtsServer<T, B, H> {
    config: OtsServerConfig,
    pub(super) services: Vec<ServiceInstance>,
    pub(super) transport: T,
    pub(super) bulk: B,
    pub(super) handler: H,
}

impl<T, B, H> OtsServer<T, B, H>
where
    T: GattServerTransport,
    B: BulkChannel,
    H: ServerHandler,
{
    /// Create a server for the given service instances
    pub fn new(
        config: OtsServerConfig,
        services: Vec<OtsServiceConfig>,
        transport: T,
        bulk: B,
        handler: H,
    ) -> Result<Self> {
        if config.concurrency == 0 {
            return Err(Error::InvalidParameter("concurrency must be non-zero"));
        }
        if services.is_empty() {
            return Err(Error::InvalidParameter("no service instance configured"));
        }

        let mut next_transfer = 0u32;
        let mut instances = Vec::with_capacity(services.len());
        for service in services {
            if !service.handles.contains(CharacteristicIndex::Oacp) {
                return Err(Error::InvalidParameter("service instance without OACP handle"));
            }
            let mut sessions = Vec::with_capacity(config.concurrency);
            for _ in 0..config.concurrency {
                sessions.push(ClientSession::new(TransferId(next_transfer), &config)?);
                next_transfer += 1;
            }
            instances.push(ServiceInstance {
                config: service,
                sessions,
            });
        }

        info!(
            "OTS server initialized with {} instance(s), {} session(s) each",
            instances.len(),
            config.concurrency
        );

        Ok(Self {
            config,
            services: instances,
            transport,
            bulk,
            handler,
        })
    }

    pub fn config(&self) -> &OtsServerConfig {
        &self.config
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Features advertised by a service instance
    pub fn features(&self, service: ServiceId) -> Result<OtsFeatures> {
        self.services
            .get(service)
            .map(|instance| instance.config.features)
            .ok_or(Error::NotFound)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn bulk(&self) -> &B {
        &self.bulk
    }

    pub fn bulk_mut(&mut self) -> &mut B {
        &mut self.bulk
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub(super) fn session_index(
        &self,
        service: ServiceId,
        connection: ConnectionHandle,
    ) -> Option<usize> {
        self.services
            .get(service)?
            .sessions
            .iter()
            .position(|session| session.connection == Some(connection))
    }

    fn session(&self, service: ServiceId, connection: ConnectionHandle) -> Result<&ClientSession> {
        let slot = self.session_index(service, connection).ok_or(Error::NotFound)?;
        Ok(&self.services[service].sessions[slot])
    }

    fn session_mut(
        &mut self,
        service: ServiceId,
        connection: ConnectionHandle,
    ) -> Result<&mut ClientSession> {
        let slot = self.session_index(service, connection).ok_or(Error::NotFound)?;
        Ok(&mut self.services[service].sessions[slot])
    }

    /// Resolve a local attribute handle to its instance and characteristic
    fn locate(&self, characteristic: AttributeHandle) -> Option<(ServiceId, CharacteristicIndex)> {
        self.services
            .iter()
            .enumerate()
            .find_map(|(service, instance)| {
                instance
                    .config
                    .handles
                    .find(characteristic)
                    .map(|index| (service, index))
            })
    }

    fn locate_transfer(&self, id: TransferId) -> Option<(ServiceId, usize)> {
        self.services
            .iter()
            .enumerate()
            .find_map(|(service, instance)| {
                instance
                    .sessions
                    .iter()
                    .position(|session| session.connection.is_some() && session.transfer.id == id)
                    .map(|slot| (service, slot))
            })
    }

    /// A connection was opened; give it a session in every instance
    pub fn on_connection_opened(&mut self, connection: ConnectionHandle) {
        for (service, instance) in self.services.iter_mut().enumerate() {
            if instance
                .sessions
                .iter()
                .any(|session| session.connection == Some(connection))
            {
                continue;
            }
            match instance
                .sessions
                .iter_mut()
                .find(|session| session.connection.is_none())
            {
                Some(session) => {
                    session.bind(connection);
                    info!("OTS instance {} serving connection {}", service, connection);
                    self.handler.on_client_connected(service, connection);
                }
                None => warn!(
                    "OTS instance {} has no free session for connection {}",
                    service, connection
                ),
            }
        }
    }

    /// A connection was closed; abort its transfer and free its sessions
    pub fn on_connection_closed(&mut self, connection: ConnectionHandle) {
        for (service, instance) in self.services.iter_mut().enumerate() {
            let Some(session) = instance
                .sessions
                .iter_mut()
                .find(|session| session.connection == Some(connection))
            else {
                continue;
            };
            self.handler.on_client_disconnected(service, connection);
            if self.bulk.is_in_progress(&session.transfer) {
                if let Err(err) = self.bulk.abort_transfer(&session.transfer) {
                    warn!("Failed to abort transfer on connection {}: {}", connection, err);
                }
            }
            session.release();
            info!("OTS instance {} released connection {}", service, connection);
        }
    }

    /// Serve a read request on one of the OTS characteristics
    pub fn on_read_request(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
    ) -> Result<()> {
        let result = match self.locate(characteristic) {
            None => Err(AttErrorCode::AttributeNotFound),
            Some((service, index)) => match self.session_index(service, connection) {
                None => Err(AttErrorCode::ConcurrencyLimitExceeded),
                Some(slot) => self.read_characteristic(service, slot, index),
            },
        };
        match result {
            Ok(value) => {
                trace!("Read 0x{:04x}: {}", characteristic, hex::encode(&value));
                self.transport
                    .send_read_response(connection, characteristic, Ok(&value))
            }
            Err(err) => {
                debug!("Read 0x{:04x} rejected: {}", characteristic, err);
                self.transport
                    .send_read_response(connection, characteristic, Err(err))
            }
        }
    }

    /// Serve a write request on one of the OTS characteristics
    pub fn on_write_request(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        trace!("Write 0x{:04x}: {}", characteristic, hex::encode(value));
        let Some((service, index)) = self.locate(characteristic) else {
            return self.transport.send_write_response(
                connection,
                characteristic,
                Err(AttErrorCode::AttributeNotFound),
            );
        };
        let Some(slot) = self.session_index(service, connection) else {
            return self.transport.send_write_response(
                connection,
                characteristic,
                Err(AttErrorCode::ConcurrencyLimitExceeded),
            );
        };
        let capabilities = self.services[service].config.capabilities;
        match index {
            CharacteristicIndex::Oacp => self.handle_oacp_write(service, slot, characteristic, value),
            CharacteristicIndex::Olcp if capabilities.multiple_objects => {
                self.handle_olcp_write(service, slot, characteristic, value)
            }
            CharacteristicIndex::ObjectListFilter if capabilities.object_list_filter => {
                self.handle_filter_write(service, slot, characteristic, value)
            }
            CharacteristicIndex::ObjectName
            | CharacteristicIndex::ObjectFirstCreated
            | CharacteristicIndex::ObjectLastModified
            | CharacteristicIndex::ObjectProperties => {
                self.handle_metadata_write(service, slot, characteristic, index, value)
            }
            CharacteristicIndex::Olcp | CharacteristicIndex::ObjectListFilter => {
                self.transport.send_write_response(
                    connection,
                    characteristic,
                    Err(AttErrorCode::RequestNotSupported),
                )
            }
            _ => self.transport.send_write_response(
                connection,
                characteristic,
                Err(AttErrorCode::WriteNotPermitted),
            ),
        }
    }

    /// Track CCCD writes on the indicatable characteristics
    pub fn on_characteristic_status(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        status: CharacteristicStatus,
    ) {
        let CharacteristicStatus::ClientConfig(flags) = status else {
            trace!("Indication confirmed on 0x{:04x}", characteristic);
            return;
        };
        let Some((service, index)) = self.locate(characteristic) else {
            return;
        };
        let capabilities = self.services[service].config.capabilities;
        let bit = match index {
            CharacteristicIndex::Oacp => SubscriptionStatus::OACP,
            CharacteristicIndex::Olcp if capabilities.multiple_objects => SubscriptionStatus::OLCP,
            CharacteristicIndex::ObjectChanged if capabilities.object_changed => {
                SubscriptionStatus::OBJECT_CHANGED
            }
            _ => return,
        };
        let Some(slot) = self.session_index(service, connection) else {
            return;
        };
        let session = &mut self.services[service].sessions[slot];
        session
            .subscriptions
            .set(bit, flags.contains(CccdFlags::INDICATION));
        let subscriptions = session.subscriptions;
        debug!(
            "Connection {} subscriptions now {:?}",
            connection, subscriptions
        );
        self.handler
            .on_subscription_changed(service, connection, subscriptions);
    }

    /// Send an indication, queuing it while the transport is busy
    ///
    /// Once something is queued for a session, later indications queue
    /// behind it so they reach the peer in order.
    pub(super) fn send_indication(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        value: Vec<u8>,
    ) -> Result<()> {
        if value.len() > self.config.indication_size_max {
            return Err(Error::InvalidParameter("indication exceeds maximum size"));
        }
        let session = &self.services[service].sessions[slot];
        let connection = session.connection.ok_or(Error::NotFound)?;
        if session.indications.is_empty() {
            match self
                .transport
                .send_indication(connection, characteristic, &value)
            {
                Err(Error::InProgress) => {}
                other => return other,
            }
        }
        debug!("Queuing indication on 0x{:04x} for connection {}", characteristic, connection);
        let queued = session.indications.add(PendingIndication {
            connection,
            characteristic,
            value,
        });
        if let Err(err) = &queued {
            warn!("Indication for connection {} lost: {}", connection, err);
        }
        queued
    }

    /// Retry queued indications, at most one per session
    pub fn step(&mut self) {
        let transport = &mut self.transport;
        for instance in &self.services {
            for session in &instance.sessions {
                if session.connection.is_none() || session.indications.is_empty() {
                    continue;
                }
                let sent = session.indications.send_head(|pending| {
                    transport.send_indication(
                        pending.connection,
                        pending.characteristic,
                        &pending.value,
                    )
                });
                match sent {
                    Ok(()) | Err(Error::InProgress) | Err(Error::Empty) => {}
                    Err(err) => warn!("Queued indication not sent: {}", err),
                }
            }
        }
    }

    /// Whether any session still has queued indications
    pub fn has_pending_work(&self) -> bool {
        self.services.iter().any(|instance| {
            instance
                .sessions
                .iter()
                .any(|session| !session.indications.is_empty())
        })
    }

    /// Notify subscribed peers that an object changed on the server side
    pub fn object_changed(
        &mut self,
        service: ServiceId,
        object: &ObjectId,
        flags: ObjectChangedFlags,
    ) -> Result<()> {
        let instance = self.services.get(service).ok_or(Error::NotFound)?;
        if !instance.config.capabilities.object_changed {
            return Err(Error::NotSupported);
        }
        self.send_object_changed(service, object, flags - ObjectChangedFlags::SOURCE, None)
    }

    /// Fan out an Object Changed indication
    ///
    /// A client-initiated change (source flag set) is not reported back to
    /// the originating connection.
    pub(super) fn send_object_changed(
        &mut self,
        service: ServiceId,
        object: &ObjectId,
        flags: ObjectChangedFlags,
        origin: Option<ConnectionHandle>,
    ) -> Result<()> {
        let Some(characteristic) = self.services[service]
            .config
            .handles
            .get(CharacteristicIndex::ObjectChanged)
        else {
            return Err(Error::NotSupported);
        };
        let client_initiated = flags.contains(ObjectChangedFlags::SOURCE);
        let targets: Vec<usize> = self.services[service]
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, session)| match session.connection {
                Some(connection) => {
                    !(client_initiated && origin == Some(connection))
                        && session
                            .subscriptions
                            .contains(SubscriptionStatus::OBJECT_CHANGED)
                }
                None => false,
            })
            .map(|(slot, _)| slot)
            .collect();

        let value = ObjectChanged {
            flags,
            object: *object,
        }
        .encode();
        let mut result = Ok(());
        for slot in targets {
            if let Err(err) = self.send_indication(service, slot, characteristic, value.clone()) {
                result = Err(err);
            }
        }
        result
    }

    /// Whether an object is being transferred by any session of the instance
    pub(super) fn transfer_in_progress(&self, service: ServiceId, object: &ObjectId) -> bool {
        self.services[service].sessions.iter().any(|session| {
            session.connection.is_some()
                && session.selection.object == *object
                && self.bulk.is_in_progress(&session.transfer)
        })
    }

    /// Select the current object of a connection
    pub fn set_current_object(
        &mut self,
        service: ServiceId,
        connection: ConnectionHandle,
        selection: Selection,
    ) -> Result<()> {
        let session = self.session_mut(service, connection)?;
        session.selection = selection;
        debug!(
            "Connection {} current object {}",
            connection, session.selection.object
        );
        Ok(())
    }

    pub fn get_current_object(
        &self,
        service: ServiceId,
        connection: ConnectionHandle,
    ) -> Result<Selection> {
        Ok(self.session(service, connection)?.selection)
    }

    pub fn subscriptions(
        &self,
        service: ServiceId,
        connection: ConnectionHandle,
    ) -> Result<SubscriptionStatus> {
        Ok(self.session(service, connection)?.subscriptions)
    }

    /// Abort the transfer running on a connection
    pub fn abort(&mut self, service: ServiceId, connection: ConnectionHandle) -> Result<()> {
        let slot = self.session_index(service, connection).ok_or(Error::NotFound)?;
        let transfer = &self.services[service].sessions[slot].transfer;
        info!("Aborting {} on connection {}", transfer.id, connection);
        self.bulk.abort_transfer(transfer)
    }

    /// Grant the peer more credits for the running transfer
    pub fn increase_credit(
        &mut self,
        service: ServiceId,
        connection: ConnectionHandle,
        credit: u16,
    ) -> Result<()> {
        let slot = self.session_index(service, connection).ok_or(Error::NotFound)?;
        let transfer = &mut self.services[service].sessions[slot].transfer;
        if !self.bulk.is_in_progress(transfer) {
            return Err(Error::InvalidState);
        }
        transfer.add_credit(credit);
        self.bulk.increase_credit(transfer, credit)
    }

    /// The bulk channel asks for object bytes to send
    pub fn on_transfer_transmit(&mut self, id: TransferId, offset: u32, max_size: u16) -> Vec<u8> {
        let Some((service, slot)) = self.locate_transfer(id) else {
            warn!("Transmit request for unknown {}", id);
            return Vec::new();
        };
        let session = &self.services[service].sessions[slot];
        let connection = session.transfer.connection;
        self.handler.on_data_transmit(
            service,
            connection,
            &session.selection.object,
            offset,
            max_size,
        )
    }

    /// The bulk channel delivered object bytes; returns credits to grant
    pub fn on_transfer_receive(&mut self, id: TransferId, offset: u32, data: &[u8]) -> u16 {
        let Some((service, slot)) = self.locate_transfer(id) else {
            warn!("Received data for unknown {}", id);
            return 0;
        };
        let session = &self.services[service].sessions[slot];
        let connection = session.transfer.connection;
        self.handler
            .on_data_received(service, connection, &session.selection.object, offset, data)
    }

    /// The bulk channel finished a transfer, successfully or not
    pub fn on_transfer_finished(&mut self, id: TransferId, result: Result<()>) {
        let Some((service, slot)) = self.locate_transfer(id) else {
            warn!("Finished unknown {}", id);
            return;
        };
        let session = &mut self.services[service].sessions[slot];
        let connection = session.transfer.connection;
        let object = session.selection.object;
        session.transfer.reset();
        match &result {
            Ok(()) => info!("{} finished on connection {}", id, connection),
            Err(err) => warn!("{} failed on connection {}: {}", id, connection, err),
        }
        self.handler
            .on_transfer_finished(service, connection, &object, result);

        if self.services[service].config.capabilities.object_changed {
            let flags = ObjectChangedFlags::SOURCE | ObjectChangedFlags::CONTENTS;
            if let Err(err) = self.send_object_changed(service, &object, flags, Some(connection)) {
                debug!("Object changed after transfer not sent: {}", err);
            }
        }
    }
}
