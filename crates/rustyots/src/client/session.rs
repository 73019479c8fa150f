//! Client session manager
//!
//! One session exists per (connection, OTS service instance) pair. GATT
//! client procedures on a connection are strictly serialized: at most one
//! session owns the connection at a time, and requests issued while it is
//! busy are parked in per-connection read and write queues that [`step`]
//! drains in order.
//!
//! [`step`]: OtsClient::step

use super::config::OtsClientConfig;
use super::handler::{ClientHandler, ClientId};
use super::state::ClientStatus;
use crate::att::{AttErrorCode, AttResult};
use crate::error::{Error, Result};
use crate::gatt::{AttributeHandle, CccdFlags, ConnectionHandle, GattClientTransport, Uuid};
use crate::l2cap::{
    BulkChannel, TransferBinding, TransferId, TransferMode, TransferParameters, L2CAP_OTS_SPSM,
};
use crate::ots::{
    CharacteristicIndex, GattHandles, GroupedMetadata, MetadataField, MetadataValue,
    OacpOpcode, OacpResponse, OacpResultCode, ObjectChanged, ObjectId, ObjectListFilter,
    OlcpResponse, OtsFeatures, SubscriptionStatus,
};
use crate::queue::BoundedQueue;
use log::{debug, error, info, trace, warn};
use std::collections::{HashMap, VecDeque};

/// Characteristics a server must expose for the client to use it
const MANDATORY_CHARACTERISTICS: [CharacteristicIndex; 6] = [
    CharacteristicIndex::OtsFeature,
    CharacteristicIndex::ObjectName,
    CharacteristicIndex::ObjectType,
    CharacteristicIndex::ObjectSize,
    CharacteristicIndex::ObjectProperties,
    CharacteristicIndex::Oacp,
];

/// Read parked until its connection is free
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct QueuedRead {
    pub client: ClientId,
    pub characteristic: AttributeHandle,
}

/// Write parked until its connection is free
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct QueuedWrite {
    pub client: ClientId,
    pub characteristic: AttributeHandle,
    pub value: Vec<u8>,
}

/// Request serialization state of one connection
pub(super) struct ConnectionQueues {
    /// Session whose GATT procedure is outstanding
    pub active: Option<ClientId>,
    pub reads: BoundedQueue<QueuedRead>,
    pub writes: BoundedQueue<QueuedWrite>,
}

impl ConnectionQueues {
    fn new(config: &OtsClientConfig) -> Result<Self> {
        Ok(Self {
            active: None,
            reads: BoundedQueue::with_capacity(config.read_queue_size)?,
            writes: BoundedQueue::with_capacity(config.write_queue_size)?,
        })
    }
}

/// Bulk transfer requested by an outstanding OACP Read or Write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PendingTransfer {
    pub mode: TransferMode,
    pub offset: u32,
    pub length: u32,
    pub params: TransferParameters,
}

/// Progress of a grouped metadata read
#[derive(Debug, Default)]
pub(super) struct GroupedRead {
    pub remaining: VecDeque<MetadataField>,
    pub metadata: GroupedMetadata,
}

/// Client side of one OTS service instance on one connection
pub(super) struct ClientSession {
    pub id: ClientId,
    pub connection: ConnectionHandle,
    /// Service handle handed to characteristic discovery
    pub service: u32,
    pub status: ClientStatus,
    pub handles: GattHandles,
    /// The server lacks Object ID or OLCP and exposes a single object
    pub single_object: bool,
    pub subscriptions: SubscriptionStatus,
    /// Last object ID read from the server
    pub current_object: ObjectId,
    /// Target of the outstanding read or write
    pub active_characteristic: Option<CharacteristicIndex>,
    /// Opcode of the outstanding control point request
    pub active_opcode: u8,
    pub pending_transfer: Option<PendingTransfer>,
    /// Value delivered for the outstanding read
    pub received: Vec<u8>,
    pub grouped: Option<GroupedRead>,
    pub transfer: TransferBinding,
}

impl ClientSession {
    fn new(id: ClientId, connection: ConnectionHandle, service: u32) -> Self {
        let mut transfer = TransferBinding::new(TransferId(id.0), connection);
        transfer.spsm = L2CAP_OTS_SPSM;
        Self {
            id,
            connection,
            service,
            status: ClientStatus::Begin,
            handles: GattHandles::default(),
            single_object: false,
            subscriptions: SubscriptionStatus::empty(),
            current_object: ObjectId::INVALID,
            active_characteristic: None,
            active_opcode: 0,
            pending_transfer: None,
            received: Vec::new(),
            grouped: None,
            transfer,
        }
    }
}

/// OTS client managing sessions on any number of connections
pub struct OtsClient<T, B, H> {
    config: OtsClientConfig,
    pub(super) sessions: Vec<ClientSession>,
    pub(super) connections: HashMap<ConnectionHandle, ConnectionQueues>,
    next_id: u32,
    pub(super) transport: T,
    pub(super) bulk: B,
    pub(super) handler: H,
}

impl<T, B, H> OtsClient<T, B, H>
where
    T: GattClientTransport,
    B: BulkChannel,
    H: ClientHandler,
{
    pub fn new(config: OtsClientConfig, transport: T, bulk: B, handler: H) -> Result<Self> {
        if config.read_queue_size == 0 || config.write_queue_size == 0 {
            return Err(Error::InvalidParameter("request queues must be non-empty"));
        }
        if config.write_request_data_size == 0 {
            return Err(Error::InvalidParameter("write request size must be non-zero"));
        }
        Ok(Self {
            config,
            sessions: Vec::new(),
            connections: HashMap::new(),
            next_id: 0,
            transport,
            bulk,
            handler,
        })
    }

    pub fn config(&self) -> &OtsClientConfig {
        &self.config
    }

    /// Register a session for an OTS service instance on a connection
    ///
    /// Discovery starts from the next [`step`](Self::step) in which the
    /// connection is free.
    pub fn add_client(&mut self, connection: ConnectionHandle, service: u32) -> Result<ClientId> {
        if connection == 0 {
            return Err(Error::InvalidParameter("invalid connection handle"));
        }
        if service == 0 {
            return Err(Error::InvalidParameter("invalid service handle"));
        }
        if !self.connections.contains_key(&connection) {
            let queues = ConnectionQueues::new(&self.config)?;
            self.connections.insert(connection, queues);
        }

        let id = ClientId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.sessions.push(ClientSession::new(id, connection, service));
        debug!("Added {} for service 0x{:08x} on connection {}", id, service, connection);
        Ok(id)
    }

    pub fn status(&self, client: ClientId) -> Result<ClientStatus> {
        Ok(self.sessions[self.index(client)?].status)
    }

    /// Object ID most recently read through this session
    pub fn current_object(&self, client: ClientId) -> Result<ObjectId> {
        Ok(self.sessions[self.index(client)?].current_object)
    }

    /// Characteristic handles found during discovery
    pub fn handles(&self, client: ClientId) -> Result<GattHandles> {
        Ok(self.sessions[self.index(client)?].handles)
    }

    pub fn subscriptions(&self, client: ClientId) -> Result<SubscriptionStatus> {
        Ok(self.sessions[self.index(client)?].subscriptions)
    }

    pub fn is_single_object(&self, client: ClientId) -> Result<bool> {
        Ok(self.sessions[self.index(client)?].single_object)
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

    pub(super) fn index(&self, client: ClientId) -> Result<usize> {
        self.sessions
            .iter()
            .position(|session| session.id == client)
            .ok_or(Error::NotFound)
    }

    /// Session owning the outstanding procedure on a connection
    fn active_index(&self, connection: ConnectionHandle) -> Option<usize> {
        let active = self.connections.get(&connection)?.active?;
        self.sessions.iter().position(|session| session.id == active)
    }

    fn release_connection(&mut self, connection: ConnectionHandle, client: ClientId) {
        if let Some(queues) = self.connections.get_mut(&connection) {
            if queues.active == Some(client) {
                queues.active = None;
            }
        }
    }

    /// Issue a characteristic read, or park it while the connection is busy
    pub(super) fn send_read(&mut self, index: usize, characteristic: CharacteristicIndex) -> Result<()> {
        let session = &mut self.sessions[index];
        let handle = session.handles.get(characteristic).ok_or(Error::NotSupported)?;
        let connection = session.connection;
        let queues = self.connections.get_mut(&connection).ok_or(Error::NotFound)?;

        let sent = match queues.active {
            None => self.transport.read_characteristic_value(connection, handle),
            Some(_) => Err(Error::InProgress),
        };
        match sent {
            Ok(()) => queues.active = Some(session.id),
            Err(Error::InProgress) => {
                debug!("Queuing read of 0x{:04x} for {}", handle, session.id);
                queues.reads.add(QueuedRead {
                    client: session.id,
                    characteristic: handle,
                })?;
            }
            Err(err) => return Err(err),
        }

        session.status = ClientStatus::WaitRead;
        session.active_characteristic = Some(characteristic);
        session.received.clear();
        Ok(())
    }

    /// Issue a characteristic write, or park it while the connection is busy
    ///
    /// `status` is the wait state the session enters.
    pub(super) fn send_write(
        &mut self,
        index: usize,
        characteristic: CharacteristicIndex,
        value: Vec<u8>,
        status: ClientStatus,
    ) -> Result<()> {
        if value.len() > self.config.write_request_data_size {
            return Err(Error::InvalidParameter("value exceeds write request size"));
        }
        let session = &mut self.sessions[index];
        let handle = session.handles.get(characteristic).ok_or(Error::NotSupported)?;
        let connection = session.connection;
        let queues = self.connections.get_mut(&connection).ok_or(Error::NotFound)?;

        let sent = match queues.active {
            None => self
                .transport
                .write_characteristic_value(connection, handle, &value),
            Some(_) => Err(Error::InProgress),
        };
        match sent {
            Ok(()) => queues.active = Some(session.id),
            Err(Error::InProgress) => {
                debug!("Queuing write to 0x{:04x} for {}", handle, session.id);
                queues.writes.add(QueuedWrite {
                    client: session.id,
                    characteristic: handle,
                    value,
                })?;
            }
            Err(err) => return Err(err),
        }

        session.status = status;
        session.active_characteristic = Some(characteristic);
        Ok(())
    }

    /// Start pending discoveries and issue parked requests on free connections
    pub fn step(&mut self) {
        let waiting: Vec<ClientId> = self
            .sessions
            .iter()
            .filter(|session| session.status == ClientStatus::Begin)
            .map(|session| session.id)
            .collect();
        for client in waiting {
            self.start_discovery(client);
        }

        let mut failed = Vec::new();
        for (connection, queues) in self.connections.iter_mut() {
            if queues.active.is_some() {
                continue;
            }
            let transport = &mut self.transport;
            let mut started = None;
            let result = queues.reads.send_head(|read| {
                transport.read_characteristic_value(*connection, read.characteristic)?;
                started = Some(read.client);
                Ok(())
            });
            match result {
                Ok(()) | Err(Error::Empty) => {}
                Err(Error::InProgress) => {
                    trace!("Queued read on connection {} deferred", connection)
                }
                Err(err) => {
                    if let Ok(read) = queues.reads.remove() {
                        failed.push((read.client, err));
                    }
                }
            }
            if started.is_none() {
                let result = queues.writes.send_head(|write| {
                    transport.write_characteristic_value(
                        *connection,
                        write.characteristic,
                        &write.value,
                    )?;
                    started = Some(write.client);
                    Ok(())
                });
                match result {
                    Ok(()) | Err(Error::Empty) => {}
                    Err(Error::InProgress) => {
                        trace!("Queued write on connection {} deferred", connection)
                    }
                    Err(err) => {
                        if let Ok(write) = queues.writes.remove() {
                            failed.push((write.client, err));
                        }
                    }
                }
            }
            queues.active = started;
        }

        for (client, err) in failed {
            self.fail_queued(client, err);
        }
    }

    /// A parked request could not be issued; report it as failed
    fn fail_queued(&mut self, client: ClientId, err: Error) {
        let Ok(index) = self.index(client) else {
            return;
        };
        warn!("{} queued request failed: {}", client, err);
        let code = match err {
            Error::Att(code) => code,
            _ => AttErrorCode::Unlikely,
        };
        match self.sessions[index].status {
            ClientStatus::WaitRead => self.complete_read(index, Err(code)),
            ClientStatus::WaitWrite => self.complete_write(index, Err(code)),
            ClientStatus::WaitOacp | ClientStatus::WaitOlcp => self.fail_control_point(index, code),
            status => debug!("{} dropped queued request in {:?}", client, status),
        }
    }

    /// Whether [`step`](Self::step) has anything left to do
    pub fn has_pending_work(&self) -> bool {
        self.sessions
            .iter()
            .any(|session| session.status == ClientStatus::Begin)
            || self
                .connections
                .values()
                .any(|queues| !queues.reads.is_empty() || !queues.writes.is_empty())
    }

    fn start_discovery(&mut self, client: ClientId) {
        let Ok(index) = self.index(client) else {
            return;
        };
        let session = &mut self.sessions[index];
        let Some(queues) = self.connections.get_mut(&session.connection) else {
            return;
        };
        if queues.active.is_some() {
            return;
        }

        match self
            .transport
            .discover_characteristics(session.connection, session.service)
        {
            Ok(()) => {
                debug!("{} discovering service 0x{:08x}", client, session.service);
                queues.active = Some(client);
                session.status = ClientStatus::Discovery;
            }
            Err(Error::InProgress) => {}
            Err(err) => {
                error!("{} failed to start discovery: {}", client, err);
                self.finish_init(index, Err(Error::Aborted));
            }
        }
    }

    /// Enable indications on the next present control characteristic, or
    /// finish initialization when none is left
    fn subscribe_next(&mut self, index: usize) {
        let session = &mut self.sessions[index];
        let mut status = session.status.next_subscription();
        while let Some(target) = status.subscription_target() {
            if let Some(handle) = session.handles.get(target) {
                match self.transport.set_characteristic_notification(
                    session.connection,
                    handle,
                    CccdFlags::INDICATION,
                ) {
                    Ok(()) => session.status = status,
                    Err(err) => self.finish_init(index, Err(err)),
                }
                return;
            }
            status = status.next_subscription();
        }
        self.finish_init(index, Ok(()));
    }

    /// Report the end of initialization; a failed session is removed
    fn finish_init(&mut self, index: usize, result: Result<()>) {
        let failed = result.is_err();
        let session = &mut self.sessions[index];
        session.status = ClientStatus::initialized(!failed);
        let client = session.id;
        let connection = session.connection;
        match &result {
            Ok(()) => info!("{} initialized on connection {}", client, connection),
            Err(err) => warn!("{} initialization failed: {}", client, err),
        }

        self.handler.on_init(client, result);
        self.release_connection(connection, client);
        if failed {
            self.sessions.remove(index);
        }
    }

    pub fn on_connection_opened(&mut self, connection: ConnectionHandle) {
        let clients: Vec<ClientId> = self
            .sessions
            .iter()
            .filter(|session| session.connection == connection)
            .map(|session| session.id)
            .collect();
        for client in clients {
            self.handler.on_connect(client);
        }
    }

    /// Drop every session and parked request of a closed connection
    pub fn on_connection_closed(&mut self, connection: ConnectionHandle) {
        self.connections.remove(&connection);

        let mut index = 0;
        while index < self.sessions.len() {
            if self.sessions[index].connection != connection {
                index += 1;
                continue;
            }
            let mut session = self.sessions.remove(index);
            session.status = ClientStatus::Disconnected;
            if self.bulk.is_in_progress(&session.transfer) {
                if let Err(err) = self.bulk.abort_transfer(&session.transfer) {
                    warn!("Failed to abort {}: {}", session.transfer.id, err);
                }
            }
            info!("{} disconnected", session.id);
            self.handler.on_disconnect(session.id);
        }
    }

    /// Record a characteristic found while discovering a session's service
    pub fn on_characteristic_discovered(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        uuid: &Uuid,
    ) {
        let Some(index) = self.active_index(connection) else {
            return;
        };
        let session = &mut self.sessions[index];
        if session.status != ClientStatus::Discovery {
            return;
        }
        if let Some(found) = uuid.as_u16().and_then(CharacteristicIndex::from_uuid) {
            trace!("{} found {:?} at 0x{:04x}", session.id, found, characteristic);
            session.handles.set(found, characteristic);
        }
    }

    /// Completion of the outstanding GATT procedure on a connection
    pub fn on_procedure_completed(&mut self, connection: ConnectionHandle, result: AttResult<()>) {
        let Some(index) = self.active_index(connection) else {
            trace!("Procedure completed on idle connection {}", connection);
            return;
        };
        let status = self.sessions[index].status;
        match status {
            ClientStatus::WaitRead => self.complete_read(index, result),
            ClientStatus::WaitWrite => self.complete_write(index, result),
            ClientStatus::WaitOacp | ClientStatus::WaitOlcp => match result {
                Ok(()) => self.sessions[index].status = status.acknowledged(),
                Err(err) => self.fail_control_point(index, err),
            },
            ClientStatus::Discovery => self.complete_discovery(index, result),
            ClientStatus::SubscribeOacp
            | ClientStatus::SubscribeOlcp
            | ClientStatus::SubscribeObjectChanged => self.complete_subscription(index, result),
            _ => trace!("Procedure completed on connection {} in {:?}", connection, status),
        }
    }

    fn complete_discovery(&mut self, index: usize, result: AttResult<()>) {
        if let Err(err) = result {
            self.finish_init(index, Err(err.into()));
            return;
        }
        let session = &mut self.sessions[index];
        if let Some(missing) = MANDATORY_CHARACTERISTICS
            .iter()
            .find(|characteristic| !session.handles.contains(**characteristic))
        {
            warn!("{} server lacks {:?}", session.id, missing);
            self.finish_init(index, Err(Error::Aborted));
            return;
        }
        session.single_object = !session.handles.contains(CharacteristicIndex::ObjectId)
            || !session.handles.contains(CharacteristicIndex::Olcp);
        self.subscribe_next(index);
    }

    fn complete_subscription(&mut self, index: usize, result: AttResult<()>) {
        if let Err(err) = result {
            self.finish_init(index, Err(err.into()));
            return;
        }
        let session = &mut self.sessions[index];
        session.subscriptions |= match session.status {
            ClientStatus::SubscribeOacp => SubscriptionStatus::OACP,
            ClientStatus::SubscribeOlcp => SubscriptionStatus::OLCP,
            _ => SubscriptionStatus::OBJECT_CHANGED,
        };
        let client = session.id;
        let subscriptions = session.subscriptions;
        self.handler.on_subscription_changed(client, subscriptions);
        self.subscribe_next(index);
    }

    fn complete_read(&mut self, index: usize, result: AttResult<()>) {
        let session = &mut self.sessions[index];
        let client = session.id;
        let connection = session.connection;
        let characteristic = session.active_characteristic.take();
        let value = std::mem::take(&mut session.received);
        session.status = session.status.acknowledged();
        self.release_connection(connection, client);

        match characteristic {
            Some(CharacteristicIndex::OtsFeature) => {
                let features = result.and_then(|()| {
                    OtsFeatures::decode(&value).ok_or(AttErrorCode::InvalidAttributeValueLength)
                });
                self.handler.on_features_read(client, features);
            }
            Some(CharacteristicIndex::ObjectListFilter) => {
                let filter = result.and_then(|()| ObjectListFilter::decode(&value));
                self.handler.on_filter_read(client, filter);
            }
            Some(other) => {
                let Some(field) = MetadataField::from_characteristic(other) else {
                    return;
                };
                let decoded = result.and_then(|()| decode_metadata(field, &value));
                if let Ok(MetadataValue::Id(object)) = &decoded {
                    self.sessions[index].current_object = *object;
                }
                self.metadata_read_finished(index, field, decoded);
            }
            None => {}
        }
    }

    fn metadata_read_finished(
        &mut self,
        index: usize,
        field: MetadataField,
        result: AttResult<MetadataValue>,
    ) {
        let session = &mut self.sessions[index];
        let client = session.id;
        let object = session.current_object;
        let Some(grouped) = session.grouped.as_mut() else {
            self.handler.on_metadata_read(client, &object, field, result);
            return;
        };

        let next = match result {
            Ok(value) => {
                grouped.metadata.store(value);
                grouped.remaining.pop_front()
            }
            Err(err) => {
                self.finish_grouped_read(index, Err(err.into()));
                return;
            }
        };
        match next {
            Some(field) => {
                if let Err(err) = self.send_read(index, field.characteristic()) {
                    warn!("{} grouped read of {:?} not sent: {}", client, field, err);
                    self.finish_grouped_read(index, Err(err));
                }
            }
            None => self.finish_grouped_read(index, Ok(())),
        }
    }

    fn finish_grouped_read(&mut self, index: usize, result: Result<()>) {
        let session = &mut self.sessions[index];
        let Some(grouped) = session.grouped.take() else {
            return;
        };
        let client = session.id;
        let object = session.current_object;
        debug!("{} grouped read finished: {:?}", client, result);
        self.handler
            .on_grouped_metadata_read(client, &object, result, &grouped.metadata);
    }

    fn complete_write(&mut self, index: usize, result: AttResult<()>) {
        let session = &mut self.sessions[index];
        let client = session.id;
        let connection = session.connection;
        let object = session.current_object;
        let characteristic = session.active_characteristic.take();
        session.status = session.status.acknowledged();
        self.release_connection(connection, client);

        match characteristic {
            Some(CharacteristicIndex::ObjectListFilter) => {
                self.handler.on_filter_write(client, result);
            }
            Some(other) => {
                if let Some(field) = MetadataField::from_characteristic(other) {
                    self.handler.on_metadata_write(client, &object, field, result);
                }
            }
            None => {}
        }
    }

    /// Return a session leaving a control point exchange to the state its
    /// bulk channel dictates
    fn settle(&mut self, index: usize) {
        let session = &mut self.sessions[index];
        session.active_characteristic = None;
        session.status = if self.bulk.is_in_progress(&session.transfer) {
            ClientStatus::WaitOacpTransfer
        } else {
            ClientStatus::Initialized
        };
    }

    /// The write of a control point request failed
    fn fail_control_point(&mut self, index: usize, err: AttErrorCode) {
        let olcp = self.sessions[index].status == ClientStatus::WaitOlcp;
        self.settle(index);
        let session = &mut self.sessions[index];
        session.pending_transfer = None;
        let client = session.id;
        let connection = session.connection;
        let object = session.current_object;
        let opcode = session.active_opcode;
        self.release_connection(connection, client);

        warn!("{} control point write 0x{:02x} failed: {}", client, opcode, err);
        if olcp {
            self.handler.on_olcp_response(client, &object, opcode, Err(err));
        } else {
            self.handler.on_oacp_response(client, &object, opcode, Err(err));
        }
    }

    /// Value notification or indication from a server
    ///
    /// Indications are always confirmed, whether or not a session used them.
    pub fn on_characteristic_value(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
        is_indication: bool,
    ) {
        trace!(
            "Value on 0x{:04x} from connection {}: {}",
            characteristic,
            connection,
            hex::encode(value)
        );

        let active = self.active_index(connection);
        if let Some(index) = active {
            let session = &mut self.sessions[index];
            let target = session
                .active_characteristic
                .and_then(|active| session.handles.get(active));
            if session.status == ClientStatus::WaitRead && target == Some(characteristic) {
                session.received = value.to_vec();
            }
        }
        if !is_indication {
            return;
        }

        if let Some(index) = active {
            let session = &self.sessions[index];
            let handles = session.handles;
            let status = session.status;
            match status {
                ClientStatus::WaitOlcpIndication
                    if handles.get(CharacteristicIndex::Olcp) == Some(characteristic) =>
                {
                    self.olcp_indication(index, value)
                }
                ClientStatus::WaitOacpIndication
                    if handles.get(CharacteristicIndex::Oacp) == Some(characteristic) =>
                {
                    self.oacp_indication(index, value)
                }
                _ => {}
            }
        }

        for index in 0..self.sessions.len() {
            let session = &self.sessions[index];
            if session.connection != connection
                || session.handles.get(CharacteristicIndex::ObjectChanged) != Some(characteristic)
            {
                continue;
            }
            match ObjectChanged::decode(value) {
                Some(changed) => {
                    debug!("{} object {} changed: {:?}", session.id, changed.object, changed.flags);
                    self.handler.on_object_changed(session.id, &changed);
                }
                None => warn!("{} malformed object changed indication", session.id),
            }
        }

        if let Err(err) = self.transport.send_characteristic_confirmation(connection) {
            warn!("Confirmation on connection {} failed: {}", connection, err);
        }
    }

    fn olcp_indication(&mut self, index: usize, value: &[u8]) {
        let session = &mut self.sessions[index];
        let opcode = session.active_opcode;
        let result = match value.get(1) {
            Some(request) if *request != opcode => Err(AttErrorCode::ValueNotAllowed),
            _ => OlcpResponse::decode(value).ok_or(AttErrorCode::InvalidAttributeValueLength),
        };
        session.status = ClientStatus::Initialized;
        session.active_characteristic = None;
        let client = session.id;
        let connection = session.connection;
        let object = session.current_object;
        self.release_connection(connection, client);
        self.handler.on_olcp_response(client, &object, opcode, result);
    }

    fn oacp_indication(&mut self, index: usize, value: &[u8]) {
        let session = &mut self.sessions[index];
        let opcode = session.active_opcode;
        let pending = session.pending_transfer.take();
        let mut result = match value.get(1) {
            Some(request) if *request != opcode => Err(AttErrorCode::ValueNotAllowed),
            _ => OacpResponse::decode(value)
                .filter(|response| response_data_fits(opcode, response))
                .ok_or(AttErrorCode::InvalidAttributeValueLength),
        };
        self.settle(index);

        if let (Ok(response), Some(pending)) = (result.as_mut(), pending) {
            if response.result == OacpResultCode::Success {
                if let Err(err) = self.start_transfer(index, pending) {
                    warn!("Bulk transfer for opcode 0x{:02x} not started: {}", opcode, err);
                    response.result = OacpResultCode::ChannelUnavailable;
                }
            }
        }

        let session = &self.sessions[index];
        let client = session.id;
        let connection = session.connection;
        let object = session.current_object;
        self.release_connection(connection, client);
        self.handler.on_oacp_response(client, &object, opcode, result);
    }

    fn start_transfer(&mut self, index: usize, pending: PendingTransfer) -> Result<()> {
        let session = &mut self.sessions[index];
        session
            .transfer
            .arm(pending.mode, pending.offset, pending.length, pending.params);
        match self.bulk.start_transfer(&session.transfer, true) {
            Ok(()) => {
                info!(
                    "{} {:?} of {} byte(s) at offset {} started",
                    session.transfer.id, pending.mode, pending.length, pending.offset
                );
                session.status = ClientStatus::WaitOacpTransfer;
                Ok(())
            }
            Err(err) => {
                session.transfer.reset();
                Err(err)
            }
        }
    }

    fn locate_transfer(&self, id: TransferId) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.transfer.id == id && session.transfer.is_armed())
    }

    /// Bulk channel asks for object bytes of a running Write
    pub fn on_transfer_transmit(&mut self, id: TransferId, offset: u32, max_size: u16) -> Vec<u8> {
        let Some(index) = self.locate_transfer(id) else {
            warn!("Transmit request for unknown {}", id);
            return Vec::new();
        };
        let session = &self.sessions[index];
        self.handler
            .on_data_transmit(session.id, &session.current_object, offset, max_size)
    }

    /// Bulk channel delivered object bytes of a running Read
    pub fn on_transfer_receive(&mut self, id: TransferId, offset: u32, data: &[u8]) -> u16 {
        let Some(index) = self.locate_transfer(id) else {
            warn!("Received data for unknown {}", id);
            return 0;
        };
        let session = &self.sessions[index];
        self.handler
            .on_data_received(session.id, &session.current_object, offset, data)
    }

    pub fn on_transfer_finished(&mut self, id: TransferId, result: Result<()>) {
        let Some(index) = self.locate_transfer(id) else {
            warn!("Finished unknown {}", id);
            return;
        };
        let session = &mut self.sessions[index];
        session.transfer.reset();
        if session.status == ClientStatus::WaitOacpTransfer {
            session.status = ClientStatus::Initialized;
        }
        match &result {
            Ok(()) => info!("{} finished", id),
            Err(err) => warn!("{} failed: {}", id, err),
        }
        let client = session.id;
        let object = session.current_object;
        self.handler.on_transfer_finished(client, &object, result);
    }
}

/// Decode a metadata read; an empty name is malformed
fn decode_metadata(field: MetadataField, value: &[u8]) -> AttResult<MetadataValue> {
    if field == MetadataField::Name && value.is_empty() {
        return Err(AttErrorCode::InvalidAttributeValueLength);
    }
    MetadataValue::decode(field, value).ok_or(AttErrorCode::InvalidAttributeValueLength)
}

/// Whether an OACP response carries the data its request opcode calls for
///
/// A refused checksum request carries no checksum.
fn response_data_fits(opcode: u8, response: &OacpResponse) -> bool {
    let len = response.data.len();
    match OacpOpcode::try_from(opcode) {
        Ok(OacpOpcode::CalculateChecksum) if response.result == OacpResultCode::Success => len == 4,
        Ok(OacpOpcode::Execute) => true,
        _ => len == 0,
    }
}
