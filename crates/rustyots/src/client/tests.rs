//! Unit tests for the OTS client

use super::*;
use crate::att::{AttErrorCode, AttResult};
use crate::error::{Error, Result};
use crate::gatt::{AttributeHandle, CccdFlags, ConnectionHandle, GattClientTransport, Uuid};
use crate::l2cap::{BulkChannel, TransferBinding, TransferId, TransferMode, TransferParameters};
use crate::ots::*;

const CONN: ConnectionHandle = 1;
const SERVICE: u32 = 0x0001_0020;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Discover(ConnectionHandle, u32),
    Subscribe(ConnectionHandle, AttributeHandle, CccdFlags),
    Read(ConnectionHandle, AttributeHandle),
    Write(ConnectionHandle, AttributeHandle, Vec<u8>),
    Confirm(ConnectionHandle),
}

#[derive(Default)]
struct MockTransport {
    calls: Vec<Call>,
    busy: bool,
    broken: bool,
}

impl MockTransport {
    fn last(&self) -> Option<&Call> {
        self.calls.last()
    }

    fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }
}

impl GattClientTransport for MockTransport {
    fn discover_characteristics(
        &mut self,
        connection: ConnectionHandle,
        service: u32,
    ) -> Result<()> {
        self.calls.push(Call::Discover(connection, service));
        Ok(())
    }

    fn set_characteristic_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        flags: CccdFlags,
    ) -> Result<()> {
        self.calls
            .push(Call::Subscribe(connection, characteristic, flags));
        Ok(())
    }

    fn read_characteristic_value(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
    ) -> Result<()> {
        if self.busy {
            return Err(Error::InProgress);
        }
        if self.broken {
            return Err(Error::Transport(0x0185));
        }
        self.calls.push(Call::Read(connection, characteristic));
        Ok(())
    }

    fn write_characteristic_value(
        &mut self,
        connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        if self.busy {
            return Err(Error::InProgress);
        }
        if self.broken {
            return Err(Error::Transport(0x0185));
        }
        self.calls
            .push(Call::Write(connection, characteristic, value.to_vec()));
        Ok(())
    }

    fn send_characteristic_confirmation(&mut self, connection: ConnectionHandle) -> Result<()> {
        self.calls.push(Call::Confirm(connection));
        Ok(())
    }
}

#[derive(Default)]
struct MockBulk {
    started: Vec<(TransferBinding, bool)>,
    aborted: Vec<TransferId>,
    active: Vec<TransferId>,
    credits: Vec<(TransferId, u16)>,
    refuse_start: bool,
}

impl BulkChannel for MockBulk {
    fn start_transfer(&mut self, binding: &TransferBinding, initiator: bool) -> Result<()> {
        if self.refuse_start {
            return Err(Error::Transport(0x0181));
        }
        self.started.push((binding.clone(), initiator));
        self.active.push(binding.id);
        Ok(())
    }

    fn abort_transfer(&mut self, binding: &TransferBinding) -> Result<()> {
        self.aborted.push(binding.id);
        self.active.retain(|id| *id != binding.id);
        Ok(())
    }

    fn is_in_progress(&self, binding: &TransferBinding) -> bool {
        self.active.contains(&binding.id)
    }

    fn increase_credit(&mut self, binding: &TransferBinding, credit: u16) -> Result<()> {
        self.credits.push((binding.id, credit));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Init(ClientId, Result<()>),
    Connect(ClientId),
    Disconnect(ClientId),
    Subscriptions(ClientId, SubscriptionStatus),
    Features(ClientId, AttResult<OtsFeatures>),
    MetadataRead(ObjectId, MetadataField, AttResult<MetadataValue>),
    MetadataWrite(MetadataField, AttResult<()>),
    Grouped(Result<()>, GroupedMetadata),
    FilterRead(AttResult<ObjectListFilter>),
    FilterWrite(AttResult<()>),
    Oacp(u8, AttResult<OacpResponse>),
    Olcp(u8, AttResult<OlcpResponse>),
    Received(u32, Vec<u8>),
    TransferFinished(Result<()>),
    ObjectChanged(ClientId, ObjectChanged),
}

#[derive(Default)]
struct MockHandler {
    events: Vec<Event>,
    transmit: Vec<u8>,
}

impl MockHandler {
    fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

impl ClientHandler for MockHandler {
    fn on_init(&mut self, client: ClientId, result: Result<()>) {
        self.events.push(Event::Init(client, result));
    }

    fn on_connect(&mut self, client: ClientId) {
        self.events.push(Event::Connect(client));
    }

    fn on_disconnect(&mut self, client: ClientId) {
        self.events.push(Event::Disconnect(client));
    }

    fn on_subscription_changed(&mut self, client: ClientId, status: SubscriptionStatus) {
        self.events.push(Event::Subscriptions(client, status));
    }

    fn on_features_read(&mut self, client: ClientId, result: AttResult<OtsFeatures>) {
        self.events.push(Event::Features(client, result));
    }

    fn on_metadata_read(
        &mut self,
        _client: ClientId,
        object: &ObjectId,
        field: MetadataField,
        result: AttResult<MetadataValue>,
    ) {
        self.events.push(Event::MetadataRead(*object, field, result));
    }

    fn on_metadata_write(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        field: MetadataField,
        result: AttResult<()>,
    ) {
        self.events.push(Event::MetadataWrite(field, result));
    }

    fn on_grouped_metadata_read(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        result: Result<()>,
        metadata: &GroupedMetadata,
    ) {
        self.events.push(Event::Grouped(result, metadata.clone()));
    }

    fn on_filter_read(&mut self, _client: ClientId, result: AttResult<ObjectListFilter>) {
        self.events.push(Event::FilterRead(result));
    }

    fn on_filter_write(&mut self, _client: ClientId, result: AttResult<()>) {
        self.events.push(Event::FilterWrite(result));
    }

    fn on_oacp_response(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        opcode: u8,
        result: AttResult<OacpResponse>,
    ) {
        self.events.push(Event::Oacp(opcode, result));
    }

    fn on_olcp_response(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        opcode: u8,
        result: AttResult<OlcpResponse>,
    ) {
        self.events.push(Event::Olcp(opcode, result));
    }

    fn on_data_transmit(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        offset: u32,
        max_size: u16,
    ) -> Vec<u8> {
        self.transmit
            .iter()
            .skip(offset as usize)
            .take(max_size as usize)
            .copied()
            .collect()
    }

    fn on_data_received(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        offset: u32,
        data: &[u8],
    ) -> u16 {
        self.events.push(Event::Received(offset, data.to_vec()));
        1
    }

    fn on_transfer_finished(&mut self, _client: ClientId, _object: &ObjectId, result: Result<()>) {
        self.events.push(Event::TransferFinished(result));
    }

    fn on_object_changed(&mut self, client: ClientId, changed: &ObjectChanged) {
        self.events.push(Event::ObjectChanged(client, *changed));
    }
}

type TestClient = OtsClient<MockTransport, MockBulk, MockHandler>;

fn handle(index: CharacteristicIndex) -> AttributeHandle {
    0x20 + index as AttributeHandle
}

fn client_with(config: OtsClientConfig) -> TestClient {
    OtsClient::new(
        config,
        MockTransport::default(),
        MockBulk::default(),
        MockHandler::default(),
    )
    .unwrap()
}

/// Run discovery and subscriptions against a server exposing `present`
fn initialize(client: &mut TestClient, id: ClientId, present: &[CharacteristicIndex]) {
    client.step();
    assert_eq!(client.status(id), Ok(ClientStatus::Discovery));
    for index in present {
        client.on_characteristic_discovered(CONN, handle(*index), &Uuid::Uuid16(index.uuid()));
    }
    client.on_procedure_completed(CONN, Ok(()));
    while matches!(client.status(id), Ok(status) if status.is_initializing()) {
        client.on_procedure_completed(CONN, Ok(()));
    }
}

fn ready() -> (TestClient, ClientId) {
    let mut client = client_with(OtsClientConfig::default());
    let id = client.add_client(CONN, SERVICE).unwrap();
    initialize(&mut client, id, &CharacteristicIndex::ALL);
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
    (client, id)
}

/// Complete a control point write and deliver its response indication
fn respond(client: &mut TestClient, index: CharacteristicIndex, response: &[u8]) {
    client.on_procedure_completed(CONN, Ok(()));
    client.on_characteristic_value(CONN, handle(index), response, true);
}

/// Complete a read with the given value
fn read_back(client: &mut TestClient, index: CharacteristicIndex, value: &[u8]) {
    client.on_characteristic_value(CONN, handle(index), value, false);
    client.on_procedure_completed(CONN, Ok(()));
}

fn params() -> TransferParameters {
    TransferParameters {
        max_sdu: 100,
        max_pdu: 98,
    }
}

/// Bring a session into a running OACP Read of 100 bytes
fn start_read(client: &mut TestClient, id: ClientId) {
    client.oacp_read(id, 0, 100, params()).unwrap();
    respond(client, CharacteristicIndex::Oacp, &[0x60, 0x05, 0x01]);
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacpTransfer));
}

#[test]
fn test_add_client_validation() {
    let mut client = client_with(OtsClientConfig::default());
    assert!(matches!(
        client.add_client(0, SERVICE),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        client.add_client(CONN, 0),
        Err(Error::InvalidParameter(_))
    ));
    let config = OtsClientConfig {
        read_queue_size: 0,
        ..OtsClientConfig::default()
    };
    assert!(OtsClient::new(
        config,
        MockTransport::default(),
        MockBulk::default(),
        MockHandler::default()
    )
    .is_err());
}

#[test]
fn test_initialization_sequence() {
    let mut client = client_with(OtsClientConfig::default());
    let id = client.add_client(CONN, SERVICE).unwrap();
    assert_eq!(client.status(id), Ok(ClientStatus::Begin));
    assert!(client.has_pending_work());
    assert_eq!(client.read_features(id), Err(Error::InvalidState));

    initialize(&mut client, id, &CharacteristicIndex::ALL);

    let transport = client.transport();
    assert_eq!(transport.calls[0], Call::Discover(CONN, SERVICE));
    assert_eq!(
        transport.calls[1..],
        [
            Call::Subscribe(CONN, handle(CharacteristicIndex::Oacp), CccdFlags::INDICATION),
            Call::Subscribe(CONN, handle(CharacteristicIndex::Olcp), CccdFlags::INDICATION),
            Call::Subscribe(
                CONN,
                handle(CharacteristicIndex::ObjectChanged),
                CccdFlags::INDICATION
            ),
        ]
    );
    assert_eq!(
        client.handler().events,
        vec![
            Event::Subscriptions(id, SubscriptionStatus::OACP),
            Event::Subscriptions(id, SubscriptionStatus::OACP | SubscriptionStatus::OLCP),
            Event::Subscriptions(id, SubscriptionStatus::all()),
            Event::Init(id, Ok(())),
        ]
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
    assert_eq!(client.is_single_object(id), Ok(false));
    assert_eq!(
        client.handles(id).unwrap().get(CharacteristicIndex::ObjectId),
        Some(handle(CharacteristicIndex::ObjectId))
    );
    assert!(!client.has_pending_work());
}

#[test]
fn test_missing_mandatory_characteristic_aborts() {
    let mut client = client_with(OtsClientConfig::default());
    let id = client.add_client(CONN, SERVICE).unwrap();
    let present: Vec<CharacteristicIndex> = CharacteristicIndex::ALL
        .iter()
        .copied()
        .filter(|index| *index != CharacteristicIndex::Oacp)
        .collect();
    initialize(&mut client, id, &present);

    assert_eq!(
        client.handler().last(),
        Some(&Event::Init(id, Err(Error::Aborted)))
    );
    assert_eq!(client.status(id), Err(Error::NotFound));
}

#[test]
fn test_single_object_server() {
    let mut client = client_with(OtsClientConfig::default());
    let id = client.add_client(CONN, SERVICE).unwrap();
    let present = [
        CharacteristicIndex::OtsFeature,
        CharacteristicIndex::ObjectName,
        CharacteristicIndex::ObjectType,
        CharacteristicIndex::ObjectSize,
        CharacteristicIndex::ObjectProperties,
        CharacteristicIndex::Oacp,
    ];
    initialize(&mut client, id, &present);

    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
    assert_eq!(client.is_single_object(id), Ok(true));
    assert_eq!(client.subscriptions(id), Ok(SubscriptionStatus::OACP));
    assert_eq!(
        client.transport().count(|call| matches!(call, Call::Subscribe(..))),
        1
    );
    assert_eq!(
        client.olcp_request(id, &OlcpRequest::First),
        Err(Error::NotSupported)
    );
    assert_eq!(client.read_filter(id), Err(Error::NotSupported));
    assert_eq!(
        client.read_metadata(id, MetadataField::FirstCreated),
        Err(Error::NotSupported)
    );
}

#[test]
fn test_subscription_failure_ends_initialization() {
    let mut client = client_with(OtsClientConfig::default());
    let id = client.add_client(CONN, SERVICE).unwrap();
    client.step();
    for index in CharacteristicIndex::ALL {
        client.on_characteristic_discovered(CONN, handle(index), &Uuid::Uuid16(index.uuid()));
    }
    client.on_procedure_completed(CONN, Ok(()));
    assert_eq!(client.status(id), Ok(ClientStatus::SubscribeOacp));

    client.on_procedure_completed(CONN, Err(AttErrorCode::ImproperCccd));
    assert_eq!(
        client.handler().last(),
        Some(&Event::Init(id, Err(Error::Att(AttErrorCode::ImproperCccd))))
    );
    assert_eq!(client.status(id), Err(Error::NotFound));
}

#[test]
fn test_read_features() {
    let (mut client, id) = ready();
    client.read_features(id).unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Read(CONN, handle(CharacteristicIndex::OtsFeature)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::WaitRead));
    assert_eq!(client.read_features(id), Err(Error::InvalidState));

    let features = OtsFeatures {
        oacp: OacpFeatures::READ | OacpFeatures::WRITE,
        olcp: OlcpFeatures::GO_TO,
    };
    read_back(&mut client, CharacteristicIndex::OtsFeature, &features.encode());
    assert_eq!(client.handler().last(), Some(&Event::Features(id, Ok(features))));
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_read_object_id_updates_current_object() {
    let (mut client, id) = ready();
    assert!(!client.current_object(id).unwrap().is_valid());

    let object = ObjectId::from_u64(0x0102);
    client.read_metadata(id, MetadataField::Id).unwrap();
    read_back(&mut client, CharacteristicIndex::ObjectId, &object.to_bytes());

    assert_eq!(client.current_object(id), Ok(object));
    assert_eq!(
        client.handler().last(),
        Some(&Event::MetadataRead(
            object,
            MetadataField::Id,
            Ok(MetadataValue::Id(object))
        ))
    );
}

#[test]
fn test_malformed_and_failed_reads() {
    let (mut client, id) = ready();
    client.read_metadata(id, MetadataField::Size).unwrap();
    read_back(&mut client, CharacteristicIndex::ObjectSize, &[1, 2, 3]);
    assert!(matches!(
        client.handler().last(),
        Some(Event::MetadataRead(
            _,
            MetadataField::Size,
            Err(AttErrorCode::InvalidAttributeValueLength)
        ))
    ));

    client.read_metadata(id, MetadataField::Name).unwrap();
    client.on_procedure_completed(CONN, Err(AttErrorCode::ObjectNotSelected));
    assert!(matches!(
        client.handler().last(),
        Some(Event::MetadataRead(
            _,
            MetadataField::Name,
            Err(AttErrorCode::ObjectNotSelected)
        ))
    ));
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_requests_serialize_per_connection() {
    let (mut client, first) = ready();
    let second = client.add_client(CONN, SERVICE + 1).unwrap();
    initialize(&mut client, second, &CharacteristicIndex::ALL);
    assert_eq!(client.status(second), Ok(ClientStatus::Initialized));
    client.transport_mut().calls.clear();

    client.read_features(first).unwrap();
    client.read_metadata(second, MetadataField::Name).unwrap();
    assert_eq!(client.transport().calls.len(), 1);
    assert_eq!(client.status(second), Ok(ClientStatus::WaitRead));
    assert!(client.has_pending_work());

    // The queued read waits while the first one is outstanding
    client.step();
    assert_eq!(client.transport().calls.len(), 1);

    read_back(&mut client, CharacteristicIndex::OtsFeature, &[0; 8]);
    assert!(matches!(
        client.handler().last(),
        Some(Event::Features(client_id, Ok(_))) if *client_id == first
    ));

    client.step();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Read(CONN, handle(CharacteristicIndex::ObjectName)))
    );
    assert!(!client.has_pending_work());

    read_back(&mut client, CharacteristicIndex::ObjectName, b"log");
    assert!(matches!(
        client.handler().last(),
        Some(Event::MetadataRead(_, MetadataField::Name, Ok(MetadataValue::Name(name)))) if name == b"log"
    ));
    assert_eq!(client.status(second), Ok(ClientStatus::Initialized));
}

#[test]
fn test_busy_transport_queues_request() {
    let (mut client, id) = ready();
    client.transport_mut().busy = true;
    client.write_filter(id, &ObjectListFilter::MarkedObjects).unwrap();
    assert_eq!(client.status(id), Ok(ClientStatus::WaitWrite));
    assert!(client.has_pending_work());

    client.step();
    assert!(client.has_pending_work());

    client.transport_mut().busy = false;
    client.step();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Write(
            CONN,
            handle(CharacteristicIndex::ObjectListFilter),
            ObjectListFilter::MarkedObjects.encode()
        ))
    );
    client.on_procedure_completed(CONN, Ok(()));
    assert_eq!(client.handler().last(), Some(&Event::FilterWrite(Ok(()))));
}

#[test]
fn test_failed_queued_request_is_reported() {
    let (mut client, id) = ready();
    client.transport_mut().busy = true;
    client.read_features(id).unwrap();
    assert_eq!(client.status(id), Ok(ClientStatus::WaitRead));

    client.transport_mut().busy = false;
    client.transport_mut().broken = true;
    client.step();
    assert_eq!(
        client.handler().last(),
        Some(&Event::Features(id, Err(AttErrorCode::Unlikely)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
    assert!(!client.has_pending_work());

    client.transport_mut().busy = true;
    client.oacp_delete(id).unwrap();
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacp));
    client.transport_mut().busy = false;
    client.step();
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(0x02, Err(AttErrorCode::Unlikely)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
    assert!(!client.has_pending_work());

    // The connection is free for the next request
    client.transport_mut().broken = false;
    client.read_features(id).unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Read(CONN, handle(CharacteristicIndex::OtsFeature)))
    );
}

#[test]
fn test_full_request_queue() {
    let config = OtsClientConfig {
        read_queue_size: 1,
        ..OtsClientConfig::default()
    };
    let mut client = client_with(config);
    let first = client.add_client(CONN, SERVICE).unwrap();
    initialize(&mut client, first, &CharacteristicIndex::ALL);
    let second = client.add_client(CONN, SERVICE + 1).unwrap();
    initialize(&mut client, second, &CharacteristicIndex::ALL);

    client.transport_mut().busy = true;
    client.read_features(first).unwrap();
    assert_eq!(client.read_features(second), Err(Error::WouldOverflow));
    assert_eq!(client.status(second), Ok(ClientStatus::Initialized));
}

#[test]
fn test_grouped_metadata_read() {
    let (mut client, id) = ready();
    client
        .read_object_metadata(id, MetadataFields::NAME | MetadataFields::SIZE)
        .unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Read(CONN, handle(CharacteristicIndex::ObjectName)))
    );

    read_back(&mut client, CharacteristicIndex::ObjectName, b"fw.bin");
    assert_eq!(
        client.transport().last(),
        Some(&Call::Read(CONN, handle(CharacteristicIndex::ObjectSize)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::WaitRead));

    let size = ObjectSize {
        current: 10,
        allocated: 64,
    };
    read_back(&mut client, CharacteristicIndex::ObjectSize, &size.encode());

    let expected = GroupedMetadata {
        name: Some(b"fw.bin".to_vec()),
        size: Some(size),
        ..GroupedMetadata::default()
    };
    assert_eq!(client.handler().last(), Some(&Event::Grouped(Ok(()), expected)));
    assert_eq!(client.handler().events.len(), 5);
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_grouped_metadata_read_failure() {
    let (mut client, id) = ready();
    assert!(matches!(
        client.read_object_metadata(id, MetadataFields::empty()),
        Err(Error::InvalidParameter(_))
    ));

    client
        .read_object_metadata(id, MetadataFields::TYPE | MetadataFields::PROPERTIES)
        .unwrap();
    client.on_procedure_completed(CONN, Err(AttErrorCode::ReadNotPermitted));
    assert_eq!(
        client.handler().last(),
        Some(&Event::Grouped(
            Err(Error::Att(AttErrorCode::ReadNotPermitted)),
            GroupedMetadata::default()
        ))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_write_metadata() {
    let (mut client, id) = ready();
    let name = MetadataValue::Name(b"notes".to_vec());
    client.write_metadata(id, &name).unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Write(
            CONN,
            handle(CharacteristicIndex::ObjectName),
            b"notes".to_vec()
        ))
    );
    client.on_procedure_completed(CONN, Err(AttErrorCode::ObjectNameAlreadyExists));
    assert_eq!(
        client.handler().last(),
        Some(&Event::MetadataWrite(
            MetadataField::Name,
            Err(AttErrorCode::ObjectNameAlreadyExists)
        ))
    );

    let size = MetadataValue::Size(ObjectSize::default());
    assert!(matches!(
        client.write_metadata(id, &size),
        Err(Error::InvalidParameter(_))
    ));

    let long_name = MetadataValue::Name(vec![b'a'; 65]);
    assert!(matches!(
        client.write_metadata(id, &long_name),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_filter_read() {
    let (mut client, id) = ready();
    client.read_filter(id).unwrap();
    let filter = ObjectListFilter::NameStartsWith(b"img".to_vec());
    read_back(&mut client, CharacteristicIndex::ObjectListFilter, &filter.encode());
    assert_eq!(client.handler().last(), Some(&Event::FilterRead(Ok(filter))));
}

#[test]
fn test_oacp_argument_validation() {
    let (mut client, id) = ready();
    assert!(matches!(
        client.oacp_create(id, 0, Uuid::Uuid16(0x2ACA)),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        client.oacp_calculate_checksum(id, 0, 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        client.oacp_read(id, 0, 0, params()),
        Err(Error::InvalidParameter(_))
    ));
    let tiny = TransferParameters {
        max_sdu: 10,
        max_pdu: 10,
    };
    assert!(matches!(
        client.oacp_read(id, 0, 10, tiny),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        client.oacp_write(id, 0, 10, WriteMode::from_bits_retain(0x80), params()),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        client.oacp_execute(id, &[0; 64]),
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(client.oacp_abort(id), Err(Error::InvalidState));
    assert_eq!(client.abort(id), Err(Error::InvalidState));
    assert_eq!(client.increase_credit(id, 1), Err(Error::InvalidState));
    assert_eq!(client.transport().count(|call| matches!(call, Call::Write(..))), 0);

    client.oacp_execute(id, &[0; 63]).unwrap();
}

#[test]
fn test_oacp_read_transfer() {
    let (mut client, id) = ready();
    client.oacp_read(id, 0, 100, params()).unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Write(
            CONN,
            handle(CharacteristicIndex::Oacp),
            OacpRequest::Read {
                offset: 0,
                length: 100
            }
            .encode()
        ))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacp));

    client.on_procedure_completed(CONN, Ok(()));
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacpIndication));
    client.on_characteristic_value(CONN, handle(CharacteristicIndex::Oacp), &[0x60, 0x05, 0x01], true);

    let (binding, initiator) = &client.bulk().started[0];
    assert!(*initiator);
    assert_eq!(binding.mode, TransferMode::Receive);
    assert_eq!(binding.data_length, 100);
    assert_eq!(binding.max_sdu, 100);
    assert_eq!(binding.max_pdu, 98);
    assert_eq!(binding.credit, 1);
    assert_eq!(binding.spsm, 0x0081);
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacpTransfer));
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(
            0x05,
            Ok(OacpResponse::new(0x05, OacpResultCode::Success))
        ))
    );
    assert_eq!(client.transport().last(), Some(&Call::Confirm(CONN)));

    let transfer = TransferId(id.0);
    assert_eq!(client.on_transfer_receive(transfer, 0, &[1, 2, 3]), 1);
    assert_eq!(client.handler().last(), Some(&Event::Received(0, vec![1, 2, 3])));

    client.increase_credit(id, 2).unwrap();
    assert_eq!(client.bulk().credits, vec![(transfer, 2)]);

    client.on_transfer_finished(transfer, Ok(()));
    assert_eq!(client.handler().last(), Some(&Event::TransferFinished(Ok(()))));
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_oacp_write_transfer() {
    let (mut client, id) = ready();
    client.handler_mut().transmit = vec![9; 20];
    client
        .oacp_write(id, 4, 20, WriteMode::TRUNCATE, params())
        .unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x06, 0x01]);

    let (binding, _) = &client.bulk().started[0];
    assert_eq!(binding.mode, TransferMode::Transmit);
    assert_eq!(binding.data_offset, 4);
    let transfer = binding.id;
    assert_eq!(client.on_transfer_transmit(transfer, 0, 8), vec![9; 8]);

    client.abort(id).unwrap();
    assert_eq!(client.bulk().aborted, vec![transfer]);
    client.on_transfer_finished(transfer, Err(Error::Aborted));
    assert_eq!(
        client.handler().last(),
        Some(&Event::TransferFinished(Err(Error::Aborted)))
    );
}

#[test]
fn test_abort_read_uses_control_point() {
    let (mut client, id) = ready();
    start_read(&mut client, id);

    client.abort(id).unwrap();
    assert_eq!(
        client.transport().last(),
        Some(&Call::Write(CONN, handle(CharacteristicIndex::Oacp), vec![0x07]))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacp));

    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x07, 0x01]);
    // The server ends the transfer on its own
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOacpTransfer));

    client.on_transfer_finished(TransferId(id.0), Err(Error::Aborted));
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_oacp_response_validation() {
    let (mut client, id) = ready();

    client.oacp_read(id, 0, 100, params()).unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x02, 0x01]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(0x05, Err(AttErrorCode::ValueNotAllowed)))
    );
    assert!(client.bulk().started.is_empty());
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));

    client.oacp_calculate_checksum(id, 0, 16).unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x03, 0x01, 0xAA]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(0x03, Err(AttErrorCode::InvalidAttributeValueLength)))
    );

    // A refused checksum request carries no checksum
    client.oacp_calculate_checksum(id, 0, 16).unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x03, 0x03]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(
            0x03,
            Ok(OacpResponse::new(0x03, OacpResultCode::InvalidParameter))
        ))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));

    client.oacp_calculate_checksum(id, 0, 16).unwrap();
    respond(
        &mut client,
        CharacteristicIndex::Oacp,
        &[0x60, 0x03, 0x01, 0x78, 0x56, 0x34, 0x12],
    );
    match client.handler().last() {
        Some(Event::Oacp(0x03, Ok(response))) => {
            assert_eq!(response.checksum(), Some(0x1234_5678))
        }
        other => panic!("unexpected event {:?}", other),
    }

    client.oacp_delete(id).unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x02]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(0x02, Err(AttErrorCode::InvalidAttributeValueLength)))
    );
}

#[test]
fn test_oacp_write_failure_and_channel_unavailable() {
    let (mut client, id) = ready();
    client.oacp_delete(id).unwrap();
    client.on_procedure_completed(CONN, Err(AttErrorCode::ImproperCccd));
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(0x02, Err(AttErrorCode::ImproperCccd)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));

    client.bulk_mut().refuse_start = true;
    client.oacp_read(id, 0, 100, params()).unwrap();
    respond(&mut client, CharacteristicIndex::Oacp, &[0x60, 0x05, 0x01]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Oacp(
            0x05,
            Ok(OacpResponse::new(0x05, OacpResultCode::ChannelUnavailable))
        ))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_olcp_requests() {
    let (mut client, id) = ready();
    client
        .olcp_request(id, &OlcpRequest::RequestNumberOfObjects)
        .unwrap();
    assert_eq!(client.status(id), Ok(ClientStatus::WaitOlcp));
    respond(
        &mut client,
        CharacteristicIndex::Olcp,
        &[0x70, 0x07, 0x01, 5, 0, 0, 0],
    );
    assert_eq!(
        client.handler().last(),
        Some(&Event::Olcp(
            0x07,
            Ok(OlcpResponse {
                request_opcode: 0x07,
                result: OlcpResultCode::Success,
                number_of_objects: Some(5),
            })
        ))
    );

    client.olcp_request(id, &OlcpRequest::Next).unwrap();
    respond(&mut client, CharacteristicIndex::Olcp, &[0x70, 0x04]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Olcp(0x04, Err(AttErrorCode::InvalidAttributeValueLength)))
    );

    client.olcp_request(id, &OlcpRequest::First).unwrap();
    respond(&mut client, CharacteristicIndex::Olcp, &[0x70, 0x02, 0x07]);
    assert_eq!(
        client.handler().last(),
        Some(&Event::Olcp(0x01, Err(AttErrorCode::ValueNotAllowed)))
    );
    assert_eq!(client.status(id), Ok(ClientStatus::Initialized));
}

#[test]
fn test_object_changed_indication() {
    let (mut client, id) = ready();
    let changed = ObjectChanged {
        flags: ObjectChangedFlags::CONTENTS,
        object: ObjectId::from_u64(7),
    };
    client.on_characteristic_value(
        CONN,
        handle(CharacteristicIndex::ObjectChanged),
        &changed.encode(),
        true,
    );
    assert_eq!(client.handler().last(), Some(&Event::ObjectChanged(id, changed)));
    assert_eq!(client.transport().last(), Some(&Call::Confirm(CONN)));

    // Unrelated indications are still confirmed
    let confirms = client.transport().count(|call| *call == Call::Confirm(CONN));
    client.on_characteristic_value(CONN, 0x0100, &[1], true);
    assert_eq!(
        client.transport().count(|call| *call == Call::Confirm(CONN)),
        confirms + 1
    );
}

#[test]
fn test_connection_events() {
    let (mut client, id) = ready();
    client.on_connection_opened(CONN);
    assert_eq!(client.handler().last(), Some(&Event::Connect(id)));

    start_read(&mut client, id);
    client.on_connection_closed(CONN);
    assert_eq!(client.bulk().aborted, vec![TransferId(id.0)]);
    assert_eq!(client.handler().last(), Some(&Event::Disconnect(id)));
    assert_eq!(client.status(id), Err(Error::NotFound));
    assert!(!client.has_pending_work());
}
