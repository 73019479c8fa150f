//! Example wiring an OTS server and an OTS client back to back
//!
//! Both engines run in one process. Their GATT transports and bulk channels
//! are connected through an in-memory wire, and `pump` delivers traffic
//! until both sides are idle. The client navigates to the first object,
//! reads its metadata and then fetches its contents over the bulk channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustyots::att::{AttErrorCode, AttResult};
use rustyots::client::{ClientHandler, ClientId, OtsClient, OtsClientConfig};
use rustyots::gatt::{
    AttributeHandle, CccdFlags, CharacteristicStatus, ConnectionHandle, GattClientTransport,
    GattServerTransport, Uuid,
};
use rustyots::l2cap::{BulkChannel, TransferBinding, TransferMode, TransferParameters};
use rustyots::ots::{
    CharacteristicIndex, GattHandles, GroupedMetadata, MetadataField, MetadataFields,
    MetadataValue, OacpFeatures, OacpRequest, OacpResponse, OacpResultCode, ObjectId,
    ObjectProperties, ObjectSize, OlcpFeatures, OlcpRequest, OlcpResponse, OlcpResultCode,
    OtsFeatures,
};
use rustyots::server::{
    OtsServer, OtsServerConfig, OtsServiceConfig, Selection, ServerHandler, ServiceId,
};
use rustyots::Result;

const CONN: ConnectionHandle = 1;
const SERVICE: u32 = 0x0001_0010;

enum ToServer {
    Read(AttributeHandle),
    Write(AttributeHandle, Vec<u8>),
    Subscribe(AttributeHandle, CccdFlags),
    Confirm,
}

enum ToClient {
    Discovered(AttributeHandle, Uuid),
    Completed(AttResult<()>),
    Value(AttributeHandle, Vec<u8>, bool),
}

/// Everything in flight between the two sides
#[derive(Default)]
struct Wire {
    to_server: VecDeque<ToServer>,
    to_client: VecDeque<ToClient>,
    server_transfer: Option<TransferBinding>,
    client_transfer: Option<TransferBinding>,
}

#[derive(Clone, Default)]
struct Link(Arc<Mutex<Wire>>);

impl Link {
    fn wire(&self) -> MutexGuard<'_, Wire> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn handles() -> GattHandles {
    GattHandles::new(std::array::from_fn(|index| 0x20 + index as AttributeHandle))
}

struct ServerLink(Link);

impl GattServerTransport for ServerLink {
    fn send_read_response(
        &mut self,
        _connection: ConnectionHandle,
        characteristic: AttributeHandle,
        result: AttResult<&[u8]>,
    ) -> Result<()> {
        let mut wire = self.0.wire();
        match result {
            Ok(value) => {
                wire.to_client
                    .push_back(ToClient::Value(characteristic, value.to_vec(), false));
                wire.to_client.push_back(ToClient::Completed(Ok(())));
            }
            Err(err) => wire.to_client.push_back(ToClient::Completed(Err(err))),
        }
        Ok(())
    }

    fn send_write_response(
        &mut self,
        _connection: ConnectionHandle,
        _characteristic: AttributeHandle,
        result: AttResult<()>,
    ) -> Result<()> {
        self.0.wire().to_client.push_back(ToClient::Completed(result));
        Ok(())
    }

    fn send_indication(
        &mut self,
        _connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        self.0
            .wire()
            .to_client
            .push_back(ToClient::Value(characteristic, value.to_vec(), true));
        Ok(())
    }
}

struct ClientLink(Link);

impl GattClientTransport for ClientLink {
    fn discover_characteristics(&mut self, _connection: ConnectionHandle, _service: u32) -> Result<()> {
        let handles = handles();
        let mut wire = self.0.wire();
        for index in CharacteristicIndex::ALL {
            if let Some(handle) = handles.get(index) {
                wire.to_client
                    .push_back(ToClient::Discovered(handle, Uuid::Uuid16(index.uuid())));
            }
        }
        wire.to_client.push_back(ToClient::Completed(Ok(())));
        Ok(())
    }

    fn set_characteristic_notification(
        &mut self,
        _connection: ConnectionHandle,
        characteristic: AttributeHandle,
        flags: CccdFlags,
    ) -> Result<()> {
        self.0
            .wire()
            .to_server
            .push_back(ToServer::Subscribe(characteristic, flags));
        Ok(())
    }

    fn read_characteristic_value(
        &mut self,
        _connection: ConnectionHandle,
        characteristic: AttributeHandle,
    ) -> Result<()> {
        self.0.wire().to_server.push_back(ToServer::Read(characteristic));
        Ok(())
    }

    fn write_characteristic_value(
        &mut self,
        _connection: ConnectionHandle,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        self.0
            .wire()
            .to_server
            .push_back(ToServer::Write(characteristic, value.to_vec()));
        Ok(())
    }

    fn send_characteristic_confirmation(&mut self, _connection: ConnectionHandle) -> Result<()> {
        self.0.wire().to_server.push_back(ToServer::Confirm);
        Ok(())
    }
}

/// Bulk channel end; `server` selects which side of the wire it owns
struct Bulk {
    link: Link,
    server: bool,
}

impl Bulk {
    fn slot<'a>(&self, wire: &'a mut Wire) -> &'a mut Option<TransferBinding> {
        if self.server {
            &mut wire.server_transfer
        } else {
            &mut wire.client_transfer
        }
    }
}

impl BulkChannel for Bulk {
    fn start_transfer(&mut self, binding: &TransferBinding, _initiator: bool) -> Result<()> {
        let mut wire = self.link.wire();
        *self.slot(&mut wire) = Some(binding.clone());
        Ok(())
    }

    fn abort_transfer(&mut self, _binding: &TransferBinding) -> Result<()> {
        let mut wire = self.link.wire();
        *self.slot(&mut wire) = None;
        Ok(())
    }

    fn is_in_progress(&self, binding: &TransferBinding) -> bool {
        let mut wire = self.link.wire();
        matches!(self.slot(&mut wire), Some(active) if active.id == binding.id)
    }

    fn increase_credit(&mut self, _binding: &TransferBinding, _credit: u16) -> Result<()> {
        Ok(())
    }
}

struct StoredObject {
    id: ObjectId,
    name: &'static str,
    contents: Vec<u8>,
}

impl StoredObject {
    fn selection(&self) -> Selection {
        let size = self.contents.len() as u32;
        Selection::new(self.id)
            .with_properties(ObjectProperties::READ)
            .with_size(ObjectSize {
                current: size,
                allocated: size,
            })
    }
}

/// Read-only object store served by the example
struct Store {
    objects: Vec<StoredObject>,
}

impl Store {
    fn find(&self, object: &ObjectId) -> Option<&StoredObject> {
        self.objects.iter().find(|stored| stored.id == *object)
    }
}

impl ServerHandler for Store {
    fn on_oacp_request(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        _selection: &mut Selection,
        request: &OacpRequest,
        _transfer: &mut TransferParameters,
        _response_data: &mut Vec<u8>,
    ) -> OacpResultCode {
        match request {
            OacpRequest::Read { .. } => OacpResultCode::Success,
            _ => OacpResultCode::OpCodeNotSupported,
        }
    }

    fn on_olcp_request(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        selection: &mut Selection,
        request: &OlcpRequest,
        number_of_objects: &mut u32,
    ) -> OlcpResultCode {
        let position = self
            .objects
            .iter()
            .position(|stored| stored.id == selection.object);
        let target = match request {
            OlcpRequest::First => 0,
            OlcpRequest::Last => self.objects.len().saturating_sub(1),
            OlcpRequest::Next => match position {
                Some(index) if index + 1 < self.objects.len() => index + 1,
                _ => return OlcpResultCode::OutOfBounds,
            },
            OlcpRequest::RequestNumberOfObjects => {
                *number_of_objects = self.objects.len() as u32;
                return OlcpResultCode::Success;
            }
            _ => return OlcpResultCode::OpCodeNotSupported,
        };
        match self.objects.get(target) {
            Some(stored) => {
                *selection = stored.selection();
                OlcpResultCode::Success
            }
            None => OlcpResultCode::NoObject,
        }
    }

    fn on_metadata_read(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        object: &ObjectId,
        field: MetadataField,
    ) -> AttResult<MetadataValue> {
        let stored = self.find(object).ok_or(AttErrorCode::ObjectNotSelected)?;
        let size = stored.contents.len() as u32;
        match field {
            MetadataField::Name => Ok(MetadataValue::Name(stored.name.as_bytes().to_vec())),
            MetadataField::Type => Ok(MetadataValue::Type(Uuid::Uuid16(0x2ACA))),
            MetadataField::Size => Ok(MetadataValue::Size(ObjectSize {
                current: size,
                allocated: size,
            })),
            MetadataField::Properties => Ok(MetadataValue::Properties(ObjectProperties::READ)),
            _ => Err(AttErrorCode::RequestNotSupported),
        }
    }

    fn on_data_transmit(
        &mut self,
        _service: ServiceId,
        _connection: ConnectionHandle,
        object: &ObjectId,
        offset: u32,
        max_size: u16,
    ) -> Vec<u8> {
        self.find(object)
            .map(|stored| {
                stored
                    .contents
                    .iter()
                    .skip(offset as usize)
                    .take(max_size as usize)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Client application printing every completion
#[derive(Default)]
struct Printer {
    metadata: GroupedMetadata,
    received: Vec<u8>,
}

impl ClientHandler for Printer {
    fn on_init(&mut self, client: ClientId, result: Result<()>) {
        println!("{} initialized: {:?}", client, result);
    }

    fn on_olcp_response(
        &mut self,
        client: ClientId,
        _object: &ObjectId,
        opcode: u8,
        result: AttResult<OlcpResponse>,
    ) {
        println!("{} OLCP 0x{:02x}: {:?}", client, opcode, result);
    }

    fn on_oacp_response(
        &mut self,
        client: ClientId,
        _object: &ObjectId,
        opcode: u8,
        result: AttResult<OacpResponse>,
    ) {
        println!("{} OACP 0x{:02x}: {:?}", client, opcode, result);
    }

    fn on_grouped_metadata_read(
        &mut self,
        client: ClientId,
        object: &ObjectId,
        result: Result<()>,
        metadata: &GroupedMetadata,
    ) {
        println!("{} metadata of {}: {:?} {:?}", client, object, result, metadata);
        self.metadata = metadata.clone();
    }

    fn on_data_received(
        &mut self,
        _client: ClientId,
        _object: &ObjectId,
        _offset: u32,
        data: &[u8],
    ) -> u16 {
        self.received.extend_from_slice(data);
        1
    }

    fn on_transfer_finished(&mut self, client: ClientId, object: &ObjectId, result: Result<()>) {
        println!("{} transfer of {} finished: {:?}", client, object, result);
    }
}

type Server = OtsServer<ServerLink, Bulk, Store>;
type Client = OtsClient<ClientLink, Bulk, Printer>;

/// Move object bytes once both ends of the bulk channel are started
fn move_contents(server: &mut Server, client: &mut Client, link: &Link) -> bool {
    let (sender, receiver) = {
        let mut wire = link.wire();
        match (wire.server_transfer.clone(), wire.client_transfer.clone()) {
            (Some(sender), Some(receiver)) if receiver.mode == TransferMode::Receive => {
                wire.server_transfer = None;
                wire.client_transfer = None;
                (sender, receiver)
            }
            _ => return false,
        }
    };

    let end = receiver.data_offset + receiver.data_length;
    let mut offset = receiver.data_offset;
    while offset < end {
        let chunk = server.on_transfer_transmit(sender.id, offset, receiver.max_sdu);
        if chunk.is_empty() {
            break;
        }
        client.on_transfer_receive(receiver.id, offset, &chunk);
        offset += chunk.len() as u32;
    }
    server.on_transfer_finished(sender.id, Ok(()));
    client.on_transfer_finished(receiver.id, Ok(()));
    true
}

/// Deliver traffic until neither side has anything left to do
fn pump(server: &mut Server, client: &mut Client, link: &Link) -> Result<()> {
    loop {
        client.step();
        server.step();

        let to_server = link.wire().to_server.pop_front();
        if let Some(message) = to_server {
            match message {
                ToServer::Read(handle) => server.on_read_request(CONN, handle)?,
                ToServer::Write(handle, value) => server.on_write_request(CONN, handle, &value)?,
                ToServer::Subscribe(handle, flags) => {
                    server.on_characteristic_status(
                        CONN,
                        handle,
                        CharacteristicStatus::ClientConfig(flags),
                    );
                    link.wire().to_client.push_back(ToClient::Completed(Ok(())));
                }
                ToServer::Confirm => {
                    server.on_characteristic_status(CONN, 0, CharacteristicStatus::Confirmation)
                }
            }
            continue;
        }

        let to_client = link.wire().to_client.pop_front();
        if let Some(message) = to_client {
            match message {
                ToClient::Discovered(handle, uuid) => {
                    client.on_characteristic_discovered(CONN, handle, &uuid)
                }
                ToClient::Completed(result) => client.on_procedure_completed(CONN, result),
                ToClient::Value(handle, value, indication) => {
                    client.on_characteristic_value(CONN, handle, &value, indication)
                }
            }
            continue;
        }

        if move_contents(server, client, link) {
            continue;
        }
        if !client.has_pending_work() && !server.has_pending_work() {
            return Ok(());
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let link = Link::default();

    let service = OtsServiceConfig {
        handles: handles(),
        features: OtsFeatures {
            oacp: OacpFeatures::READ,
            olcp: OlcpFeatures::REQUEST_NUMBER_OF_OBJECTS,
        },
        ..OtsServiceConfig::default()
    };
    let store = Store {
        objects: vec![
            StoredObject {
                id: ObjectId::from_u64(0x100),
                name: "readme.txt",
                contents: b"Objects travel over the bulk channel.".to_vec(),
            },
            StoredObject {
                id: ObjectId::from_u64(0x101),
                name: "empty.bin",
                contents: Vec::new(),
            },
        ],
    };
    let mut server = OtsServer::new(
        OtsServerConfig::default(),
        vec![service],
        ServerLink(link.clone()),
        Bulk {
            link: link.clone(),
            server: true,
        },
        store,
    )?;
    let mut client = OtsClient::new(
        OtsClientConfig::default(),
        ClientLink(link.clone()),
        Bulk {
            link: link.clone(),
            server: false,
        },
        Printer::default(),
    )?;

    let id = client.add_client(CONN, SERVICE)?;
    server.on_connection_opened(CONN);
    client.on_connection_opened(CONN);
    pump(&mut server, &mut client, &link)?;
    println!("Subscriptions: {:?}", client.subscriptions(id)?);

    client.olcp_request(id, &OlcpRequest::RequestNumberOfObjects)?;
    pump(&mut server, &mut client, &link)?;
    client.olcp_request(id, &OlcpRequest::First)?;
    pump(&mut server, &mut client, &link)?;

    let fields = MetadataFields::NAME | MetadataFields::SIZE | MetadataFields::ID;
    client.read_object_metadata(id, fields)?;
    pump(&mut server, &mut client, &link)?;

    let length = client
        .handler()
        .metadata
        .size
        .map(|size| size.current)
        .unwrap_or(0);
    let params = TransferParameters {
        max_sdu: 64,
        max_pdu: 62,
    };
    client.oacp_read(id, 0, length, params)?;
    pump(&mut server, &mut client, &link)?;
    println!(
        "Received {:?}",
        String::from_utf8_lossy(&client.handler().received)
    );

    server.on_connection_closed(CONN);
    client.on_connection_closed(CONN);
    Ok(())
}
