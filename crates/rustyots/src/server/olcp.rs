//! OLCP engine of the server

use super::handler::{ServerHandler, ServiceId};
use super::session::OtsServer;
use crate::att::{AttErrorCode, AttResult};
use crate::error::Result;
use crate::gatt::{AttributeHandle, GattServerTransport};
use crate::l2cap::BulkChannel;
use crate::ots::{
    ObjectId, OlcpOpcode, OlcpRequest, OlcpResponse, OlcpResultCode, SortOrder,
    SubscriptionStatus,
};
use log::debug;

impl<T, B, H> OtsServer<T, B, H>
where
    T: GattServerTransport,
    B: BulkChannel,
    H: ServerHandler,
{
    /// Validate an OLCP write
    ///
    /// ATT level failures are returned as errors. Requests the engine
    /// refuses itself come back as `Err(code)` inside the `Ok`.
    fn validate_olcp(
        &self,
        service: ServiceId,
        slot: usize,
        value: &[u8],
    ) -> AttResult<std::result::Result<OlcpRequest, (u8, OlcpResultCode)>> {
        let (&opcode_byte, parameters) = value
            .split_first()
            .ok_or(AttErrorCode::InvalidAttributeValueLength)?;
        let instance = &self.services[service];
        let session = &instance.sessions[slot];
        if !session.subscriptions.contains(SubscriptionStatus::OLCP) {
            return Err(AttErrorCode::ImproperCccd);
        }

        let Ok(opcode) = OlcpOpcode::try_from(opcode_byte) else {
            return Ok(Err((opcode_byte, OlcpResultCode::OpCodeNotSupported)));
        };
        if opcode.needs_selection() && !session.selection.is_valid() {
            return Err(AttErrorCode::ObjectNotSelected);
        }
        if parameters.len() != opcode.parameter_len() {
            return Err(AttErrorCode::InvalidAttributeValueLength);
        }
        if let Some(feature) = opcode.required_feature() {
            if !instance.config.features.olcp.contains(feature) {
                return Ok(Err((opcode_byte, OlcpResultCode::OpCodeNotSupported)));
            }
        }

        let request = match opcode {
            OlcpOpcode::GoTo => match ObjectId::from_bytes(parameters) {
                Some(object) => OlcpRequest::GoTo(object),
                None => return Err(AttErrorCode::InvalidAttributeValueLength),
            },
            OlcpOpcode::Order => match SortOrder::try_from(parameters[0]) {
                Ok(order) => OlcpRequest::Order(order),
                Err(_) => return Ok(Err((opcode_byte, OlcpResultCode::InvalidParameter))),
            },
            _ => match OlcpRequest::decode(value) {
                Some(request) => request,
                None => return Err(AttErrorCode::InvalidAttributeValueLength),
            },
        };
        Ok(Ok(request))
    }

    pub(super) fn handle_olcp_write(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        let connection = self.services[service].sessions[slot].transfer.connection;
        let response = match self.validate_olcp(service, slot, value) {
            Err(err) => {
                debug!("OLCP write from connection {} rejected: {}", connection, err);
                return self
                    .transport
                    .send_write_response(connection, characteristic, Err(err));
            }
            Ok(Err((opcode, result))) => {
                debug!("OLCP opcode 0x{:02x} refused: {:?}", opcode, result);
                OlcpResponse {
                    request_opcode: opcode,
                    result,
                    number_of_objects: None,
                }
            }
            Ok(Ok(request)) => {
                debug!("OLCP {:?} from connection {}", request, connection);
                let mut count = 0u32;
                let session = &mut self.services[service].sessions[slot];
                let result = self.handler.on_olcp_request(
                    service,
                    connection,
                    &mut session.selection,
                    &request,
                    &mut count,
                );
                OlcpResponse {
                    request_opcode: request.opcode() as u8,
                    result,
                    number_of_objects: (request == OlcpRequest::RequestNumberOfObjects)
                        .then_some(count),
                }
            }
        };

        self.transport
            .send_write_response(connection, characteristic, Ok(()))?;
        let frame = response.encode();
        debug!(
            "OLCP response to connection {}: {}",
            connection,
            hex::encode(&frame)
        );
        self.send_indication(service, slot, characteristic, frame)
    }
}
