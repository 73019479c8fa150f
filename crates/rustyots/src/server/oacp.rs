//! OACP engine of the server

use super::handler::{Selection, ServerHandler, ServiceId};
use super::session::OtsServer;
use crate::att::{AttErrorCode, AttResult};
use crate::error::Result;
use crate::gatt::{AttributeHandle, GattServerTransport};
use crate::l2cap::{BulkChannel, TransferMode, TransferParameters};
use crate::ots::{
    OacpFeatures, OacpOpcode, OacpRequest, OacpResponse, OacpResultCode, ObjectChangedFlags,
    ObjectProperties, SubscriptionStatus, WriteMode,
};
use log::{debug, info, warn};

/// Result of the local checks on an OACP write
#[derive(Debug)]
enum Validation {
    Accepted(OacpRequest),
    Rejected(u8, OacpResultCode),
}

/// Check a decoded request against the features and the cached metadata
/// of the current object
///
/// `locked` tells whether the object is bound to a running transfer.
pub(super) fn check_request(
    features: OacpFeatures,
    selection: &Selection,
    locked: bool,
    request: &OacpRequest,
) -> std::result::Result<(), OacpResultCode> {
    let require_property = |property: ObjectProperties| match selection.properties {
        Some(properties) if !properties.contains(property) => {
            Err(OacpResultCode::ProcedureNotPermitted)
        }
        _ => Ok(()),
    };
    let unlocked = || {
        if locked {
            Err(OacpResultCode::ObjectLocked)
        } else {
            Ok(())
        }
    };

    match request {
        OacpRequest::Create { .. } => unlocked(),
        OacpRequest::Delete => require_property(ObjectProperties::DELETE),
        OacpRequest::CalculateChecksum { offset, length } => {
            if *length == 0 {
                return Err(OacpResultCode::InvalidParameter);
            }
            if let Some(size) = selection.size {
                if u64::from(*offset) + u64::from(*length) > u64::from(size.current) {
                    return Err(OacpResultCode::InvalidParameter);
                }
            }
            unlocked()
        }
        OacpRequest::Execute { .. } => require_property(ObjectProperties::EXECUTE),
        OacpRequest::Read { offset, length } => {
            if *length == 0 {
                return Err(OacpResultCode::InvalidParameter);
            }
            require_property(ObjectProperties::READ)?;
            if let Some(size) = selection.size {
                if u64::from(*offset) + u64::from(*length) > u64::from(size.current) {
                    return Err(OacpResultCode::InvalidParameter);
                }
            }
            unlocked()
        }
        OacpRequest::Write {
            offset,
            length,
            mode,
        } => {
            let truncate = mode.contains(WriteMode::TRUNCATE);
            if truncate && !features.contains(OacpFeatures::TRUNCATE) {
                return Err(OacpResultCode::ProcedureNotPermitted);
            }
            if *length == 0 || mode.has_reserved_bits() {
                return Err(OacpResultCode::InvalidParameter);
            }
            let mut patching = false;
            if let Some(size) = selection.size {
                let end = u64::from(*offset) + u64::from(*length);
                if !features.contains(OacpFeatures::APPEND) && end > u64::from(size.allocated) {
                    return Err(OacpResultCode::InvalidParameter);
                }
                if *offset > size.current {
                    return Err(OacpResultCode::InvalidParameter);
                }
                patching = *offset > 0 || (*length < size.allocated && !truncate);
            }
            if patching && !features.contains(OacpFeatures::PATCH) {
                return Err(OacpResultCode::ProcedureNotPermitted);
            }
            require_property(ObjectProperties::WRITE)?;
            if truncate {
                require_property(ObjectProperties::TRUNCATE)?;
            }
            if patching {
                require_property(ObjectProperties::PATCH)?;
            }
            unlocked()
        }
        OacpRequest::Abort => Ok(()),
    }
}

impl<T, B, H> OtsServer<T, B, H>
where
    T: GattServerTransport,
    B: BulkChannel,
    H: ServerHandler,
{
    fn validate_oacp(&self, service: ServiceId, slot: usize, value: &[u8]) -> AttResult<Validation> {
        let (&opcode_byte, parameters) = value
            .split_first()
            .ok_or(AttErrorCode::InvalidAttributeValueLength)?;
        let instance = &self.services[service];
        let session = &instance.sessions[slot];
        if !session.selection.is_valid() {
            return Err(AttErrorCode::ObjectNotSelected);
        }
        if !session.subscriptions.contains(SubscriptionStatus::OACP) {
            return Err(AttErrorCode::ImproperCccd);
        }

        let Ok(opcode) = OacpOpcode::try_from(opcode_byte) else {
            return Ok(Validation::Rejected(
                opcode_byte,
                OacpResultCode::OpCodeNotSupported,
            ));
        };
        let features = instance.config.features.oacp;
        if !features.contains(opcode.required_feature()) {
            return Ok(Validation::Rejected(
                opcode_byte,
                OacpResultCode::ProcedureNotPermitted,
            ));
        }
        if !opcode.accepts_parameter_len(parameters.len()) {
            return Err(AttErrorCode::InvalidAttributeValueLength);
        }
        let request =
            OacpRequest::decode(value).ok_or(AttErrorCode::InvalidAttributeValueLength)?;

        let locked = self.transfer_in_progress(service, &session.selection.object);
        match check_request(features, &session.selection, locked, &request) {
            Ok(()) => Ok(Validation::Accepted(request)),
            Err(code) => Ok(Validation::Rejected(opcode_byte, code)),
        }
    }

    /// Run the application handler and arm the bulk channel for transfers
    fn execute_oacp(
        &mut self,
        service: ServiceId,
        slot: usize,
        request: &OacpRequest,
    ) -> OacpResponse {
        let (mode, offset, length) = match *request {
            OacpRequest::Read { offset, length } => (TransferMode::Transmit, offset, length),
            OacpRequest::Write { offset, length, .. } => (TransferMode::Receive, offset, length),
            _ => (TransferMode::Inactive, 0, 0),
        };
        let mut parameters = TransferParameters::suggested(length);
        let mut response = OacpResponse::new(request.opcode() as u8, OacpResultCode::Success);

        let session = &mut self.services[service].sessions[slot];
        let connection = session.transfer.connection;
        response.result = self.handler.on_oacp_request(
            service,
            connection,
            &mut session.selection,
            request,
            &mut parameters,
            &mut response.data,
        );
        let parameters = parameters.clamped();

        if response.result == OacpResultCode::Success {
            match request {
                OacpRequest::Read { .. } | OacpRequest::Write { .. } => {
                    session.transfer.arm(mode, offset, length, parameters);
                    info!(
                        "Arming {} on connection {}: {:?} offset {} length {} sdu {} pdu {}",
                        session.transfer.id,
                        connection,
                        mode,
                        offset,
                        length,
                        parameters.max_sdu,
                        parameters.max_pdu
                    );
                    if let Err(err) = self.bulk.start_transfer(&session.transfer, false) {
                        warn!("Transfer start failed on connection {}: {}", connection, err);
                        session.transfer.reset();
                        response.result = OacpResultCode::ChannelUnavailable;
                    }
                }
                OacpRequest::Abort => {
                    if self.bulk.is_in_progress(&session.transfer) {
                        if let Err(err) = self.bulk.abort_transfer(&session.transfer) {
                            warn!("Abort failed on connection {}: {}", connection, err);
                        }
                    }
                }
                _ => {}
            }
        }

        match request {
            OacpRequest::Execute { .. } | OacpRequest::CalculateChecksum { .. } => {}
            _ => response.data.clear(),
        }
        response
    }

    pub(super) fn handle_oacp_write(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        value: &[u8],
    ) -> Result<()> {
        let connection = self.services[service].sessions[slot].transfer.connection;
        let mut changed = None;
        let mut armed = false;
        let response = match self.validate_oacp(service, slot, value) {
            Err(err) => {
                debug!("OACP write from connection {} rejected: {}", connection, err);
                return self
                    .transport
                    .send_write_response(connection, characteristic, Err(err));
            }
            Ok(Validation::Rejected(opcode, result)) => {
                debug!("OACP opcode 0x{:02x} refused: {:?}", opcode, result);
                OacpResponse::new(opcode, result)
            }
            Ok(Validation::Accepted(request)) => {
                debug!("OACP {:?} from connection {}", request, connection);
                let previous = self.services[service].sessions[slot].selection.object;
                let response = self.execute_oacp(service, slot, &request);
                if response.result == OacpResultCode::Success {
                    armed = matches!(
                        request,
                        OacpRequest::Read { .. } | OacpRequest::Write { .. }
                    );
                    let current = self.services[service].sessions[slot].selection.object;
                    changed = match request {
                        OacpRequest::Create { .. } => Some((current, ObjectChangedFlags::CREATION)),
                        OacpRequest::Delete => Some((previous, ObjectChangedFlags::DELETION)),
                        _ => None,
                    };
                }
                response
            }
        };
        let sent = self.respond_oacp(service, slot, characteristic, &response);
        if armed && sent.is_err() {
            // The peer never learns the transfer was accepted
            self.cancel_transfer(service, slot);
        }

        if let Some((object, change)) = changed {
            if self.services[service].config.capabilities.object_changed {
                let flags = ObjectChangedFlags::SOURCE | change;
                if let Err(err) = self.send_object_changed(service, &object, flags, Some(connection))
                {
                    debug!("Object changed not sent: {}", err);
                }
            }
        }
        sent
    }

    /// Tear down a transfer armed for the session
    fn cancel_transfer(&mut self, service: ServiceId, slot: usize) {
        let session = &mut self.services[service].sessions[slot];
        warn!(
            "Cancelling {} on connection {}: response not delivered",
            session.transfer.id, session.transfer.connection
        );
        if self.bulk.is_in_progress(&session.transfer) {
            if let Err(err) = self.bulk.abort_transfer(&session.transfer) {
                warn!("Abort of {} failed: {}", session.transfer.id, err);
            }
        }
        session.transfer.reset();
    }

    /// Acknowledge the write and indicate the response frame
    fn respond_oacp(
        &mut self,
        service: ServiceId,
        slot: usize,
        characteristic: AttributeHandle,
        response: &OacpResponse,
    ) -> Result<()> {
        let connection = self.services[service].sessions[slot].transfer.connection;
        self.transport
            .send_write_response(connection, characteristic, Ok(()))?;
        let frame = response.encode();
        debug!(
            "OACP response to connection {}: {}",
            connection,
            hex::encode(&frame)
        );
        self.send_indication(service, slot, characteristic, frame)
    }
}
