//! Transfer binding and bulk channel trait

use super::constants::*;
use crate::error::{Error, Result};
use crate::gatt::ConnectionHandle;
use std::fmt;

/// Identifies one transfer binding across all sessions of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(pub u32);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer#{}", self.0)
    }
}

/// Direction of a transfer, seen from the local side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Inactive,
    /// Local side sends object contents
    Transmit,
    /// Local side receives object contents
    Receive,
}

/// Segmentation parameters of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferParameters {
    /// Maximum SDU size
    pub max_sdu: u16,
    /// Maximum PDU size
    pub max_pdu: u16,
}

impl TransferParameters {
    /// Parameters suggested for a transfer of `length` bytes
    pub fn suggested(length: u32) -> Self {
        let max_pdu = length.min(L2CAP_TRANSFER_MAX_PDU as u32) as u16;
        let max_sdu = length.min(L2CAP_TRANSFER_MAX_SDU as u32) as u16;
        Self { max_sdu, max_pdu }.with_sdu_overhead()
    }

    /// Force the parameters into the range the bulk channel supports
    ///
    /// A zero or oversized PDU becomes the maximum PDU, likewise for the SDU,
    /// and the SDU always leaves room for the SDU length header.
    pub fn clamped(self) -> Self {
        let mut params = self;
        if params.max_pdu == 0 || params.max_pdu > L2CAP_TRANSFER_MAX_PDU {
            params.max_pdu = L2CAP_TRANSFER_MAX_PDU;
        }
        if params.max_sdu == 0 || params.max_sdu > L2CAP_TRANSFER_MAX_SDU {
            params.max_sdu = L2CAP_TRANSFER_MAX_SDU;
        }
        params.with_sdu_overhead()
    }

    /// Check the bounds a client enforces before requesting a transfer
    pub fn validate_request(&self) -> Result<()> {
        if !(L2CAP_LE_MIN_MTU..=L2CAP_LE_MAX_MTU).contains(&self.max_sdu) {
            return Err(Error::InvalidParameter("max_sdu out of range"));
        }
        if !(L2CAP_LE_MIN_MTU..=L2CAP_LE_MAX_MPS).contains(&self.max_pdu) {
            return Err(Error::InvalidParameter("max_pdu out of range"));
        }
        Ok(())
    }

    fn with_sdu_overhead(mut self) -> Self {
        let min_sdu = self.max_pdu.saturating_add(L2CAP_SDU_PDU_DIFF);
        if self.max_sdu < min_sdu {
            self.max_sdu = min_sdu;
        }
        self
    }
}

/// State of the bulk channel binding owned by one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBinding {
    pub id: TransferId,
    pub connection: ConnectionHandle,
    pub mode: TransferMode,
    /// Number of object bytes to move
    pub data_length: u32,
    /// Object offset of the first byte
    pub data_offset: u32,
    pub max_pdu: u16,
    pub max_sdu: u16,
    pub credit: u16,
    /// SPSM to connect to; zero when the peer initiates
    pub spsm: u16,
}

impl TransferBinding {
    /// Create an inactive binding for a connection
    pub fn new(id: TransferId, connection: ConnectionHandle) -> Self {
        Self {
            id,
            connection,
            mode: TransferMode::Inactive,
            data_length: 0,
            data_offset: 0,
            max_pdu: 0,
            max_sdu: 0,
            credit: 0,
            spsm: 0,
        }
    }

    /// Load the binding for a transfer about to start
    pub fn arm(&mut self, mode: TransferMode, offset: u32, length: u32, params: TransferParameters) {
        self.mode = mode;
        self.data_offset = offset;
        self.data_length = length;
        self.max_pdu = params.max_pdu;
        self.max_sdu = params.max_sdu;
        self.credit = L2CAP_TRANSFER_INITIAL_CREDIT;
    }

    /// Return the binding to the inactive state, keeping its identity
    pub fn reset(&mut self) {
        *self = Self {
            spsm: self.spsm,
            ..Self::new(self.id, self.connection)
        };
    }

    pub fn is_armed(&self) -> bool {
        self.mode != TransferMode::Inactive
    }

    /// Add credits, saturating at the maximum credit count
    pub fn add_credit(&mut self, credit: u16) {
        self.credit = self.credit.saturating_add(credit);
    }
}

/// Operations on the L2CAP channel that carries object contents
///
/// Data movement itself is driven by the channel implementation, which
/// reports back to the owning engine through its `on_transfer_*` methods
/// using the binding's [`TransferId`].
pub trait BulkChannel {
    /// Start a transfer described by the binding. `initiator` is true when
    /// the local side opens the channel.
    fn start_transfer(&mut self, binding: &TransferBinding, initiator: bool) -> Result<()>;

    /// Abort the transfer running on the binding
    fn abort_transfer(&mut self, binding: &TransferBinding) -> Result<()>;

    /// Whether a transfer is currently running on the binding
    fn is_in_progress(&self, binding: &TransferBinding) -> bool;

    /// Grant the peer additional credits
    fn increase_credit(&mut self, binding: &TransferBinding, credit: u16) -> Result<()>;
}
