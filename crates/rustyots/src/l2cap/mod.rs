//! L2CAP bulk channel boundary
//!
//! Object contents move over an LE credit-based connection-oriented channel
//! owned by the host stack. This module holds the per-session transfer
//! binding, the PDU/SDU negotiation rules and the trait through which the
//! engines arm, abort and query a transfer.

pub mod constants;
pub mod transfer;

pub use self::constants::*;
pub use self::transfer::{BulkChannel, TransferBinding, TransferId, TransferMode, TransferParameters};
