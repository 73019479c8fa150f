//! L2CAP constants for object transfers

/// Maximum PDU payload the bulk channel will negotiate
pub const L2CAP_TRANSFER_MAX_PDU: u16 = 250;
/// Maximum SDU the bulk channel will negotiate
pub const L2CAP_TRANSFER_MAX_SDU: u16 = 252;
/// SDU length header carried by the first PDU of every SDU
pub const L2CAP_SDU_PDU_DIFF: u16 = 2;
/// Credits granted when a transfer is armed
pub const L2CAP_TRANSFER_INITIAL_CREDIT: u16 = 1;

/// SPSM used by the client when it opens the object transfer channel
pub const L2CAP_OTS_SPSM: u16 = 0x0081;

/// Bounds on the parameters a client may request
pub const L2CAP_LE_MIN_MTU: u16 = 23;
pub const L2CAP_LE_MAX_MPS: u16 = 252;
pub const L2CAP_LE_MAX_MTU: u16 = 65533;
