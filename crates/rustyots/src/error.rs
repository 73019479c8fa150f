//! Error types shared by the queue, transport and session layers

use crate::att::AttErrorCode;
use thiserror::Error;

/// Errors returned by the OTS engine and its collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Queue not initialized")]
    NotInitialized,

    #[error("Queue would overflow")]
    WouldOverflow,

    #[error("Queue is empty")]
    Empty,

    #[error("Not found")]
    NotFound,

    /// The collaborator is busy; the work was deferred or must be retried
    #[error("Operation in progress")]
    InProgress,

    #[error("Invalid state for operation")]
    InvalidState,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Operation not supported")]
    NotSupported,

    #[error("Operation aborted")]
    Aborted,

    #[error("ATT error: {0}")]
    Att(#[from] AttErrorCode),

    /// Opaque status reported by the underlying stack
    #[error("Transport error: 0x{0:04x}")]
    Transport(u16),
}

/// Result type for OTS operations
pub type Result<T> = std::result::Result<T, Error>;
