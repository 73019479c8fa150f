//! OTS server
//!
//! The server owns one session table per service instance. Inbound GATT
//! events are dispatched to the OACP, OLCP and metadata engines, which
//! validate the request, consult the [`ServerHandler`] and answer through
//! the [`GattServerTransport`](crate::gatt::GattServerTransport). Object
//! contents move over the [`BulkChannel`](crate::l2cap::BulkChannel).

pub mod config;
pub mod handler;
mod metadata;
mod oacp;
mod olcp;
pub mod session;

pub use self::config::{OtsServerConfig, OtsServiceConfig, ServerCapabilities};
pub use self::handler::{Selection, ServerHandler, ServiceId};
pub use self::session::OtsServer;
