//! RustyOTS - Object Transfer Service engine for Bluetooth LE
//!
//! This library implements both roles of the Object Transfer Service (OTS).
//! The server exposes objects to peers through the Object Action and Object
//! List control points and the metadata characteristics. The client
//! discovers a remote OTS instance and drives it. Neither role talks to a
//! radio directly: GATT traffic goes through the transport traits in
//! [`gatt`] and object contents through the [`l2cap::BulkChannel`] trait, so
//! the engines can be bound to any host stack.

pub mod att;
pub mod client;
pub mod error;
pub mod gatt;
pub mod l2cap;
pub mod ots;
pub mod queue;
pub mod server;

// Re-export common types for convenience
pub use att::{AttErrorCode, AttResult};
pub use client::{ClientHandler, ClientId, ClientStatus, OtsClient, OtsClientConfig};
pub use error::{Error, Result};
pub use gatt::{GattClientTransport, GattServerTransport, Uuid};
pub use l2cap::{BulkChannel, TransferBinding, TransferId, TransferParameters};
pub use ots::{ObjectId, OtsFeatures};
pub use queue::BoundedQueue;
pub use server::{OtsServer, OtsServerConfig, OtsServiceConfig, Selection, ServerHandler};
