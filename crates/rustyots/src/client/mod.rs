//! OTS client
//!
//! The client discovers an OTS instance on a peer, subscribes to its
//! control points and then offers the full request set: metadata reads and
//! writes, the Object List Filter, OLCP navigation and OACP actions with
//! their bulk transfers. Requests complete asynchronously through the
//! [`ClientHandler`].

pub mod config;
pub mod handler;
mod request;
pub mod session;
pub mod state;
#[cfg(test)]
mod tests;

pub use self::config::OtsClientConfig;
pub use self::handler::{ClientHandler, ClientId};
pub use self::session::OtsClient;
pub use self::state::ClientStatus;
