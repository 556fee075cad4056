//! Connection management
//!
//! Owns the single socket connection, its failover and rotation.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState};
pub use manager::{handshake_url, ConnectionManager, SocketStream};
