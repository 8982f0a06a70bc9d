//! Connection management for client connections.
//!
//! This module holds the live connection handle handed out to the transport
//! layer and the registry that maps each identity to its current connection.

pub mod client;
pub mod registry;

pub use client::{ClientConnection, DeliveryError, OutboundFrame, Transport};
pub use registry::ConnectionRegistry;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server.
pub type ConnectionId = usize;
