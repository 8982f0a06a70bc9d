//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the party server behavior.

use std::net::{Ipv4Addr, SocketAddr};

/// Configuration structure for the party server.
///
/// Contains the network settings, connection limits and per-connection queue
/// sizing used by the transport layer and the presence broadcaster.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Idle timeout in seconds; a connection that sends nothing for this long
    /// is closed. `0` disables the timeout.
    pub connection_timeout: u64,

    /// Capacity of each connection's outbound frame queue. Frames for a
    /// connection whose queue is full are dropped.
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_connections: 1000,
            connection_timeout: 60,
            outbound_queue_capacity: 256,
        }
    }
}
