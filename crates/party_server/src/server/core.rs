//! Core party server implementation.
//!
//! This module contains the `PartyServer` struct, which owns the presence
//! coordinator and runs the TCP accept loop that feeds WebSocket connections
//! into it.

use crate::{
    auth::IdentityResolver, config::ServerConfig, error::ServerError,
    lifecycle::PresenceCoordinator, server::handlers::handle_connection,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Listen backlog for the bound socket.
const LISTEN_BACKLOG: i32 = 1024;

/// The watch-party presence server.
///
/// `PartyServer` accepts WebSocket connections, authenticates them through
/// the configured [`IdentityResolver`] and forwards their party requests to
/// a shared [`PresenceCoordinator`].
pub struct PartyServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Presence engine shared by every connection handler
    coordinator: Arc<PresenceCoordinator>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,

    /// Number of sockets currently being served
    active_connections: Arc<AtomicUsize>,
}

impl PartyServer {
    /// Creates a new server that authenticates connections with `resolver`.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    /// * `resolver` - Identity resolver used during the handshake
    pub fn new(config: ServerConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self::with_coordinator(config, Arc::new(PresenceCoordinator::new(resolver)))
    }

    /// Creates a server around an existing coordinator.
    pub fn with_coordinator(config: ServerConfig, coordinator: Arc<PresenceCoordinator>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config,
            coordinator,
            shutdown_sender,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Binds the configured address and serves connections until shutdown.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the server stopped cleanly, or a `ServerError` if the
    /// listener could not be created.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting party server on {}", self.config.bind_address);
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates a non-blocking listener with `SO_REUSEADDR` set.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;

        if let Err(e) = socket.set_reuse_address(true) {
            warn!("Failed to set SO_REUSEADDR: {}", e);
        }

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;

        info!("✅ Listener bound on {}", address);
        Ok(listener)
    }

    /// Runs the accept loop on `listener` until [`shutdown`](Self::shutdown)
    /// is called.
    ///
    /// Sockets accepted while `max_connections` are already being served are
    /// dropped immediately.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Failed to read local address: {e}")))?;
        info!("🎧 Accepting connections on {}", local_addr);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.dispatch(stream, addr),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    fn dispatch(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let active = self.active_connections.fetch_add(1, Ordering::AcqRel);
        if active >= self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            warn!(
                "🚫 Rejecting connection from {}: limit of {} reached",
                addr, self.config.max_connections
            );
            return;
        }

        let coordinator = self.coordinator.clone();
        let active_connections = self.active_connections.clone();
        let queue_capacity = self.config.outbound_queue_capacity;
        let idle_timeout = self.config.connection_timeout;

        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(stream, addr, coordinator, queue_capacity, idle_timeout).await
            {
                error!("Connection error from {}: {}", addr, e);
            }
            let remaining = active_connections.fetch_sub(1, Ordering::AcqRel) - 1;
            debug!("Connection slot from {} released ({} active)", addr, remaining);
        });
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop. Connections that are already established keep
    /// running until their sockets close.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// The presence coordinator shared by all connections.
    pub fn coordinator(&self) -> Arc<PresenceCoordinator> {
        self.coordinator.clone()
    }

    /// The configuration the server was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of sockets currently being served.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }
}
