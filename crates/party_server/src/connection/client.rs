//! Client connection representation.
//!
//! A [`ClientConnection`] is the handle the engine keeps for one live
//! transport session: who it belongs to and how to queue frames for it.

use super::ConnectionId;
use party_events::{Identity, UserId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, watch};

/// A serialized text frame queued for delivery.
///
/// Broadcasts serialize an event once and share the buffer between all
/// recipients.
pub type OutboundFrame = Arc<str>;

/// Reasons a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection's outbound queue is at capacity
    #[error("outbound queue full")]
    QueueFull,
    /// The connection's writer has gone away
    #[error("connection closed")]
    Closed,
}

/// The outbound half of a transport session, as handed to the engine on
/// connect.
#[derive(Debug)]
pub struct Transport {
    /// Sender feeding the connection's writer task
    pub sender: mpsc::Sender<OutboundFrame>,
    /// Remote address of the peer, when known
    pub remote_addr: Option<SocketAddr>,
}

impl Transport {
    /// Creates a transport backed by a bounded queue and returns the receiving
    /// end for the writer task.
    pub fn channel(
        capacity: usize,
        remote_addr: Option<SocketAddr>,
    ) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                remote_addr,
            },
            receiver,
        )
    }
}

/// Represents an individual authenticated client connection.
///
/// # Fields
///
/// * `id` - Process-unique connection id
/// * `identity` - The identity resolved when the connection was accepted
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was registered
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// Unique id assigned on connect
    pub id: ConnectionId,

    /// The authenticated identity owning this connection
    pub identity: Identity,

    /// The remote network address of the client
    pub remote_addr: Option<SocketAddr>,

    /// When this connection was established
    pub connected_at: SystemTime,

    sender: mpsc::Sender<OutboundFrame>,

    /// Set once the engine wants the socket closed
    close: Arc<watch::Sender<bool>>,
}

impl ClientConnection {
    /// Creates a connection handle for an already resolved identity.
    pub fn new(id: ConnectionId, identity: Identity, transport: Transport) -> Self {
        Self {
            id,
            identity,
            remote_addr: transport.remote_addr,
            connected_at: SystemTime::now(),
            sender: transport.sender,
            close: Arc::new(watch::channel(false).0),
        }
    }

    /// The id of the identity owning this connection.
    pub fn user_id(&self) -> &UserId {
        &self.identity.id
    }

    /// Queues a frame without waiting.
    ///
    /// Never blocks: a full queue or a closed writer is reported back and the
    /// frame is discarded.
    pub fn try_deliver(&self, frame: OutboundFrame) -> Result<(), DeliveryError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Whether the writer side of this connection has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Asks the transport serving this connection to close its socket.
    pub fn request_close(&self) {
        self.close.send_replace(true);
    }

    /// Whether [`request_close`](Self::request_close) has been called on
    /// this connection or any clone of it.
    pub fn is_close_requested(&self) -> bool {
        *self.close.borrow()
    }

    /// Resolves once a close has been requested.
    pub async fn close_requested(&self) {
        let mut receiver = self.close.subscribe();
        let _ = receiver.wait_for(|requested| *requested).await;
    }

    /// A receiver for close requests that does not keep the connection
    /// alive. Its `changed`/`wait_for` fail once every handle is dropped.
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.close.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_until_the_queue_is_full() {
        let (transport, mut receiver) = Transport::channel(1, None);
        let connection = ClientConnection::new(1, Identity::new("u1", "alice"), transport);

        assert_eq!(connection.try_deliver(Arc::from("first")), Ok(()));
        assert_eq!(
            connection.try_deliver(Arc::from("second")),
            Err(DeliveryError::QueueFull)
        );
        assert_eq!(receiver.recv().await.as_deref(), Some("first"));
    }

    #[test]
    fn closed_receiver_reports_closed() {
        let (transport, receiver) = Transport::channel(4, None);
        let connection = ClientConnection::new(7, Identity::new("u1", "alice"), transport);
        drop(receiver);

        assert!(connection.is_closed());
        assert_eq!(
            connection.try_deliver(Arc::from("lost")),
            Err(DeliveryError::Closed)
        );
    }

    #[tokio::test]
    async fn close_request_reaches_every_clone() {
        let (transport, _receiver) = Transport::channel(4, None);
        let connection = ClientConnection::new(3, Identity::new("u1", "alice"), transport);
        let handle = connection.clone();
        assert!(!handle.is_close_requested());

        let waiter = tokio::spawn(async move { handle.close_requested().await });
        connection.request_close();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("close request was not observed")
            .unwrap();
        assert!(connection.is_close_requested());
    }
}
