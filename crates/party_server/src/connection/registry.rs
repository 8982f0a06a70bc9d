//! Identity to connection registry.
//!
//! Holds exactly one connection per identity. Registering a second connection
//! for the same identity replaces the first (last writer wins); the replaced
//! handle is returned so the caller can close it.

use super::{ClientConnection, ConnectionId};
use party_events::UserId;
use std::collections::HashMap;
use tracing::debug;

/// Maps each connected identity to its current connection.
///
/// The registry is plain owned state. It is mutated only by the lifecycle
/// coordinator, which serializes access behind its own lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<UserId, ClientConnection>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for its identity, returning the connection it
    /// superseded, if any.
    pub fn register(&mut self, connection: ClientConnection) -> Option<ClientConnection> {
        let user_id = connection.user_id().clone();
        let previous = self.connections.insert(user_id, connection);
        if let Some(previous) = &previous {
            debug!(
                user_id = %previous.identity.id,
                superseded = previous.id,
                "Connection superseded by a newer one"
            );
        }
        previous
    }

    /// Removes the identity's entry, but only if it still points at
    /// `connection_id`. A superseded connection cannot evict its successor.
    pub fn unregister(
        &mut self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Option<ClientConnection> {
        match self.connections.get(user_id) {
            Some(current) if current.id == connection_id => self.connections.remove(user_id),
            _ => None,
        }
    }

    /// Looks up the current connection of an identity.
    pub fn lookup(&self, user_id: &UserId) -> Option<&ClientConnection> {
        self.connections.get(user_id)
    }

    /// Whether `connection` is the one currently registered for its identity.
    pub fn is_current(&self, connection: &ClientConnection) -> bool {
        self.connections
            .get(connection.user_id())
            .is_some_and(|current| current.id == connection.id)
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no identity is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Iterates over all registered connections.
    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.connections.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Transport;
    use party_events::Identity;

    fn connection(id: ConnectionId, user: &str) -> ClientConnection {
        let (transport, _receiver) = Transport::channel(4, None);
        ClientConnection::new(id, Identity::new(user, user), transport)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.register(connection(1, "alice")).is_none());

        let found = registry.lookup(&UserId::from("alice")).unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&UserId::from("bob")).is_none());
    }

    #[test]
    fn newer_connection_overwrites_entry() {
        let mut registry = ConnectionRegistry::new();
        let first = connection(1, "alice");
        let second = connection(2, "alice");

        registry.register(first.clone());
        let superseded = registry.register(second.clone()).unwrap();

        assert_eq!(superseded.id, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_current(&second));
        assert!(!registry.is_current(&first));
    }

    #[test]
    fn superseded_connection_cannot_unregister_successor() {
        let mut registry = ConnectionRegistry::new();
        registry.register(connection(1, "alice"));
        registry.register(connection(2, "alice"));

        assert!(registry.unregister(&UserId::from("alice"), 1).is_none());
        assert_eq!(registry.len(), 1);

        let removed = registry.unregister(&UserId::from("alice"), 2).unwrap();
        assert_eq!(removed.id, 2);
        assert!(registry.is_empty());
    }
}
