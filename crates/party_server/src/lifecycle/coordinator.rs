//! The lifecycle coordinator.
//!
//! Connection state machine:
//!
//! ```text
//! Connecting ──authenticate──▶ Authenticated ──join/leave──▶ … ──▶ Disconnected
//! ```
//!
//! The registry and the party table live together in one [`PresenceState`]
//! behind a single async mutex. Each lifecycle operation applies its
//! mutation and queues its notifications inside one critical section, which
//! gives three properties:
//!
//! * mutations of a room are applied one at a time;
//! * a disconnect and a join for the same identity cannot interleave, and a
//!   join arriving from a connection that is no longer registered is dropped,
//!   so a stale join never re-creates a room;
//! * notifications for a room are queued in the order the mutations were
//!   applied.
//!
//! Fan-out inside the critical section never waits: frames go into bounded
//! per-connection queues with `try_send`.

use crate::auth::{AuthError, Credentials, IdentityResolver};
use crate::connection::{ClientConnection, ConnectionId, ConnectionRegistry, Transport};
use crate::party::PartyTable;
use crate::presence::{BroadcastStats, PresenceBroadcaster};
use party_events::{ClientEvent, Identity, PartyId, ServerEvent, UserId};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Registry and membership table, guarded together.
#[derive(Debug, Default)]
struct PresenceState {
    registry: ConnectionRegistry,
    parties: PartyTable,
}

/// Point-in-time view of the engine for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PresenceStats {
    /// Registered identities
    pub connections: usize,
    /// Live party rooms
    pub parties: usize,
    /// Room memberships summed over all parties
    pub memberships: usize,
    /// Frame delivery counters
    pub broadcast: BroadcastStats,
}

/// Orchestrates connect, disconnect, join and leave.
pub struct PresenceCoordinator {
    resolver: Arc<dyn IdentityResolver>,
    state: Mutex<PresenceState>,
    broadcaster: PresenceBroadcaster,
    next_id: AtomicUsize,
}

impl PresenceCoordinator {
    /// Creates a coordinator that authenticates through `resolver`.
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            resolver,
            state: Mutex::new(PresenceState::default()),
            broadcaster: PresenceBroadcaster::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Authenticates and registers a new connection.
    ///
    /// On failure nothing is registered and the error is returned so the
    /// transport can close the socket. On success the identity replaces any
    /// earlier registration, whose transport is asked to close, and every
    /// other connection receives `user:connected`.
    pub async fn on_connect(
        &self,
        credentials: &Credentials,
        transport: Transport,
    ) -> Result<ClientConnection, AuthError> {
        let identity = self.resolver.authenticate(credentials).await?;
        let connection_id: ConnectionId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = ClientConnection::new(connection_id, identity, transport);

        let mut state = self.state.lock().await;
        if let Some(previous) = state.registry.register(connection.clone()) {
            warn!(
                user_id = %connection.identity.id,
                superseded = previous.id,
                connection_id,
                "Identity reconnected; closing previous connection"
            );
            previous.request_close();
        }

        let event = ServerEvent::UserConnected(connection.identity.clone());
        self.broadcaster
            .to_all_except(&state.registry, connection_id, &event);

        info!(
            "👋 {} connected as connection {}",
            connection.identity, connection_id
        );
        Ok(connection)
    }

    /// Tears down a connection.
    ///
    /// Returns `false` without touching any state when the connection is not
    /// the one registered for its identity. Otherwise the identity leaves
    /// every party (each room left non-empty gets one `user:leaveParty`),
    /// and everyone still connected receives `user:disconnected`.
    pub async fn on_disconnect(&self, connection: &ClientConnection) -> bool {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        if state
            .registry
            .unregister(connection.user_id(), connection.id)
            .is_none()
        {
            debug!(
                connection_id = connection.id,
                user_id = %connection.identity.id,
                "Disconnect of unregistered or superseded connection ignored"
            );
            return false;
        }

        for departure in state.parties.leave_all(connection.user_id()) {
            if departure.room_remains {
                let event = ServerEvent::member_left(&departure.party_id, &departure.member);
                self.broadcaster.to_room_except(
                    &state.parties,
                    &state.registry,
                    &departure.party_id,
                    None,
                    &event,
                );
            } else {
                debug!(party_id = %departure.party_id, "Party closed after last member disconnected");
            }
        }

        let event = ServerEvent::UserDisconnected(connection.identity.clone());
        self.broadcaster.to_all(&state.registry, &event);

        info!(
            "👋 {} disconnected (connection {})",
            connection.identity, connection.id
        );
        true
    }

    /// Adds the connection's identity to a party.
    ///
    /// Dropped silently when `party_id` is missing or empty, or when the
    /// connection is not the registered one for its identity. Joining a party
    /// the identity is already in changes nothing and sends nothing. Returns
    /// whether the membership changed.
    pub async fn on_join_party(
        &self,
        connection: &ClientConnection,
        party_id: Option<&PartyId>,
    ) -> bool {
        let Some(party_id) = party_id.filter(|id| !id.is_empty()) else {
            debug!(connection_id = connection.id, "join:party without partyId dropped");
            return false;
        };

        let mut state = self.state.lock().await;
        let state = &mut *state;

        if !state.registry.is_current(connection) {
            debug!(
                connection_id = connection.id,
                party_id = %party_id,
                "join:party from unregistered connection dropped"
            );
            return false;
        }

        if !state.parties.join(party_id, &connection.identity) {
            return false;
        }

        let members = ServerEvent::PartyMembers(state.parties.members(party_id));
        self.broadcaster.to_one(connection, &members);

        let joined = ServerEvent::member_joined(party_id, &connection.identity);
        self.broadcaster.to_room_except(
            &state.parties,
            &state.registry,
            party_id,
            Some(connection.id),
            &joined,
        );

        info!("🎬 {} joined party {}", connection.identity, party_id);
        true
    }

    /// Removes the connection's identity from a party.
    ///
    /// Same preconditions as [`on_join_party`](Self::on_join_party). Leaving
    /// a party the identity is not in is a no-op. When the last member leaves
    /// the room is deleted; otherwise the remaining members receive
    /// `user:leaveParty`.
    pub async fn on_leave_party(
        &self,
        connection: &ClientConnection,
        party_id: Option<&PartyId>,
    ) -> bool {
        let Some(party_id) = party_id.filter(|id| !id.is_empty()) else {
            debug!(connection_id = connection.id, "leave:party without partyId dropped");
            return false;
        };

        let mut state = self.state.lock().await;
        let state = &mut *state;

        if !state.registry.is_current(connection) {
            debug!(
                connection_id = connection.id,
                party_id = %party_id,
                "leave:party from unregistered connection dropped"
            );
            return false;
        }

        if !state.parties.leave(party_id, connection.user_id()) {
            return false;
        }

        if state.parties.is_empty(party_id) {
            debug!(party_id = %party_id, "Party closed after last member left");
        } else {
            let event = ServerEvent::member_left(party_id, &connection.identity);
            self.broadcaster.to_room_except(
                &state.parties,
                &state.registry,
                party_id,
                Some(connection.id),
                &event,
            );
        }

        info!("🚪 {} left party {}", connection.identity, party_id);
        true
    }

    /// Dispatches a decoded client event.
    pub async fn handle_client_event(&self, connection: &ClientConnection, event: ClientEvent) -> bool {
        match event {
            ClientEvent::JoinParty(request) => self.on_join_party(connection, request.party_id()).await,
            ClientEvent::LeaveParty(request) => {
                self.on_leave_party(connection, request.party_id()).await
            }
        }
    }

    /// Snapshot of a party's members in join order.
    pub async fn members(&self, party_id: &PartyId) -> Vec<Identity> {
        self.state.lock().await.parties.members(party_id)
    }

    /// Whether a room currently exists for `party_id`.
    pub async fn party_exists(&self, party_id: &PartyId) -> bool {
        self.state.lock().await.parties.contains(party_id)
    }

    /// Parties an identity currently belongs to.
    pub async fn parties_of(&self, user_id: &UserId) -> Vec<PartyId> {
        self.state.lock().await.parties.parties_of(user_id)
    }

    /// Whether an identity has a registered connection.
    pub async fn is_connected(&self, user_id: &UserId) -> bool {
        self.state.lock().await.registry.lookup(user_id).is_some()
    }

    /// Current engine statistics.
    pub async fn stats(&self) -> PresenceStats {
        let state = self.state.lock().await;
        PresenceStats {
            connections: state.registry.len(),
            parties: state.parties.party_count(),
            memberships: state.parties.membership_count(),
            broadcast: self.broadcaster.stats(),
        }
    }
}
