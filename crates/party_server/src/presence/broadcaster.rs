//! Best-effort presence broadcaster.
//!
//! Each event is serialized once and queued for every recipient with a
//! non-blocking send. A recipient whose queue is full or closed loses that
//! frame; the loss is counted and logged and never affects the remaining
//! recipients or the lifecycle operation that triggered the broadcast.

use crate::connection::{ClientConnection, ConnectionId, ConnectionRegistry, DeliveryError, OutboundFrame};
use crate::party::PartyTable;
use party_events::{PartyId, ServerEvent};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace, warn};

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    /// Frames queued successfully
    pub delivered: u64,
    /// Frames dropped because a queue was full or closed
    pub dropped: u64,
}

/// Emits presence events to connections.
///
/// The broadcaster holds no membership state of its own; audiences are
/// resolved from the table and registry passed in by the coordinator, which
/// calls it while holding its state lock. That keeps the order of frames
/// within a room identical to the order of the mutations that caused them.
#[derive(Debug, Default)]
pub struct PresenceBroadcaster {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl PresenceBroadcaster {
    /// Creates a broadcaster with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `event` to a single connection.
    ///
    /// Returns the number of connections the frame was queued for (0 or 1).
    pub fn to_one(&self, connection: &ClientConnection, event: &ServerEvent) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };
        usize::from(self.deliver(connection, &frame, event))
    }

    /// Sends `event` to the current connections of every member of
    /// `party_id`, skipping `exclude`.
    pub fn to_room_except(
        &self,
        table: &PartyTable,
        registry: &ConnectionRegistry,
        party_id: &PartyId,
        exclude: Option<ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let Some(room) = table.room(party_id) else {
            return 0;
        };
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut queued = 0;
        for member in room.members() {
            let Some(connection) = registry.lookup(&member.id) else {
                trace!(party_id = %party_id, user_id = %member.id, "Member has no live connection");
                continue;
            };
            if Some(connection.id) == exclude {
                continue;
            }
            if self.deliver(connection, &frame, event) {
                queued += 1;
            }
        }

        debug!(
            party_id = %party_id,
            event = event.name(),
            recipients = queued,
            "📡 Room broadcast"
        );
        queued
    }

    /// Sends `event` to every registered connection.
    pub fn to_all(&self, registry: &ConnectionRegistry, event: &ServerEvent) -> usize {
        self.fan_out(registry, None, event)
    }

    /// Sends `event` to every registered connection except `exclude`.
    pub fn to_all_except(
        &self,
        registry: &ConnectionRegistry,
        exclude: ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        self.fan_out(registry, Some(exclude), event)
    }

    /// Current delivery counters.
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn fan_out(
        &self,
        registry: &ConnectionRegistry,
        exclude: Option<ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let queued = registry
            .iter()
            .filter(|connection| Some(connection.id) != exclude)
            .filter(|connection| self.deliver(connection, &frame, event))
            .count();

        debug!(event = event.name(), recipients = queued, "📡 Global broadcast");
        queued
    }

    fn deliver(&self, connection: &ClientConnection, frame: &OutboundFrame, event: &ServerEvent) -> bool {
        match connection.try_deliver(frame.clone()) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(DeliveryError::QueueFull) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    connection_id = connection.id,
                    user_id = %connection.identity.id,
                    event = event.name(),
                    "Outbound queue full, dropping frame"
                );
                false
            }
            Err(DeliveryError::Closed) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    connection_id = connection.id,
                    user_id = %connection.identity.id,
                    event = event.name(),
                    "Connection closed, dropping frame"
                );
                false
            }
        }
    }
}

fn encode(event: &ServerEvent) -> Option<OutboundFrame> {
    match event.to_json() {
        Ok(text) => Some(OutboundFrame::from(text)),
        Err(e) => {
            error!(event = event.name(), "Failed to encode presence event: {}", e);
            None
        }
    }
}
