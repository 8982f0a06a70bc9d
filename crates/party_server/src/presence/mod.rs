//! Presence fan-out.
//!
//! Turns a [`ServerEvent`](party_events::ServerEvent) into frames queued for
//! the right audience: one connection, the members of a room, or every
//! registered connection.

pub mod broadcaster;

pub use broadcaster::{BroadcastStats, PresenceBroadcaster};
