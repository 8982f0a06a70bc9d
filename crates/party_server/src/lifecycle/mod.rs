//! Connection lifecycle coordination.
//!
//! The [`PresenceCoordinator`] is the only component that mutates the
//! connection registry and the party table. Every connect, disconnect, join
//! and leave passes through it.

pub mod coordinator;

pub use coordinator::{PresenceCoordinator, PresenceStats};
