//! WebSocket transport for the presence engine.

pub mod core;
pub mod handlers;

pub use core::PartyServer;
