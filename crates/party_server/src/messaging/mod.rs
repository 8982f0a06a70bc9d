//! Inbound message handling.
//!
//! Decodes text frames received on a connection and hands the resulting
//! requests to the lifecycle coordinator.

pub mod router;

pub use router::route_client_message;
