//! # Party Server
//!
//! Real-time presence for watch parties. Clients hold a WebSocket connection,
//! authenticate once during the handshake, and then join and leave named
//! parties. The server keeps everyone informed about who is online and who
//! is in which party.
//!
//! ## Architecture Overview
//!
//! * **Identity resolution** ([`auth`]) - turns handshake credentials into an
//!   [`Identity`](party_events::Identity) or rejects the connection
//! * **Connection registry** ([`connection`]) - one live connection per
//!   identity; a reconnect replaces the earlier entry
//! * **Party table** ([`party`]) - party id to ordered member list, rooms are
//!   created on first join and removed when the last member leaves
//! * **Presence broadcaster** ([`presence`]) - best-effort, non-blocking
//!   fan-out of presence events
//! * **Lifecycle coordinator** ([`lifecycle`]) - the only component that
//!   mutates the registry and the party table
//! * **Transport** ([`server`]) - TCP accept loop and per-socket WebSocket
//!   handling
//! * **Room store** ([`rooms`]) - persisted room records, separate from live
//!   presence
//!
//! ### Message Flow
//!
//! 1. Client connects with `?token=..` (or `Authorization: Bearer ..`), or
//!    `?name=..` for guest access
//! 2. Every other client receives `user:connected`
//! 3. Client sends `{"event": "join:party", "data": {"partyId": ".."}}`
//! 4. Joiner receives `list:joinParty`, other members receive `user:joinParty`
//! 5. On disconnect, every party the client was in receives `user:leaveParty`
//!    and everyone receives `user:disconnected`
//!
//! ## Error Handling
//!
//! Malformed or unauthorised requests are dropped and logged; they never
//! reach the client as errors. Transport and bootstrap failures are reported
//! as [`ServerError`].

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod messaging;
pub mod party;
pub mod presence;
pub mod rooms;
pub mod server;
pub mod utils;

pub use auth::{AuthError, Credentials, IdentityResolver, StaticTokenResolver, TokenEntry};
pub use config::ServerConfig;
pub use connection::{ClientConnection, ConnectionId, Transport};
pub use error::ServerError;
pub use lifecycle::{PresenceCoordinator, PresenceStats};
pub use rooms::{InMemoryRoomStore, RoomError, RoomStore};
pub use server::PartyServer;
pub use utils::{create_server, create_server_with_config};
