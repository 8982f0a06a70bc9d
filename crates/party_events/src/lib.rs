//! # Party Events
//!
//! Shared vocabulary of the watch-party presence service: who a connection
//! belongs to ([`Identity`]), which room a request targets ([`PartyId`]) and
//! the JSON frames exchanged with clients ([`ClientEvent`], [`ServerEvent`]).
//!
//! The presence engine in `party_server` and any Rust client can depend on
//! this crate without pulling in the networking stack.

pub mod protocol;
pub mod types;
pub mod utils;

pub use protocol::{ClientEvent, PartyNotice, PartyRequest, ProtocolError, ServerEvent};
pub use types::{Identity, PartyId, UserId};
pub use utils::current_timestamp;
