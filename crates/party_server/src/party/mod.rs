//! # Party Membership
//!
//! Party rooms and the table that owns them. A room exists only while it has
//! at least one member: it is created by the first join and removed together
//! with its last member.

pub mod room;
pub mod table;

pub use room::PartyRoom;
pub use table::{PartyDeparture, PartyTable};
