//! # Core Type Definitions
//!
//! Identity and party identifiers shared by the presence engine, the
//! transport server and client-facing payloads.
//!
//! ## Key Types
//!
//! - [`UserId`] - Opaque identifier of an authenticated principal
//! - [`PartyId`] - Opaque identifier of a party room
//! - [`Identity`] - The authenticated principal attached to a connection
//!
//! All types serialize to the JSON shapes used on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an authenticated user.
///
/// A wrapper around the principal's string id so that user ids cannot be
/// confused with party ids or display names in the engine's maps.
///
/// # Examples
///
/// ```rust
/// use party_events::UserId;
///
/// let user_id = UserId::from("64f1c2");
/// assert_eq!(user_id.as_str(), "64f1c2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a user id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a party room.
///
/// Party ids are chosen by clients. The only validity rule the engine
/// applies is that an id must not be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub String);

impl PartyId {
    /// Creates a party id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty id, which never names a room.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PartyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PartyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated principal attached to a connection.
///
/// Identities are produced by an identity resolver when a connection is
/// accepted and never change for the lifetime of that connection. They are
/// also the member records stored in party rooms and the payload of every
/// presence event.
///
/// Serialized as `{"id": .., "displayName": .., "role": ..}` with `role`
/// omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable id of the principal, or its display name when the principal has none
    pub id: UserId,
    /// Human readable name shown to other party members
    pub display_name: String,
    /// Optional role string supplied by the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Identity {
    /// Creates an identity without a role.
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role: None,
        }
    }

    /// Builds an identity from an optional principal id, falling back to the
    /// display name when the principal carries no id.
    pub fn from_principal(
        principal_id: Option<&str>,
        display_name: impl Into<String>,
        role: Option<String>,
    ) -> Self {
        let display_name = display_name.into();
        let id = match principal_id {
            Some(id) if !id.is_empty() => UserId::from(id),
            _ => UserId::new(display_name.clone()),
        };
        Self {
            id,
            display_name,
            role,
        }
    }

    /// Returns the same identity with the given role attached.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_id_takes_precedence() {
        let identity = Identity::from_principal(Some("64f1c2"), "alice", None);
        assert_eq!(identity.id, UserId::from("64f1c2"));
        assert_eq!(identity.display_name, "alice");
    }

    #[test]
    fn missing_principal_falls_back_to_display_name() {
        let identity = Identity::from_principal(None, "bob", Some("guest".into()));
        assert_eq!(identity.id.as_str(), "bob");
        assert_eq!(identity.role.as_deref(), Some("guest"));

        let empty = Identity::from_principal(Some(""), "carol", None);
        assert_eq!(empty.id.as_str(), "carol");
    }

    #[test]
    fn identity_wire_shape() {
        let identity = Identity::new("u1", "alice");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json, serde_json::json!({"id": "u1", "displayName": "alice"}));

        let with_role = identity.with_role("host");
        let json = serde_json::to_value(&with_role).unwrap();
        assert_eq!(json["role"], "host");
    }
}
