//! Wire protocol for the presence channel.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`. Inbound frames are decoded into
//! [`ClientEvent`], outbound notifications are built as [`ServerEvent`].

use crate::types::{Identity, PartyId};
use serde::{Deserialize, Serialize};

/// Inbound: request to join a party.
pub const JOIN_PARTY: &str = "join:party";
/// Inbound: request to leave a party.
pub const LEAVE_PARTY: &str = "leave:party";
/// Outbound: an identity connected.
pub const USER_CONNECTED: &str = "user:connected";
/// Outbound: an identity disconnected.
pub const USER_DISCONNECTED: &str = "user:disconnected";
/// Outbound: full member list sent to a joining identity.
pub const LIST_JOIN_PARTY: &str = "list:joinParty";
/// Outbound: an identity joined a party.
pub const USER_JOIN_PARTY: &str = "user:joinParty";
/// Outbound: an identity left a party.
pub const USER_LEAVE_PARTY: &str = "user:leaveParty";

/// Errors raised while decoding or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON or did not match a known event
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] serde_json::Error),
}

/// Payload of `join:party` and `leave:party`.
///
/// `partyId` is optional on the wire so that a request without it decodes
/// successfully and can be dropped by the engine instead of failing the
/// frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRequest {
    /// Target party
    #[serde(default)]
    pub party_id: Option<PartyId>,
}

impl PartyRequest {
    /// Creates a request for the given party.
    pub fn new(party_id: impl Into<PartyId>) -> Self {
        Self {
            party_id: Some(party_id.into()),
        }
    }

    /// The requested party, if present and non-empty.
    pub fn party_id(&self) -> Option<&PartyId> {
        self.party_id.as_ref().filter(|id| !id.is_empty())
    }
}

/// A message sent from a client to the server.
///
/// ```json
/// { "event": "join:party", "data": { "partyId": "movie-night" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// `join:party`
    #[serde(rename = "join:party")]
    JoinParty(PartyRequest),
    /// `leave:party`
    #[serde(rename = "leave:party")]
    LeaveParty(PartyRequest),
}

impl ClientEvent {
    /// Decodes a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinParty(_) => JOIN_PARTY,
            ClientEvent::LeaveParty(_) => LEAVE_PARTY,
        }
    }
}

/// Payload of `user:joinParty` and `user:leaveParty`: the member's identity
/// fields plus the party it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyNotice {
    /// Party the membership change happened in
    pub party_id: PartyId,
    /// The member that joined or left
    #[serde(flatten)]
    pub member: Identity,
}

/// A presence notification sent from the server to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// `user:connected`
    #[serde(rename = "user:connected")]
    UserConnected(Identity),
    /// `user:disconnected`
    #[serde(rename = "user:disconnected")]
    UserDisconnected(Identity),
    /// `list:joinParty`, members in join order
    #[serde(rename = "list:joinParty")]
    PartyMembers(Vec<Identity>),
    /// `user:joinParty`
    #[serde(rename = "user:joinParty")]
    MemberJoined(PartyNotice),
    /// `user:leaveParty`
    #[serde(rename = "user:leaveParty")]
    MemberLeft(PartyNotice),
}

impl ServerEvent {
    /// Builds a `user:joinParty` notice.
    pub fn member_joined(party_id: &PartyId, member: &Identity) -> Self {
        ServerEvent::MemberJoined(PartyNotice {
            party_id: party_id.clone(),
            member: member.clone(),
        })
    }

    /// Builds a `user:leaveParty` notice.
    pub fn member_left(party_id: &PartyId, member: &Identity) -> Self {
        ServerEvent::MemberLeft(PartyNotice {
            party_id: party_id.clone(),
            member: member.clone(),
        })
    }

    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::UserConnected(_) => USER_CONNECTED,
            ServerEvent::UserDisconnected(_) => USER_DISCONNECTED,
            ServerEvent::PartyMembers(_) => LIST_JOIN_PARTY,
            ServerEvent::MemberJoined(_) => USER_JOIN_PARTY,
            ServerEvent::MemberLeft(_) => USER_LEAVE_PARTY,
        }
    }

    /// Encodes the event as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a text frame produced by [`ServerEvent::to_json`].
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_join_request() {
        let event = ClientEvent::parse(r#"{"event":"join:party","data":{"partyId":"p1"}}"#)
            .unwrap();
        assert_eq!(event, ClientEvent::JoinParty(PartyRequest::new("p1")));
        assert_eq!(event.name(), JOIN_PARTY);
    }

    #[test]
    fn missing_or_empty_party_id_still_decodes() {
        let event = ClientEvent::parse(r#"{"event":"leave:party","data":{}}"#).unwrap();
        match event {
            ClientEvent::LeaveParty(request) => assert!(request.party_id().is_none()),
            other => panic!("unexpected event {other:?}"),
        }

        let event = ClientEvent::parse(r#"{"event":"join:party","data":{"partyId":""}}"#).unwrap();
        match event {
            ClientEvent::JoinParty(request) => assert!(request.party_id().is_none()),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_rejected() {
        assert!(ClientEvent::parse(r#"{"event":"play:video","data":{}}"#).is_err());
        assert!(ClientEvent::parse("not json").is_err());
    }

    #[test]
    fn member_notice_flattens_identity() {
        let event = ServerEvent::member_joined(
            &PartyId::from("p1"),
            &Identity::new("u2", "bob").with_role("viewer"),
        );
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "user:joinParty",
                "data": {"partyId": "p1", "id": "u2", "displayName": "bob", "role": "viewer"}
            })
        );
    }

    #[test]
    fn member_list_is_a_plain_array() {
        let event = ServerEvent::PartyMembers(vec![
            Identity::new("u1", "alice"),
            Identity::new("u2", "bob"),
        ]);
        let text = event.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], LIST_JOIN_PARTY);
        assert_eq!(value["data"][1]["displayName"], "bob");
        assert_eq!(ServerEvent::parse(&text).unwrap(), event);
    }
}
