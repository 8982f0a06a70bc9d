//! A single party room and its member list.

use party_events::{Identity, PartyId, UserId};

/// A party room: the identities currently joined to one party id.
///
/// Members are kept in join order so that the list sent to a joining client
/// is stable. Rooms are small, so membership checks scan the list.
#[derive(Debug, Clone)]
pub struct PartyRoom {
    /// Identifier of this party
    pub id: PartyId,
    /// Members in join order
    members: Vec<Identity>,
}

impl PartyRoom {
    /// Creates an empty room. Callers must add a member before exposing it.
    pub(crate) fn new(id: PartyId) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    /// Adds a member, returning `false` if the identity is already present.
    pub fn add_member(&mut self, identity: &Identity) -> bool {
        if self.contains_member(&identity.id) {
            return false;
        }
        self.members.push(identity.clone());
        true
    }

    /// Removes a member, returning the removed identity.
    pub fn remove_member(&mut self, user_id: &UserId) -> Option<Identity> {
        let index = self.members.iter().position(|m| &m.id == user_id)?;
        Some(self.members.remove(index))
    }

    /// Checks if the room contains a member
    pub fn contains_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.id == user_id)
    }

    /// Members in join order.
    pub fn members(&self) -> &[Identity] {
        &self.members
    }

    /// Gets the current member count
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Checks if the room is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
