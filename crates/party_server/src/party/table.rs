//! The party membership table.
//!
//! Maps party ids to rooms and keeps a reverse index from each identity to
//! the parties it belongs to, so a disconnect can leave every room without
//! scanning the whole table.
//!
//! All mutating operations take `&mut self`; the owner (the lifecycle
//! coordinator) holds the table behind a single lock, so concurrent joins and
//! leaves on the same party are applied one at a time and no caller ever
//! observes a half-applied change.

use super::PartyRoom;
use party_events::{Identity, PartyId, UserId};
use std::collections::{BTreeSet, HashMap};

/// Outcome of removing an identity from one room during a bulk leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyDeparture {
    /// Party the identity was removed from
    pub party_id: PartyId,
    /// The removed member record
    pub member: Identity,
    /// Whether the room still exists (has other members)
    pub room_remains: bool,
}

/// Party id to room mapping with a per-identity reverse index.
#[derive(Debug, Default)]
pub struct PartyTable {
    rooms: HashMap<PartyId, PartyRoom>,
    memberships: HashMap<UserId, BTreeSet<PartyId>>,
}

impl PartyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `identity` to `party_id`, creating the room on first join.
    ///
    /// Returns `true` if the identity was newly added, `false` if it was
    /// already a member or the party id is empty.
    pub fn join(&mut self, party_id: &PartyId, identity: &Identity) -> bool {
        if party_id.is_empty() {
            return false;
        }

        let room = self
            .rooms
            .entry(party_id.clone())
            .or_insert_with(|| PartyRoom::new(party_id.clone()));
        if !room.add_member(identity) {
            return false;
        }

        self.memberships
            .entry(identity.id.clone())
            .or_default()
            .insert(party_id.clone());
        true
    }

    /// Removes `user_id` from `party_id`, deleting the room if it becomes
    /// empty. Returns `true` if the identity was a member.
    pub fn leave(&mut self, party_id: &PartyId, user_id: &UserId) -> bool {
        let Some(room) = self.rooms.get_mut(party_id) else {
            return false;
        };
        if room.remove_member(user_id).is_none() {
            return false;
        }
        if room.is_empty() {
            self.rooms.remove(party_id);
        }
        self.forget_membership(user_id, party_id);
        true
    }

    /// Removes `user_id` from every room it belongs to.
    ///
    /// Rooms left empty are deleted in the same call. The departures are
    /// returned in party id order.
    pub fn leave_all(&mut self, user_id: &UserId) -> Vec<PartyDeparture> {
        let Some(parties) = self.memberships.remove(user_id) else {
            return Vec::new();
        };

        let mut departures = Vec::with_capacity(parties.len());
        for party_id in parties {
            let Some(room) = self.rooms.get_mut(&party_id) else {
                continue;
            };
            let Some(member) = room.remove_member(user_id) else {
                continue;
            };
            let room_remains = !room.is_empty();
            if !room_remains {
                self.rooms.remove(&party_id);
            }
            departures.push(PartyDeparture {
                party_id,
                member,
                room_remains,
            });
        }
        departures
    }

    /// Snapshot of the members of `party_id` in join order; empty when the
    /// party does not exist.
    pub fn members(&self, party_id: &PartyId) -> Vec<Identity> {
        self.rooms
            .get(party_id)
            .map(|room| room.members().to_vec())
            .unwrap_or_default()
    }

    /// Whether `party_id` has no members. Since empty rooms are never kept,
    /// this is the same as the room not existing.
    pub fn is_empty(&self, party_id: &PartyId) -> bool {
        !self.rooms.contains_key(party_id)
    }

    /// Borrows a room.
    pub fn room(&self, party_id: &PartyId) -> Option<&PartyRoom> {
        self.rooms.get(party_id)
    }

    /// Whether a room exists for `party_id`.
    pub fn contains(&self, party_id: &PartyId) -> bool {
        self.rooms.contains_key(party_id)
    }

    /// Whether `user_id` is a member of `party_id`.
    pub fn is_member(&self, party_id: &PartyId, user_id: &UserId) -> bool {
        self.memberships
            .get(user_id)
            .is_some_and(|parties| parties.contains(party_id))
    }

    /// Parties `user_id` currently belongs to, in party id order.
    pub fn parties_of(&self, user_id: &UserId) -> Vec<PartyId> {
        self.memberships
            .get(user_id)
            .map(|parties| parties.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live rooms.
    pub fn party_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total memberships across all rooms.
    pub fn membership_count(&self) -> usize {
        self.rooms.values().map(PartyRoom::member_count).sum()
    }

    fn forget_membership(&mut self, user_id: &UserId, party_id: &PartyId) {
        if let Some(parties) = self.memberships.get_mut(user_id) {
            parties.remove(party_id);
            if parties.is_empty() {
                self.memberships.remove(user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("u1", "alice")
    }

    fn bob() -> Identity {
        Identity::new("u2", "bob")
    }

    #[test]
    fn first_join_creates_room() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");

        assert!(table.is_empty(&party));
        assert!(table.join(&party, &alice()));
        assert!(!table.is_empty(&party));
        assert_eq!(table.members(&party), vec![alice()]);
        assert_eq!(table.party_count(), 1);
    }

    #[test]
    fn join_is_idempotent() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");

        assert!(table.join(&party, &alice()));
        assert!(!table.join(&party, &alice()));
        assert_eq!(table.members(&party).len(), 1);
        assert_eq!(table.room(&party).unwrap().member_count(), 1);
        assert_eq!(table.membership_count(), 1);
    }

    #[test]
    fn empty_party_id_is_rejected() {
        let mut table = PartyTable::new();
        assert!(!table.join(&PartyId::from(""), &alice()));
        assert_eq!(table.party_count(), 0);
    }

    #[test]
    fn members_keep_join_order() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");
        table.join(&party, &bob());
        table.join(&party, &alice());

        let names: Vec<_> = table
            .members(&party)
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        assert_eq!(names, ["bob", "alice"]);
    }

    #[test]
    fn leaving_unknown_room_is_a_noop() {
        let mut table = PartyTable::new();
        let party = PartyId::from("ghost");

        assert!(!table.leave(&party, &alice().id));
        assert!(!table.contains(&party));
        assert_eq!(table.party_count(), 0);
    }

    #[test]
    fn non_member_leave_is_a_noop() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");
        table.join(&party, &alice());

        assert!(!table.leave(&party, &bob().id));
        assert_eq!(table.members(&party), vec![alice()]);
    }

    #[test]
    fn last_leave_deletes_room() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");
        table.join(&party, &alice());
        table.join(&party, &bob());

        assert!(table.leave(&party, &alice().id));
        assert!(table.contains(&party));
        assert!(table.leave(&party, &bob().id));
        assert!(!table.contains(&party));
        assert!(table.members(&party).is_empty());
        assert!(table.parties_of(&bob().id).is_empty());
    }

    #[test]
    fn leave_all_reports_each_room() {
        let mut table = PartyTable::new();
        let p1 = PartyId::from("p1");
        let p2 = PartyId::from("p2");
        table.join(&p1, &alice());
        table.join(&p1, &bob());
        table.join(&p2, &bob());

        let departures = table.leave_all(&bob().id);
        assert_eq!(
            departures,
            vec![
                PartyDeparture {
                    party_id: p1.clone(),
                    member: bob(),
                    room_remains: true,
                },
                PartyDeparture {
                    party_id: p2.clone(),
                    member: bob(),
                    room_remains: false,
                },
            ]
        );
        assert_eq!(table.members(&p1), vec![alice()]);
        assert!(!table.contains(&p2));
        assert!(table.leave_all(&bob().id).is_empty());
    }

    #[test]
    fn final_members_follow_last_operation() {
        let mut table = PartyTable::new();
        let party = PartyId::from("p1");
        let (a, b, c) = (alice(), bob(), Identity::new("u3", "carol"));

        let ops = [
            (&a, true),
            (&b, true),
            (&a, false),
            (&c, true),
            (&a, true),
            (&b, false),
            (&b, false),
        ];
        for (identity, join) in ops {
            if join {
                table.join(&party, identity);
            } else {
                table.leave(&party, &identity.id);
            }
        }

        let mut ids: Vec<_> = table.members(&party).into_iter().map(|m| m.id).collect();
        ids.sort();
        assert_eq!(ids, vec![a.id.clone(), c.id]);
        assert!(table.is_member(&party, &a.id));
        assert!(!table.is_member(&party, &b.id));
    }
}
