//! Room registry
//!
//! Maps room codes to rooms. Rooms are created lazily by the first join and
//! destroyed as soon as their last member leaves.

use std::collections::HashMap;

use crate::error::AppError;
use crate::member::Member;
use crate::role::Role;
use crate::room::Room;
use crate::types::{ClientId, RoomCode};

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// The room did not exist before this join
    pub created: bool,
    pub role: Role,
}

/// What happened to a room when a member left it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The last member left and the room is gone
    RoomClosed,
    /// Members remain; `promoted` is set when ownership passed on
    Left {
        was_owner: bool,
        promoted: Option<ClientId>,
    },
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Whether `id` would be turned away from `code` for lack of space.
    /// Unknown rooms always have space.
    pub fn is_full_for(&self, code: &RoomCode, id: ClientId) -> bool {
        self.rooms.get(code).is_some_and(|room| room.is_full_for(id))
    }

    /// Admit a connection into a room, creating the room if needed.
    ///
    /// The creator of a room becomes its owner, later joiners are members,
    /// and a connection already in the room keeps its role. `privileged`
    /// forces the owner role regardless. `capacity` only applies to a room
    /// created by this call.
    pub fn join(
        &mut self,
        code: RoomCode,
        id: ClientId,
        nickname: String,
        origin: std::net::IpAddr,
        capacity: usize,
        privileged: bool,
    ) -> Result<Admission, AppError> {
        let created = !self.rooms.contains_key(&code);
        if !created && self.is_full_for(&code, id) {
            return Err(AppError::RoomFull);
        }

        let room = self
            .rooms
            .entry(code)
            .or_insert_with(|| Room::new(capacity));

        let role = if privileged || created {
            Role::Owner
        } else {
            room.member(id).map_or(Role::Member, |m| m.role)
        };

        room.upsert_member(Member::new(id, nickname, role, origin));
        Ok(Admission { created, role })
    }

    /// Remove a connection from a room.
    ///
    /// Destroys the room when it becomes empty; otherwise hands ownership
    /// to the earliest-joined remaining member if the owner left.
    /// Returns `None` if the room or member does not exist.
    pub fn leave(&mut self, code: &RoomCode, id: ClientId) -> Option<Departure> {
        let room = self.rooms.get_mut(code)?;
        let departed = room.remove_member(id)?;

        if room.is_empty() {
            self.rooms.remove(code);
            return Some(Departure::RoomClosed);
        }

        let was_owner = departed.is_owner();
        let promoted = if was_owner {
            room.promote_successor()
        } else {
            None
        };

        Some(Departure::Left { was_owner, promoted })
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    const ORIGIN: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s.to_string()).unwrap()
    }

    fn join(registry: &mut RoomRegistry, room: &str, id: ClientId) -> Result<Admission, AppError> {
        registry.join(code(room), id, "user".to_string(), ORIGIN, 2, false)
    }

    #[test]
    fn test_first_join_creates_room_with_owner() {
        let mut registry = RoomRegistry::new();
        let a = ClientId::new();

        let admission = join(&mut registry, "ABC", a).unwrap();
        assert_eq!(admission, Admission { created: true, role: Role::Owner });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&code("ABC")).unwrap().capacity, 2);
    }

    #[test]
    fn test_later_joins_are_members() {
        let mut registry = RoomRegistry::new();
        let (a, b) = (ClientId::new(), ClientId::new());
        join(&mut registry, "ABC", a).unwrap();

        let admission = join(&mut registry, "ABC", b).unwrap();
        assert_eq!(admission, Admission { created: false, role: Role::Member });

        let room = registry.get(&code("ABC")).unwrap();
        assert_eq!(room.member(a).unwrap().role, Role::Owner);
        assert_eq!(room.owner_count(), 1);
    }

    #[test]
    fn test_room_codes_case_sensitive() {
        let mut registry = RoomRegistry::new();
        join(&mut registry, "abc", ClientId::new()).unwrap();
        let admission = join(&mut registry, "ABC", ClientId::new()).unwrap();
        assert!(admission.created);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_full_room_rejects_without_mutation() {
        let mut registry = RoomRegistry::new();
        let (a, b, c) = (ClientId::new(), ClientId::new(), ClientId::new());
        join(&mut registry, "XYZ", a).unwrap();
        join(&mut registry, "XYZ", b).unwrap();

        assert!(matches!(join(&mut registry, "XYZ", c), Err(AppError::RoomFull)));
        let room = registry.get(&code("XYZ")).unwrap();
        assert_eq!(room.member_count(), 2);
        assert!(!room.contains(c));
    }

    #[test]
    fn test_rejoin_keeps_role_and_skips_capacity() {
        let mut registry = RoomRegistry::new();
        let (a, b) = (ClientId::new(), ClientId::new());
        join(&mut registry, "XYZ", a).unwrap();
        join(&mut registry, "XYZ", b).unwrap();

        let admission = registry
            .join(code("XYZ"), a, "again".to_string(), ORIGIN, 2, false)
            .unwrap();
        assert_eq!(admission.role, Role::Owner);

        let room = registry.get(&code("XYZ")).unwrap();
        assert_eq!(room.member_count(), 2);
        assert_eq!(room.member(a).unwrap().nickname, "again");
    }

    #[test]
    fn test_privileged_join_is_owner() {
        let mut registry = RoomRegistry::new();
        join(&mut registry, "ABC", ClientId::new()).unwrap();

        let operator = ClientId::new();
        let admission = registry
            .join(code("ABC"), operator, "op".to_string(), ORIGIN, 2, true)
            .unwrap();
        assert_eq!(admission.role, Role::Owner);
    }

    #[test]
    fn test_owner_leaving_promotes_first_remaining() {
        let mut registry = RoomRegistry::new();
        let (a, b) = (ClientId::new(), ClientId::new());
        join(&mut registry, "ABC", a).unwrap();
        join(&mut registry, "ABC", b).unwrap();

        let departure = registry.leave(&code("ABC"), a).unwrap();
        assert_eq!(
            departure,
            Departure::Left { was_owner: true, promoted: Some(b) }
        );
        let room = registry.get(&code("ABC")).unwrap();
        assert_eq!(room.member(b).unwrap().role, Role::Owner);
    }

    #[test]
    fn test_member_leaving_keeps_owner() {
        let mut registry = RoomRegistry::new();
        let (a, b) = (ClientId::new(), ClientId::new());
        join(&mut registry, "ABC", a).unwrap();
        join(&mut registry, "ABC", b).unwrap();

        assert_eq!(
            registry.leave(&code("ABC"), b),
            Some(Departure::Left { was_owner: false, promoted: None })
        );
    }

    #[test]
    fn test_last_leave_destroys_room() {
        let mut registry = RoomRegistry::new();
        let a = ClientId::new();
        join(&mut registry, "ABC", a).unwrap();

        assert_eq!(registry.leave(&code("ABC"), a), Some(Departure::RoomClosed));
        assert!(registry.is_empty());

        // Same code starts over
        let admission = join(&mut registry, "ABC", ClientId::new()).unwrap();
        assert!(admission.created);
        assert_eq!(registry.get(&code("ABC")).unwrap().history_len(), 0);
    }

    #[test]
    fn test_leave_unknown() {
        let mut registry = RoomRegistry::new();
        assert!(registry.leave(&code("NOPE"), ClientId::new()).is_none());

        join(&mut registry, "ABC", ClientId::new()).unwrap();
        assert!(registry.leave(&code("ABC"), ClientId::new()).is_none());
        assert_eq!(registry.len(), 1);
    }
}
