//! Room struct definition
//!
//! A room owns its members, a bounded message history, its theme and its
//! capacity. Every room-local mutation is checked against the requester's
//! current role here, so callers only decide what to broadcast.

use std::collections::VecDeque;

use crate::member::Member;
use crate::message::{ChatMessage, UserList};
use crate::role::Role;
use crate::types::{ClientId, MessageId};

/// Number of messages kept per room
pub const MAX_HISTORY: usize = 200;

/// Theme given to every new room
pub const DEFAULT_THEME: &str = "dark-neon";

/// Multi-member chat room
#[derive(Debug)]
pub struct Room {
    /// Members in join order
    members: Vec<Member>,
    /// Most recent messages, oldest first
    history: VecDeque<ChatMessage>,
    pub theme: String,
    /// Maximum number of simultaneous members
    pub capacity: usize,
}

impl Room {
    /// Create an empty room. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            members: Vec::new(),
            history: VecDeque::new(),
            theme: DEFAULT_THEME.to_string(),
            capacity: capacity.max(1),
        }
    }

    pub fn member(&self, id: ClientId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    fn member_mut(&mut self, id: ClientId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    fn role_of(&self, id: ClientId) -> Option<Role> {
        self.member(id).map(|m| m.role)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.member(id).is_some()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` would be turned away for lack of space.
    /// Current members are never turned away.
    pub fn is_full_for(&self, id: ClientId) -> bool {
        self.members.len() >= self.capacity && !self.contains(id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.members.iter().map(|m| m.id)
    }

    pub fn owner_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_owner()).count()
    }

    pub fn user_list(&self) -> UserList {
        UserList(self.members.clone())
    }

    /// Insert a member, or refresh an existing one in place (keeping its
    /// position in join order).
    pub fn upsert_member(&mut self, member: Member) {
        match self.member_mut(member.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    /// Remove a member, returning its entry
    pub fn remove_member(&mut self, id: ClientId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(index))
    }

    /// Make the earliest-joined member owner if nobody holds the role.
    ///
    /// Returns the promoted member's id.
    pub fn promote_successor(&mut self) -> Option<ClientId> {
        if self.owner_count() > 0 {
            return None;
        }
        let successor = self.members.first_mut()?;
        successor.role = Role::Owner;
        Some(successor.id)
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Append a message, evicting the oldest entries beyond `MAX_HISTORY`
    pub fn push_message(&mut self, message: ChatMessage) {
        self.history.push_back(message);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// First message with the given id
    pub fn find_message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.history.iter().find(|m| &m.id == id)
    }

    /// Delete the first message with `id` if `requester` is allowed to.
    pub fn delete_message(&mut self, requester: ClientId, id: &MessageId) -> Option<ChatMessage> {
        let role = self.role_of(requester)?;
        let index = self.history.iter().position(|m| &m.id == id)?;
        let author = self.history[index].sid;

        if !role.can_delete(author == requester, self.role_of(author)) {
            return None;
        }
        self.history.remove(index)
    }

    /// Replace the body of the first message with `id` written by `requester`.
    pub fn edit_message(
        &mut self,
        requester: ClientId,
        id: &MessageId,
        body: String,
    ) -> Option<&ChatMessage> {
        let message = self
            .history
            .iter_mut()
            .find(|m| &m.id == id && m.sid == requester)?;
        message.message = body;
        message.edited = true;
        Some(message)
    }

    /// Owner only
    pub fn clear_history(&mut self, requester: ClientId) -> bool {
        if self.role_of(requester) != Some(Role::Owner) {
            return false;
        }
        self.history.clear();
        true
    }

    /// Any member may change the theme
    pub fn set_theme(&mut self, requester: ClientId, theme: String) -> bool {
        if !self.contains(requester) {
            return false;
        }
        self.theme = theme;
        true
    }

    /// Owner only. Members above a lowered capacity stay.
    pub fn set_capacity(&mut self, requester: ClientId, capacity: usize) -> bool {
        if capacity == 0 || self.role_of(requester) != Some(Role::Owner) {
            return false;
        }
        self.capacity = capacity;
        true
    }

    /// Whether `requester` may kick `target`
    pub fn may_kick(&self, requester: ClientId, target: ClientId) -> bool {
        match (self.role_of(requester), self.role_of(target)) {
            (Some(requester), Some(target)) => requester.can_kick(target),
            _ => false,
        }
    }

    /// Whether `requester` may change the role of `target`
    pub fn may_change_role(&self, requester: ClientId, target: ClientId) -> bool {
        match (self.role_of(requester), self.role_of(target)) {
            (Some(requester), Some(target)) => requester.can_change_role(target),
            _ => false,
        }
    }

    /// Set a member's role without any permission check
    pub fn set_role(&mut self, target: ClientId, role: Role) -> bool {
        match self.member_mut(target) {
            Some(member) => {
                member.role = role;
                true
            }
            None => false,
        }
    }
}
