//! Per-connection session records
//!
//! A session remembers which room a connection joined and under which
//! nickname. Handlers resolve the acting room through it rather than
//! trusting room codes sent with each event.

use std::collections::HashMap;

use crate::types::{ClientId, RoomCode};

/// What a connection last joined as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_code: RoomCode,
    pub nickname: String,
    pub client_id: ClientId,
}

/// Storage for sessions, keyed by connection
pub trait SessionStore {
    fn get(&self, client_id: ClientId) -> Option<&Session>;

    /// Store a session, replacing any previous one for the same connection
    fn set(&mut self, session: Session);

    fn clear(&mut self, client_id: ClientId) -> Option<Session>;
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<ClientId, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, client_id: ClientId) -> Option<&Session> {
        self.sessions.get(&client_id)
    }

    fn set(&mut self, session: Session) {
        self.sessions.insert(session.client_id, session);
    }

    fn clear(&mut self, client_id: ClientId) -> Option<Session> {
        self.sessions.remove(&client_id)
    }
}
