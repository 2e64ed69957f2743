//! Room member definition

use std::net::IpAddr;

use serde::Serialize;

use crate::role::Role;
use crate::types::ClientId;

/// A connection's participation in one room
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    #[serde(skip)]
    pub id: ClientId,
    pub nickname: String,
    pub role: Role,
    /// Peer address the connection came from (never broadcast)
    #[serde(skip)]
    pub origin: IpAddr,
}

impl Member {
    pub fn new(id: ClientId, nickname: String, role: Role, origin: IpAddr) -> Self {
        Self {
            id,
            nickname,
            role,
            origin,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}
