//! Member roles and the moderation rules between them

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A member's role within one room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full moderation rights, one per non-empty room
    Owner,
    /// Moderates plain members
    Admin,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Whether a member with this role may delete a message.
    ///
    /// Authors may always delete their own messages. Owners may delete
    /// anything; admins anything not written by a current owner.
    /// `author_role` is `None` when the author has already left.
    pub fn can_delete(self, is_author: bool, author_role: Option<Role>) -> bool {
        is_author
            || match self {
                Role::Owner => true,
                Role::Admin => author_role != Some(Role::Owner),
                Role::Member => false,
            }
    }

    /// Whether a member with this role may kick a member holding `target`
    pub fn can_kick(self, target: Role) -> bool {
        match self {
            Role::Owner => target != Role::Owner,
            Role::Admin => target == Role::Member,
            Role::Member => false,
        }
    }

    /// Whether a member with this role may change the role of `target`
    pub fn can_change_role(self, target: Role) -> bool {
        self == Role::Owner && target != Role::Owner
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(AppError::InvalidRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
