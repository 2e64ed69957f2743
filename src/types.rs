//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based connection identity (the `sid` on the wire)
//! - `RoomCode`: caller-chosen, case-sensitive room code
//! - `MessageId`: caller-supplied message identity (string or number)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Capacity assigned to a new room when the creator does not request one
pub const DEFAULT_CAPACITY: usize = 2;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code
///
/// Chosen by whoever joins first. Compared exactly, so `abc` and `ABC`
/// are different rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Returns `None` for an empty code.
    pub fn parse(code: String) -> Option<Self> {
        if code.is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier supplied by the sending client
///
/// Browsers send either a string or a numeric timestamp, both are accepted
/// and echoed back unchanged. Uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self::Number(id.into())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Coerce a client-supplied capacity to a positive integer
///
/// Accepts JSON integers, floats (truncated) and numeric strings.
/// Anything else, or a value below 1, yields `None`.
pub fn parse_capacity(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().filter(|f| f.is_finite())?.trunc() as i64,
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    usize::try_from(n).ok().filter(|n| *n > 0)
}
