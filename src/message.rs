//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Every frame is an object
//! whose `type` field names the event.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::AppError;
use crate::member::Member;
use crate::role::Role;
use crate::types::{ClientId, MessageId};

/// Client → Server message
///
/// All events a client may send. Uses tagged enum with snake_case naming.
/// Fields whose absence is handled by the server carry `#[serde(default)]`
/// so that an incomplete event still reaches its handler.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or create) a room
    Join {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        nickname: Option<String>,
        /// Requested capacity, only used when the room is created
        #[serde(default)]
        max_strength: Option<Value>,
    },
    /// Post a chat message
    SendMessage {
        id: MessageId,
        message: String,
        #[serde(default)]
        timestamp: Value,
        #[serde(default)]
        reply_to: Option<MessageId>,
    },
    /// Delete a message by id
    DeleteMessage { id: MessageId },
    /// Replace the body of one's own message
    EditMessage {
        id: MessageId,
        #[serde(default)]
        message: String,
    },
    /// Change the room theme
    ChangeTheme {
        #[serde(default)]
        theme: String,
    },
    /// Empty the room history
    ClearChat,
    /// Typing indicator
    Typing {
        #[serde(default)]
        is_typing: bool,
    },
    /// Remove a member from the room
    KickUser { sid: ClientId },
    /// Give a member another role
    ChangeRole { sid: ClientId, role: String },
    /// Change the room capacity
    ChangeMaxStrength {
        #[serde(default)]
        strength: Value,
    },
}

/// A chat message as stored in room history and sent to clients
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Author connection
    pub sid: ClientId,
    /// Author nickname at send time
    pub nickname: String,
    pub message: String,
    /// Opaque client-side timestamp
    pub timestamp: Value,
    pub reply_to: Option<MessageId>,
    pub edited: bool,
}

/// Room members keyed by connection id, in join order
///
/// Serialized as `{"<sid>": {"nickname": .., "role": ..}, ..}`.
#[derive(Debug, Clone, Default)]
pub struct UserList(pub Vec<Member>);

impl Serialize for UserList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|member| (member.id, member)))
    }
}

/// Server → Client message
///
/// All events sent to clients. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted, connection id issued
    Connected { sid: ClientId },
    /// Join was rejected
    JoinError { error: String },
    /// Join succeeded; full room snapshot for the joiner
    JoinSuccess {
        messages: Vec<ChatMessage>,
        users: UserList,
        sid: ClientId,
        theme: String,
        max_strength: usize,
    },
    /// Member list changed
    UpdateUserList { users: UserList },
    /// New chat message
    ReceiveMessage(ChatMessage),
    /// Message removed from history
    MessageDeleted { id: MessageId },
    /// Message body replaced
    MessageEdited(ChatMessage),
    /// Room theme changed
    ThemeChanged { theme: String },
    /// Room history emptied
    ChatCleared,
    /// Another member started or stopped typing
    TypingStatus {
        sid: ClientId,
        nickname: String,
        is_typing: bool,
    },
    /// A member's role changed
    RoleChanged { sid: ClientId, role: Role },
    /// Recipient was removed from the room
    Kicked { reason: String },
    /// Room capacity changed
    MaxStrengthChanged { strength: usize },
    /// A request was rejected
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerMessage::Error
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Role name is not owner, admin or member
    InvalidRole,
    /// Ownership cannot be handed out by a role change
    OwnerNotAssignable,
    /// Anything else
    InvalidMessage,
}

/// Convert a rejection into the event sent back to the requester
///
/// Join failures become `join_error`, everything else a generic `error`.
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::InvalidRequest => ServerMessage::JoinError {
                error: "Room code and nickname are required.".to_string(),
            },
            AppError::RoomFull => ServerMessage::JoinError {
                error: "This room is full.".to_string(),
            },
            AppError::InvalidCapacity => ServerMessage::JoinError {
                error: "Room capacity must be a positive whole number.".to_string(),
            },
            AppError::InvalidRole(role) => ServerMessage::Error {
                code: ErrorCode::InvalidRole,
                message: format!("Unknown role '{}'", role),
            },
            AppError::OwnerNotAssignable => ServerMessage::Error {
                code: ErrorCode::OwnerNotAssignable,
                message: "Ownership cannot be granted".to_string(),
            },
            // Fatal errors are not typically converted (connection closes)
            _ => ServerMessage::Error {
                code: ErrorCode::InvalidMessage,
                message: "Internal error".to_string(),
            },
        }
    }
}
