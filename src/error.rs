//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection or startup termination) and
/// rejected requests (sent back to the requesting client as an event).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Invalid startup configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Join without a room code or nickname
    #[error("Room code and nickname are required")]
    InvalidRequest,

    /// Requested room capacity is not a positive integer
    #[error("Room capacity must be a positive integer")]
    InvalidCapacity,

    /// Room is at capacity
    #[error("Room is full")]
    RoomFull,

    /// Role name that is not owner, admin or member
    #[error("Unknown role: {0}")]
    InvalidRole(String),

    /// Ownership cannot be handed out through a role change
    #[error("Ownership cannot be granted")]
    OwnerNotAssignable,
}

/// Message send errors
///
/// Occurs when an outbound frame cannot be queued for a client.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client's outbound queue is full
    #[error("Channel full")]
    ChannelFull,
}
