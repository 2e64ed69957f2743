//! Room Chat Server Library
//!
//! An ephemeral, room-based WebSocket chat server built with
//! tokio-tungstenite using the Actor pattern for state management.
//!
//! # Features
//! - Rooms created on first join, destroyed when the last member leaves
//! - Per-room capacity, chosen by the creator and adjustable by the owner
//! - Owner / admin / member roles with kick and role changes
//! - Automatic ownership succession when the owner disconnects
//! - Bounded message history with replies, edits and deletions
//! - Room themes and typing indicators
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the `RoomRegistry`
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - every room mutation runs inside the actor, one
//!   command at a time
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use room_chat_server::{ChatServer, ServerConfig, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx, ServerConfig::default()).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod member;
pub mod message;
pub mod registry;
pub mod role;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::ServerConfig;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use member::Member;
pub use message::{ChatMessage, ClientMessage, ErrorCode, ServerMessage, UserList};
pub use registry::{Admission, Departure, RoomRegistry};
pub use role::Role;
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use types::{ClientId, MessageId, RoomCode};
