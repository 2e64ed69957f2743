//! ChatServer Actor implementation
//!
//! The central actor that owns all state: live clients, the room registry
//! and connection sessions. Commands arrive one at a time over an mpsc
//! channel and every handler runs to completion without awaiting, so each
//! read-check-write on a room is atomic with respect to every other
//! connection.

use std::collections::HashMap;
use std::net::IpAddr;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{ChatMessage, ClientMessage, ServerMessage};
use crate::registry::{Departure, RoomRegistry};
use crate::role::Role;
use crate::session::{MemorySessionStore, Session, SessionStore};
use crate::types::{parse_capacity, ClientId, MessageId, RoomCode, DEFAULT_CAPACITY};

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        origin: IpAddr,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client connection closed
    Disconnect { client_id: ClientId },
    /// Event received from a client
    Event {
        client_id: ClientId,
        message: ClientMessage,
    },
}

/// The main ChatServer actor
pub struct ChatServer<S = MemorySessionStore> {
    config: ServerConfig,
    /// Live connections: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All active rooms
    registry: RoomRegistry,
    /// Which room each connection is acting in
    sessions: S,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer<MemorySessionStore> {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, config: ServerConfig) -> Self {
        Self::with_session_store(receiver, config, MemorySessionStore::new())
    }
}

impl<S: SessionStore> ChatServer<S> {
    pub fn with_session_store(
        receiver: mpsc::Receiver<ServerCommand>,
        config: ServerConfig,
        sessions: S,
    ) -> Self {
        Self {
            config,
            clients: HashMap::new(),
            registry: RoomRegistry::new(),
            sessions,
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                client_id,
                origin,
                sender,
            } => self.handle_connect(client_id, origin, sender),
            ServerCommand::Disconnect { client_id } => self.handle_disconnect(client_id),
            ServerCommand::Event { client_id, message } => self.handle_event(client_id, message),
        }
    }

    /// Dispatch a client event to its handler
    fn handle_event(&mut self, client_id: ClientId, message: ClientMessage) {
        // Kicked connections linger until their socket closes
        if !self.clients.contains_key(&client_id) {
            debug!("Ignoring event from closed client {}", client_id);
            return;
        }

        match message {
            ClientMessage::Join {
                room,
                nickname,
                max_strength,
            } => self.handle_join(client_id, room, nickname, max_strength),
            ClientMessage::SendMessage {
                id,
                message,
                timestamp,
                reply_to,
            } => self.handle_send_message(client_id, id, message, timestamp, reply_to),
            ClientMessage::DeleteMessage { id } => self.handle_delete_message(client_id, id),
            ClientMessage::EditMessage { id, message } => {
                self.handle_edit_message(client_id, id, message)
            }
            ClientMessage::ChangeTheme { theme } => self.handle_change_theme(client_id, theme),
            ClientMessage::ClearChat => self.handle_clear_chat(client_id),
            ClientMessage::Typing { is_typing } => self.handle_typing(client_id, is_typing),
            ClientMessage::KickUser { sid } => self.handle_kick(client_id, sid),
            ClientMessage::ChangeRole { sid, role } => self.handle_change_role(client_id, sid, role),
            ClientMessage::ChangeMaxStrength { strength } => {
                self.handle_change_max_strength(client_id, strength)
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(
        &mut self,
        client_id: ClientId,
        origin: IpAddr,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        info!("Client {} connected from {}", client_id, origin);
        let client = Client::new(origin, sender);
        if let Err(e) = client.send(ServerMessage::Connected { sid: client_id }) {
            warn!("Dropped message for {}: {}", client_id, e);
        }
        self.clients.insert(client_id, client);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.registry.len()
        );
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        info!("Client {} disconnected", client_id);
        self.clients.remove(&client_id);

        if let Some(session) = self.sessions.clear(client_id) {
            self.leave_room(client_id, &session.room_code);
        }

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.clients.len(),
            self.registry.len()
        );
    }

    /// Handle joining (and possibly creating) a room
    fn handle_join(
        &mut self,
        client_id: ClientId,
        room: Option<String>,
        nickname: Option<String>,
        max_strength: Option<Value>,
    ) {
        let Some(origin) = self.clients.get(&client_id).map(|c| c.origin) else {
            return;
        };

        let code = room.and_then(RoomCode::parse);
        let nickname = nickname.filter(|n| !n.is_empty());
        let (Some(code), Some(nickname)) = (code, nickname) else {
            self.reject(client_id, AppError::InvalidRequest);
            return;
        };

        // Requested capacity only matters for a room that does not exist yet
        let capacity = match max_strength {
            Some(value) if !self.registry.contains(&code) => match parse_capacity(&value) {
                Some(capacity) => capacity,
                None => {
                    self.reject(client_id, AppError::InvalidCapacity);
                    return;
                }
            },
            _ => DEFAULT_CAPACITY,
        };

        if self.registry.is_full_for(&code, client_id) {
            self.reject(client_id, AppError::RoomFull);
            return;
        }

        // A connection is in at most one room at a time
        let previous = self.sessions.get(client_id).map(|s| s.room_code.clone());
        if let Some(previous) = previous.filter(|p| *p != code) {
            info!("Client {} leaving room {} to join {}", client_id, previous, code);
            self.leave_room(client_id, &previous);
        }

        let privileged = self.config.is_privileged(origin);
        let admission = match self.registry.join(
            code.clone(),
            client_id,
            nickname.clone(),
            origin,
            capacity,
            privileged,
        ) {
            Ok(admission) => admission,
            Err(e) => {
                self.reject(client_id, e);
                return;
            }
        };

        self.sessions.set(Session {
            room_code: code.clone(),
            nickname: nickname.clone(),
            client_id,
        });

        if admission.created {
            info!("Client {} created room {} (capacity {})", client_id, code, capacity);
        }
        info!(
            "Client {} joined room {} as '{}' ({})",
            client_id, code, nickname, admission.role
        );

        let Some(room) = self.registry.get(&code) else {
            return;
        };
        let snapshot = ServerMessage::JoinSuccess {
            messages: room.history(),
            users: room.user_list(),
            sid: client_id,
            theme: room.theme.clone(),
            max_strength: room.capacity,
        };
        self.send_to(client_id, snapshot);
        self.broadcast_user_list(&code);
    }

    /// Handle a new chat message
    fn handle_send_message(
        &mut self,
        client_id: ClientId,
        id: MessageId,
        body: String,
        timestamp: Value,
        reply_to: Option<MessageId>,
    ) {
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        let message = ChatMessage {
            id,
            sid: client_id,
            nickname: session.nickname,
            message: body,
            timestamp,
            reply_to,
            edited: false,
        };
        room.push_message(message.clone());
        debug!("Message {} from {} in room {}", message.id, client_id, session.room_code);

        self.broadcast(&session.room_code, ServerMessage::ReceiveMessage(message), None);
    }

    /// Handle message deletion
    fn handle_delete_message(&mut self, client_id: ClientId, id: MessageId) {
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        let Some(deleted) = room.delete_message(client_id, &id) else {
            debug!("Client {} may not delete message {}", client_id, id);
            return;
        };

        info!("Client {} deleted message {} in room {}", client_id, id, session.room_code);
        self.broadcast(
            &session.room_code,
            ServerMessage::MessageDeleted { id: deleted.id },
            None,
        );
    }

    /// Handle message edit (author only)
    fn handle_edit_message(&mut self, client_id: ClientId, id: MessageId, body: String) {
        if body.is_empty() {
            return;
        }
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        let Some(edited) = room.edit_message(client_id, &id, body).cloned() else {
            debug!("Client {} has no message {} to edit", client_id, id);
            return;
        };

        self.broadcast(&session.room_code, ServerMessage::MessageEdited(edited), None);
    }

    /// Handle theme change (any member)
    fn handle_change_theme(&mut self, client_id: ClientId, theme: String) {
        if theme.is_empty() {
            return;
        }
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        if !room.set_theme(client_id, theme.clone()) {
            return;
        }

        debug!("Room {} theme set to '{}'", session.room_code, theme);
        self.broadcast(&session.room_code, ServerMessage::ThemeChanged { theme }, None);
    }

    /// Handle history clearing (owner only)
    fn handle_clear_chat(&mut self, client_id: ClientId) {
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        if !room.clear_history(client_id) {
            debug!("Client {} may not clear room {}", client_id, session.room_code);
            return;
        }

        info!("Room {} history cleared by {}", session.room_code, client_id);
        self.broadcast(&session.room_code, ServerMessage::ChatCleared, None);
    }

    /// Handle typing indicator, relayed to everyone but the sender
    fn handle_typing(&mut self, client_id: ClientId, is_typing: bool) {
        let Some(session) = self.session(client_id) else {
            return;
        };

        self.broadcast(
            &session.room_code,
            ServerMessage::TypingStatus {
                sid: client_id,
                nickname: session.nickname,
                is_typing,
            },
            Some(client_id),
        );
    }

    /// Handle kicking a member
    ///
    /// The target is told why, then its outbound channel is dropped, which
    /// closes the socket once the notice is written. Room cleanup happens
    /// when the connection reports its disconnect.
    fn handle_kick(&mut self, client_id: ClientId, target: ClientId) {
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get(&session.room_code) else {
            return;
        };

        if !room.may_kick(client_id, target) {
            debug!("Client {} may not kick {}", client_id, target);
            return;
        }
        let kicker = room
            .member(client_id)
            .map(|m| m.nickname.clone())
            .unwrap_or(session.nickname);

        // Dropping the client closes its channel once the notice is queued
        if let Some(client) = self.clients.remove(&target) {
            let notice = ServerMessage::Kicked {
                reason: format!("You have been kicked by {}.", kicker),
            };
            if let Err(e) = client.send_final(notice) {
                warn!("Kick notice for {} not delivered: {}", target, e);
            }
        }

        info!("Client {} kicked {} from room {}", client_id, target, session.room_code);
    }

    /// Handle role change (owner only, never of or to an owner)
    fn handle_change_role(&mut self, client_id: ClientId, target: ClientId, role: String) {
        let Some(session) = self.session(client_id) else {
            return;
        };
        let allowed = self
            .registry
            .get(&session.room_code)
            .is_some_and(|room| room.may_change_role(client_id, target));
        if !allowed {
            debug!("Client {} may not change the role of {}", client_id, target);
            return;
        }

        let role = match role.parse::<Role>() {
            Ok(Role::Owner) => Err(AppError::OwnerNotAssignable),
            other => other,
        };
        let role = match role {
            Ok(role) => role,
            Err(e) => {
                self.reject(client_id, e);
                return;
            }
        };

        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };
        if !room.set_role(target, role) {
            return;
        }

        info!("Client {} made {} {} in room {}", client_id, target, role, session.room_code);
        self.broadcast(
            &session.room_code,
            ServerMessage::RoleChanged { sid: target, role },
            None,
        );
        self.broadcast_user_list(&session.room_code);
    }

    /// Handle capacity change (owner only)
    fn handle_change_max_strength(&mut self, client_id: ClientId, strength: Value) {
        let Some(capacity) = parse_capacity(&strength) else {
            debug!("Ignoring invalid capacity {} from {}", strength, client_id);
            return;
        };
        let Some(session) = self.session(client_id) else {
            return;
        };
        let Some(room) = self.registry.get_mut(&session.room_code) else {
            return;
        };

        if !room.set_capacity(client_id, capacity) {
            return;
        }

        info!("Room {} capacity set to {}", session.room_code, capacity);
        self.broadcast(
            &session.room_code,
            ServerMessage::MaxStrengthChanged { strength: capacity },
            None,
        );
    }

    /// Helper: remove a client from a room, passing on ownership if needed
    fn leave_room(&mut self, client_id: ClientId, room_code: &RoomCode) {
        let Some(departure) = self.registry.leave(room_code, client_id) else {
            return;
        };

        match departure {
            Departure::RoomClosed => {
                debug!("Room {} deleted (empty)", room_code);
            }
            Departure::Left {
                was_owner,
                promoted,
            } => {
                debug!(
                    "Client {} left room {} (owner: {})",
                    client_id, room_code, was_owner
                );
                if let Some(new_owner) = promoted {
                    info!("Client {} is now owner of room {}", new_owner, room_code);
                    self.broadcast(
                        room_code,
                        ServerMessage::RoleChanged {
                            sid: new_owner,
                            role: Role::Owner,
                        },
                        None,
                    );
                }
                self.broadcast_user_list(room_code);
            }
        }
    }

    /// Helper: session for a client, if it has joined a room
    fn session(&self, client_id: ClientId) -> Option<Session> {
        self.sessions.get(client_id).cloned()
    }

    /// Helper: report a rejected request to its sender
    fn reject(&self, client_id: ClientId, err: AppError) {
        debug!("Rejected request from {}: {}", client_id, err);
        self.send_to(client_id, err.into());
    }

    /// Helper: queue a message for one client
    fn send_to(&self, client_id: ClientId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        if let Err(e) = client.send(msg) {
            warn!("Dropped message for {}: {}", client_id, e);
        }
    }

    /// Helper: queue a message for every member of a room
    fn broadcast(&self, room_code: &RoomCode, msg: ServerMessage, except: Option<ClientId>) {
        let Some(room) = self.registry.get(room_code) else {
            return;
        };
        for member_id in room.member_ids().filter(|id| Some(*id) != except) {
            self.send_to(member_id, msg.clone());
        }
    }

    /// Helper: send the current member list to a room
    fn broadcast_user_list(&self, room_code: &RoomCode) {
        let Some(room) = self.registry.get(room_code) else {
            return;
        };
        self.broadcast(room_code, ServerMessage::UpdateUserList { users: room.user_list() }, None);
    }
}
