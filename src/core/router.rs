//! Message router: dispatches inbound text frames by type

use serde_json::Value;

use crate::constants::{DEFAULT_GAME_ROOM_NAME, MAX_INBOUND_FRAME_SIZE};
use crate::core::message::Envelope;
use crate::core::message_types::ClientMessage;
use crate::core::registry::SharedRoomRegistry;
use crate::core::session::Session;
use crate::error::{Result, RustyRoomsError};

const INVALID_FORMAT: &str = "Invalid message format";
const INVALID_CHAT_FORMAT: &str = "Invalid chat message format";

pub struct MessageRouter {
    registry: SharedRoomRegistry,
    default_room_capacity: usize,
}

impl MessageRouter {
    pub fn new(registry: SharedRoomRegistry, default_room_capacity: usize) -> Self {
        Self {
            registry,
            default_room_capacity,
        }
    }

    /// Handles one inbound frame. Failures go back to the sender only as an
    /// `error` envelope; nothing here ends the connection.
    pub async fn handle_message(&self, session: &mut Session, text: &str) {
        if text.len() > MAX_INBOUND_FRAME_SIZE {
            log::warn!("Large message rejected from {}: {} bytes", session.user_id(), text.len());
            self.reply_error(session, RustyRoomsError::MessageTooLarge(text.len()).to_string())
                .await;
            return;
        }

        let (kind, message) = match ClientMessage::parse(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Unparseable message from {}: {}", session.user_id(), e);
                self.reply_error(session, INVALID_FORMAT).await;
                return;
            }
        };

        log::debug!("Message received from {}: {}", session.user_id(), kind);

        let Some(message) = message else {
            log::warn!("Unknown message type '{}' from user {}", kind, session.user_id());
            return;
        };

        if let Err(e) = self.dispatch(session, message).await {
            log::warn!("Message '{}' from {} failed: {}", kind, session.user_id(), e);
            let reply = match e {
                RustyRoomsError::ValidationError(msg) => msg,
                other => other.to_string(),
            };
            self.reply_error(session, reply).await;
        }
    }

    async fn dispatch(&self, session: &mut Session, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::Chat { room_id, content } => self.handle_chat(session, &room_id, &content).await,
            ClientMessage::Join { room_id } => self.handle_join(session, room_id).await,
            ClientMessage::Leave { room_id } => self.handle_leave(session, &room_id).await,
            ClientMessage::CreateRoom { name, max_players } => {
                self.handle_create_room(session, name, max_players).await
            }
            ClientMessage::CloseRoom { room_id } => self.handle_close_room(session, &room_id).await,
            ClientMessage::GameEvent { room_id, event } => {
                self.handle_game_event(session, &room_id, event).await
            }
        }
    }

    async fn reply_error(&self, session: &Session, message: impl Into<String>) {
        self.registry
            .send_to_user(session.user_id(), Envelope::error(message))
            .await;
    }

    fn require_admin(session: &Session) -> Result<()> {
        if session.user.is_admin() {
            Ok(())
        } else {
            log::warn!("Admin operation refused for user {}", session.user_id());
            Err(RustyRoomsError::Forbidden)
        }
    }

    async fn handle_chat(&self, session: &Session, room_id: &str, content: &str) -> Result<()> {
        if room_id.is_empty() || content.is_empty() {
            return Err(RustyRoomsError::ValidationError(INVALID_CHAT_FORMAT.to_string()));
        }

        let username = self.registry.resolve_sender(room_id, session.user_id()).await?;
        self.registry
            .broadcast_to_room(room_id, Envelope::chat(room_id, session.user_id(), &username, content))
            .await;
        Ok(())
    }

    /// Joins the new room first so a refused join keeps the current one
    async fn handle_join(&self, session: &mut Session, room_id: String) -> Result<()> {
        if room_id.is_empty() {
            return Err(RustyRoomsError::ValidationError("room_id is required".to_string()));
        }
        if session.is_in(&room_id) {
            return Ok(());
        }

        self.registry
            .join_room(&room_id, session.user_id(), session.display_name())
            .await?;

        if let Some(previous) = session.current_room.replace(room_id) {
            self.registry
                .leave_room(&previous, session.user_id(), session.display_name())
                .await;
        }
        Ok(())
    }

    async fn handle_leave(&self, session: &mut Session, room_id: &str) -> Result<()> {
        if !session.is_in(room_id) {
            return Err(RustyRoomsError::NotRoomMember);
        }

        self.registry
            .leave_room(room_id, session.user_id(), session.display_name())
            .await;
        session.current_room = None;
        Ok(())
    }

    async fn handle_create_room(
        &self,
        session: &Session,
        name: Option<String>,
        max_players: Option<usize>,
    ) -> Result<()> {
        Self::require_admin(session)?;

        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GAME_ROOM_NAME.to_string());
        let capacity = max_players.unwrap_or(self.default_room_capacity);

        let room = self
            .registry
            .create_room(&name, session.user_id(), capacity)
            .await?;
        self.registry.announce_room_created(room).await;
        Ok(())
    }

    async fn handle_close_room(&self, session: &Session, room_id: &str) -> Result<()> {
        Self::require_admin(session)?;

        self.registry.close_room(room_id).await?;
        self.registry.announce_room_closed(room_id).await;
        Ok(())
    }

    async fn handle_game_event(&self, session: &Session, room_id: &str, event: Value) -> Result<()> {
        if !self.registry.is_member(room_id, session.user_id()).await {
            return Err(RustyRoomsError::NotRoomMember);
        }

        self.registry
            .broadcast_to_room(
                room_id,
                Envelope::game_event(room_id, session.user_id(), session.display_name(), event),
            )
            .await;
        Ok(())
    }
}
