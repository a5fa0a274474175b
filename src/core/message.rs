use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::LOBBY_ROOM_ID;
use crate::core::room::RoomInfo;

/// Type-specific part of an outbound envelope.
///
/// Serialized adjacently: the variant name becomes `type` and the fields
/// become the `data` object.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Join { message: String },
    Leave { message: String },
    Chat,
    RoomCreated { room: RoomInfo },
    RoomClosed { room_id: String, message: String },
    Invite { room: RoomInfo, message: String },
    GameEvent { event: serde_json::Value },
    Error { message: String },
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Join { .. } => "join",
            Payload::Leave { .. } => "leave",
            Payload::Chat => "chat",
            Payload::RoomCreated { .. } => "room_created",
            Payload::RoomClosed { .. } => "room_closed",
            Payload::Invite { .. } => "invite",
            Payload::GameEvent { .. } => "game_event",
            Payload::Error { .. } => "error",
        }
    }
}

/// Structured message unit exchanged between a connection and the core
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub payload: Payload,
    pub room_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Overwritten with the delivery time by the registry
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            payload,
            room_id: room_id.into(),
            user_id: user_id.into(),
            username: None,
            content: None,
            timestamp: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn join(room_id: &str, user_id: &str, username: &str) -> Self {
        Self::new(
            room_id,
            user_id,
            Payload::Join {
                message: format!("{} joined the room", username),
            },
        )
        .with_username(username)
    }

    pub fn leave(room_id: &str, user_id: &str, username: &str) -> Self {
        Self::new(
            room_id,
            user_id,
            Payload::Leave {
                message: format!("{} left the room", username),
            },
        )
        .with_username(username)
    }

    pub fn chat(room_id: &str, user_id: &str, username: &str, content: &str) -> Self {
        Self::new(room_id, user_id, Payload::Chat)
            .with_username(username)
            .with_content(content)
    }

    /// Lobby notice for a newly created room
    pub fn room_created(room: RoomInfo) -> Self {
        Self::new(LOBBY_ROOM_ID, "", Payload::RoomCreated { room })
    }

    /// Notice for a closed room, addressed to `target_room_id`
    pub fn room_closed(target_room_id: &str, closed_room_id: &str) -> Self {
        Self::new(
            target_room_id,
            "",
            Payload::RoomClosed {
                room_id: closed_room_id.to_string(),
                message: "This room has been closed by admin".to_string(),
            },
        )
    }

    pub fn invite(room: RoomInfo) -> Self {
        Self::new(
            room.id.clone(),
            "",
            Payload::Invite {
                room,
                message: "You have been invited to join a game room".to_string(),
            },
        )
    }

    pub fn game_event(room_id: &str, user_id: &str, username: &str, event: serde_json::Value) -> Self {
        Self::new(room_id, user_id, Payload::GameEvent { event }).with_username(username)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            "",
            "",
            Payload::Error {
                message: message.into(),
            },
        )
    }

    /// Assigns the delivery timestamp, replacing any earlier value
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.timestamp = Some(now);
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_wire_shape() {
        let mut env = Envelope::chat("r1", "u1", "Alice", "hi");
        env.stamp(Utc::now());
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "chat");
        assert_eq!(value["room_id"], "r1");
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["username"], "Alice");
        assert_eq!(value["content"], "hi");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_payload_fields_nest_under_data() {
        let env = Envelope::room_closed(LOBBY_ROOM_ID, "r9");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "room_closed");
        assert_eq!(value["room_id"], LOBBY_ROOM_ID);
        assert_eq!(value["data"]["room_id"], "r9");
        assert!(value.get("content").is_none());
    }

    #[test]
    fn test_stamp_overwrites_caller_timestamp() {
        let mut env = Envelope::error("nope");
        let old = Utc::now() - chrono::Duration::days(1);
        env.timestamp = Some(old);
        let now = Utc::now();
        env.stamp(now);
        assert_eq!(env.timestamp, Some(now));
        assert_eq!(env.type_name(), "error");
    }
}
