//! Client-to-server message types
//!
//! Inbound frames look like `{type, room_id?, content?, data?}`. Fields may
//! sit at the top level or inside `data`; the top level wins.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, RustyRoomsError};

#[derive(Debug, Deserialize)]
struct InboundFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RoomFields {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct CreateRoomFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    max_players: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GameEventFields {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    event: Value,
}

/// A parsed client message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Chat { room_id: String, content: String },
    Join { room_id: String },
    Leave { room_id: String },
    CreateRoom { name: Option<String>, max_players: Option<usize> },
    CloseRoom { room_id: String },
    GameEvent { room_id: String, event: Value },
}

fn fields<T: Default + DeserializeOwned>(data: Value) -> Result<T> {
    match data {
        Value::Null => Ok(T::default()),
        other => serde_json::from_value(other).map_err(RustyRoomsError::from),
    }
}

impl ClientMessage {
    /// Parses a text frame into its type tag and message.
    /// The message is `None` when the tag is not one we handle.
    pub fn parse(text: &str) -> Result<(String, Option<ClientMessage>)> {
        let frame: InboundFrame = serde_json::from_str(text)?;
        let kind = frame.kind.clone();
        Ok((kind, Self::from_frame(frame)?))
    }

    fn from_frame(frame: InboundFrame) -> Result<Option<ClientMessage>> {
        let top_room = frame.room_id;
        let top_content = frame.content;

        let message = match frame.kind.as_str() {
            "chat" => {
                let f: RoomFields = fields(frame.data)?;
                ClientMessage::Chat {
                    room_id: top_room.unwrap_or(f.room_id),
                    content: top_content.unwrap_or(f.content),
                }
            }
            "join" => {
                let f: RoomFields = fields(frame.data)?;
                ClientMessage::Join {
                    room_id: top_room.unwrap_or(f.room_id),
                }
            }
            "leave" => {
                let f: RoomFields = fields(frame.data)?;
                ClientMessage::Leave {
                    room_id: top_room.unwrap_or(f.room_id),
                }
            }
            "create_room" => {
                let f: CreateRoomFields = fields(frame.data)?;
                ClientMessage::CreateRoom {
                    name: f.name,
                    max_players: f.max_players,
                }
            }
            "close_room" => {
                let f: RoomFields = fields(frame.data)?;
                ClientMessage::CloseRoom {
                    room_id: top_room.unwrap_or(f.room_id),
                }
            }
            "game_event" => {
                let f: GameEventFields = fields(frame.data)?;
                ClientMessage::GameEvent {
                    room_id: top_room.unwrap_or(f.room_id),
                    event: f.event,
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Option<ClientMessage> {
        ClientMessage::parse(text).unwrap().1
    }

    #[test]
    fn test_chat_fields_from_data() {
        let msg = parsed(r#"{"type":"chat","data":{"room_id":"lobby","content":"hi"}}"#);
        assert_eq!(
            msg,
            Some(ClientMessage::Chat {
                room_id: "lobby".to_string(),
                content: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_top_level_fields_win() {
        let msg = parsed(r#"{"type":"chat","room_id":"r1","content":"top","data":{"room_id":"r2","content":"nested"}}"#);
        assert_eq!(
            msg,
            Some(ClientMessage::Chat {
                room_id: "r1".to_string(),
                content: "top".to_string()
            })
        );
    }

    #[test]
    fn test_missing_chat_fields_default_to_empty() {
        let msg = parsed(r#"{"type":"chat"}"#);
        assert_eq!(
            msg,
            Some(ClientMessage::Chat {
                room_id: String::new(),
                content: String::new()
            })
        );
    }

    #[test]
    fn test_create_room_defaults() {
        let msg = parsed(r#"{"type":"create_room","data":{"max_players":4}}"#);
        assert_eq!(
            msg,
            Some(ClientMessage::CreateRoom {
                name: None,
                max_players: Some(4)
            })
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let (kind, msg) = ClientMessage::parse(r#"{"type":"dance"}"#).unwrap();
        assert_eq!(kind, "dance");
        assert!(msg.is_none());
    }

    #[test]
    fn test_missing_type_is_parse_error() {
        assert!(ClientMessage::parse(r#"{"room_id":"x"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }

    #[test]
    fn test_wrongly_typed_field_is_parse_error() {
        assert!(ClientMessage::parse(r#"{"type":"create_room","data":{"max_players":"many"}}"#).is_err());
    }
}
