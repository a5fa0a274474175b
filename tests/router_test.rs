use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use warp::ws::Message;

use rusty_rooms::auth::{AuthenticatedUser, Role};
use rusty_rooms::core::{Hub, MessageRouter, RoomRegistry, Session};
use rusty_rooms::LOBBY_ROOM_ID;

struct Fixture {
    hub: Arc<Hub>,
    registry: Arc<RoomRegistry>,
    router: MessageRouter,
}

impl Fixture {
    async fn new() -> Self {
        let hub = Arc::new(Hub::new());
        let registry = Arc::new(RoomRegistry::new(hub.clone()));
        registry.start().await;
        let router = MessageRouter::new(registry.clone(), 10);
        Self { hub, registry, router }
    }

    /// Connected session already sitting in the lobby
    async fn session(&self, user_id: &str, role: Role) -> (Session, UnboundedReceiver<Message>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let registration = self.hub.register(user_id, tx).await;
        let user = AuthenticatedUser {
            user_id: user_id.to_string(),
            display_name: format!("{}-name", user_id),
            role,
            token_id: format!("jti-{}", user_id),
        };
        let mut session = Session::new(user, registration);
        self.registry
            .join_room(LOBBY_ROOM_ID, session.user_id(), session.display_name())
            .await
            .unwrap();
        session.current_room = Some(LOBBY_ROOM_ID.to_string());
        while rx.try_recv().is_ok() {}
        (session, rx)
    }
}

fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        frames.push(serde_json::from_str(msg.to_str().unwrap()).unwrap());
    }
    frames
}

#[tokio::test]
async fn test_chat_reaches_room_with_sender_identity() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    drain(&mut rx_a);

    let frame = json!({"type": "chat", "room_id": LOBBY_ROOM_ID, "content": "hi all"}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;

    for rx in [&mut rx_a, &mut rx_b] {
        let frames = drain(rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "chat");
        assert_eq!(frames[0]["username"], "alice-name");
        assert_eq!(frames[0]["content"], "hi all");
    }
}

#[tokio::test]
async fn test_empty_chat_errors_to_sender_only() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    drain(&mut rx_a);

    let frame = json!({"type": "chat", "data": {"room_id": LOBBY_ROOM_ID, "content": ""}}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;

    let frames = drain(&mut rx_a);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");
    assert_eq!(frames[0]["data"]["message"], "Invalid chat message format");
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test]
async fn test_whitespace_chat_is_delivered() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    drain(&mut rx_a);

    let frame = json!({"type": "chat", "room_id": LOBBY_ROOM_ID, "content": "  "}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;

    let frames = drain(&mut rx_b);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "chat");
    assert_eq!(frames[0]["content"], "  ");
}

#[tokio::test]
async fn test_chat_to_unknown_room_is_rejected() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;

    let frame = json!({"type": "chat", "room_id": "nowhere", "content": "hello?"}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;

    let frames = drain(&mut rx_a);
    assert_eq!(frames[0]["type"], "error");
    assert_eq!(frames[0]["data"]["message"], "Room not found");
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;

    fx.router.handle_message(&mut alice, "{not json").await;
    let frames = drain(&mut rx_a);
    assert_eq!(frames[0]["data"]["message"], "Invalid message format");

    // Still routable afterwards
    let frame = json!({"type": "chat", "room_id": LOBBY_ROOM_ID, "content": "back"}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;
    assert_eq!(drain(&mut rx_a)[0]["type"], "chat");
}

#[tokio::test]
async fn test_unknown_type_is_dropped_silently() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;

    fx.router.handle_message(&mut alice, r#"{"type":"dance"}"#).await;
    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test]
async fn test_non_admin_cannot_create_room() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;

    fx.router
        .handle_message(&mut alice, r#"{"type":"create_room","data":{"name":"Mine"}}"#)
        .await;

    let frames = drain(&mut rx_a);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");
    assert_eq!(fx.registry.get_all_rooms().await.len(), 1);
}

#[tokio::test]
async fn test_admin_create_announces_to_lobby_with_defaults() {
    let fx = Fixture::new().await;
    let (mut admin, mut rx_admin) = fx.session("admin", Role::Admin).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    drain(&mut rx_admin);

    fx.router
        .handle_message(&mut admin, r#"{"type":"create_room"}"#)
        .await;

    let frames = drain(&mut rx_b);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "room_created");
    assert_eq!(frames[0]["room_id"], LOBBY_ROOM_ID);
    assert_eq!(frames[0]["data"]["room"]["name"], "Game Room");
    assert_eq!(frames[0]["data"]["room"]["max_players"], 10);
    assert_eq!(frames[0]["data"]["room"]["created_by"], "admin");
}

#[tokio::test]
async fn test_admin_close_announces_to_lobby() {
    let fx = Fixture::new().await;
    let (mut admin, _rx_admin) = fx.session("admin", Role::Admin).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    let room = fx.registry.create_room("Quiz", "admin", 3).await.unwrap();

    let frame = json!({"type": "close_room", "data": {"room_id": room.id}}).to_string();
    fx.router.handle_message(&mut admin, &frame).await;

    let frames = drain(&mut rx_b);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "room_closed");
    assert_eq!(frames[0]["data"]["room_id"], room.id.as_str());
    assert!(!fx.registry.get_room(&room.id).await.unwrap().is_active);
}

#[tokio::test]
async fn test_join_moves_session_between_rooms() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;
    let (_bob, mut rx_b) = fx.session("bob", Role::User).await;
    let room = fx.registry.create_room("Quiz", "admin", 3).await.unwrap();
    drain(&mut rx_a);

    let frame = json!({"type": "join", "room_id": room.id}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;

    assert_eq!(alice.current_room.as_deref(), Some(room.id.as_str()));
    assert!(fx.registry.is_member(&room.id, "alice").await);
    assert!(!fx.registry.is_member(LOBBY_ROOM_ID, "alice").await);

    let lobby_frames = drain(&mut rx_b);
    assert_eq!(lobby_frames.last().unwrap()["type"], "leave");
}

#[tokio::test]
async fn test_game_event_requires_membership() {
    let fx = Fixture::new().await;
    let (mut alice, mut rx_a) = fx.session("alice", Role::User).await;
    let room = fx.registry.create_room("Quiz", "admin", 3).await.unwrap();

    let frame = json!({"type": "game_event", "data": {"room_id": room.id, "event": {"move": "e4"}}}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;
    let frames = drain(&mut rx_a);
    assert_eq!(frames[0]["type"], "error");
    assert_eq!(frames[0]["data"]["message"], "Not a member of this room");

    let frame = json!({"type": "game_event", "data": {"room_id": LOBBY_ROOM_ID, "event": {"move": "e4"}}}).to_string();
    fx.router.handle_message(&mut alice, &frame).await;
    let frames = drain(&mut rx_a);
    assert_eq!(frames[0]["type"], "game_event");
    assert_eq!(frames[0]["data"]["event"]["move"], "e4");
}
