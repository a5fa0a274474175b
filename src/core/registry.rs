//! Room registry: the single in-process source of truth for room metadata
//! and membership.
//!
//! Lock order is always: room map -> room mutex -> multiplexer. Each room has
//! its own mutex, which serializes admissions and the broadcasts issued for
//! that room.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::constants::LOBBY_ROOM_ID;
use crate::core::hub::{HubRoomConfig, Multiplexer};
use crate::core::message::Envelope;
use crate::core::room::{Room, RoomInfo};
use crate::error::{Result, RustyRoomsError};

type RoomHandle = Arc<Mutex<Room>>;

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomHandle>>,
    hub: Arc<dyn Multiplexer>,
    /// Game rooms only admit invitees (and their creator) when set
    room_auth_enabled: bool,
}

impl RoomRegistry {
    /// Creates a registry holding only the lobby
    pub fn new(hub: Arc<dyn Multiplexer>) -> Self {
        let mut rooms = HashMap::new();
        rooms.insert(LOBBY_ROOM_ID.to_string(), Arc::new(Mutex::new(Room::lobby())));

        Self {
            rooms: RwLock::new(rooms),
            hub,
            room_auth_enabled: false,
        }
    }

    pub fn with_room_auth(mut self, enabled: bool) -> Self {
        self.room_auth_enabled = enabled;
        self
    }

    /// Creates the lobby's routing entry. A failure is logged only: the first
    /// join recreates a missing hub room.
    pub async fn start(&self) {
        let lobby = Room::lobby();
        match self
            .hub
            .create_room_with_id(LOBBY_ROOM_ID, Self::hub_config(&lobby))
            .await
        {
            Ok(()) => log::info!("Lobby room created in hub: {}", LOBBY_ROOM_ID),
            Err(e) => log::error!("Failed to create lobby room in hub: {}", e),
        }
    }

    fn hub_config(room: &Room) -> HubRoomConfig {
        HubRoomConfig {
            name: room.name.clone(),
            max_clients: room.max_occupancy,
            is_private: false,
        }
    }

    async fn room_handle(&self, room_id: &str) -> Result<RoomHandle> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or(RustyRoomsError::RoomNotFound)
    }

    /// Creates a game room; the record is rolled back if the hub refuses it
    pub async fn create_room(
        &self,
        name: &str,
        created_by: &str,
        max_occupancy: usize,
    ) -> Result<RoomInfo> {
        let room = Room::game(name.to_string(), created_by.to_string(), max_occupancy);
        let room_id = room.id.clone();
        let config = Self::hub_config(&room);
        let info = room.info(0);

        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id.clone(), Arc::new(Mutex::new(room)));

        if let Err(e) = self.hub.create_room_with_id(&room_id, config).await {
            log::error!("Failed to create room {} in hub: {}", room_id, e);
            rooms.remove(&room_id);
            return Err(match e {
                RustyRoomsError::HubCreateFailed(msg) => RustyRoomsError::HubCreateFailed(msg),
                other => RustyRoomsError::HubCreateFailed(other.to_string()),
            });
        }

        log::info!(
            "Game room created: id={} name={} created_by={} max_players={}",
            room_id,
            name,
            created_by,
            max_occupancy
        );
        Ok(info)
    }

    /// Marks a game room inactive, notifies and evicts its members
    pub async fn close_room(&self, room_id: &str) -> Result<()> {
        if room_id == LOBBY_ROOM_ID {
            return Err(RustyRoomsError::CannotCloseLobby);
        }

        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;

        if room.is_lobby() {
            return Err(RustyRoomsError::CannotCloseLobby);
        }
        if !room.is_active {
            return Err(RustyRoomsError::RoomAlreadyClosed);
        }

        room.is_active = false;
        self.deliver(room_id, Envelope::room_closed(room_id, room_id))
            .await;
        self.hub.close_room(room_id).await;
        room.members.clear();

        log::info!("Game room closed: id={} name={}", room_id, room.name);
        Ok(())
    }

    /// Room metadata with live occupancy; resolves inactive rooms too
    pub async fn get_room(&self, room_id: &str) -> Result<RoomInfo> {
        let handle = self.room_handle(room_id).await?;
        let room = handle.lock().await;
        let occupancy = self.hub.room_client_count(room_id).await;
        Ok(room.info(occupancy))
    }

    /// All active rooms, in no particular order
    pub async fn get_all_rooms(&self) -> Vec<RoomInfo> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            let room = handle.lock().await;
            if room.is_active {
                let occupancy = self.hub.room_client_count(&room.id).await;
                infos.push(room.info(occupancy));
            }
        }
        infos
    }

    /// Admits a user. Existence, active flag, invitation and capacity are
    /// checked under the room's mutex, so concurrent joins cannot overfill it.
    pub async fn join_room(&self, room_id: &str, user_id: &str, username: &str) -> Result<()> {
        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;

        if !room.is_active {
            return Err(RustyRoomsError::RoomInactive);
        }
        if self.room_auth_enabled && !room.admits(user_id) {
            log::warn!("User {} not invited to room {}", user_id, room_id);
            return Err(RustyRoomsError::NotInvited);
        }

        let previous = room.members.get(user_id).cloned();
        if previous.is_none() {
            let occupancy = self.hub.room_client_count(room_id).await;
            if room.is_full(occupancy) {
                return Err(RustyRoomsError::RoomFull);
            }
        }

        room.add_member(user_id, username);

        if let Err(e) = self.join_hub_room(&room, user_id).await {
            log::error!("Failed to join hub room {} for user {}: {}", room_id, user_id, e);
            match previous {
                Some(member) => {
                    room.members.insert(user_id.to_string(), member);
                }
                None => {
                    room.remove_member(user_id);
                }
            }
            return Err(e);
        }

        self.deliver(room_id, Envelope::join(room_id, user_id, username))
            .await;

        log::info!("User joined room: user_id={} username={} room_id={}", user_id, username, room_id);
        Ok(())
    }

    /// Joins the hub room, creating a missing routing entry once
    async fn join_hub_room(&self, room: &Room, user_id: &str) -> Result<()> {
        match self.hub.join_room(user_id, &room.id).await {
            Err(RustyRoomsError::HubRoomNotFound(_)) => {
                self.hub
                    .create_room_with_id(&room.id, Self::hub_config(room))
                    .await?;
                log::info!("Created room {} in hub", room.id);
                self.hub.join_room(user_id, &room.id).await
            }
            other => other,
        }
    }

    /// Best-effort leave; never fails the caller
    pub async fn leave_room(&self, room_id: &str, user_id: &str, username: &str) {
        match self.room_handle(room_id).await {
            Ok(handle) => {
                let mut room = handle.lock().await;
                room.remove_member(user_id);
                self.hub.leave_room(user_id, room_id).await;
                self.deliver(room_id, Envelope::leave(room_id, user_id, username))
                    .await;
            }
            Err(e) => {
                log::warn!("Leave for room {} by user {}: {}", room_id, user_id, e);
                self.hub.leave_room(user_id, room_id).await;
                return;
            }
        }

        log::info!("User left room: user_id={} username={} room_id={}", user_id, username, room_id);
    }

    /// Adds users to the room's invitee set; does not admit them
    pub async fn invite_users(&self, room_id: &str, user_ids: &[String]) -> Result<RoomInfo> {
        let handle = self.room_handle(room_id).await?;
        let mut room = handle.lock().await;
        room.invite(user_ids.iter().cloned());
        let occupancy = self.hub.room_client_count(room_id).await;
        Ok(room.info(occupancy))
    }

    /// Sender display name for a chat in `room_id`
    pub async fn resolve_sender(&self, room_id: &str, user_id: &str) -> Result<String> {
        let handle = self.room_handle(room_id).await?;
        let room = handle.lock().await;
        if !room.is_active {
            return Err(RustyRoomsError::RoomInactive);
        }
        Ok(room.display_name_of(user_id))
    }

    pub async fn is_member(&self, room_id: &str, user_id: &str) -> bool {
        match self.room_handle(room_id).await {
            Ok(handle) => handle.lock().await.has_member(user_id),
            Err(_) => false,
        }
    }

    /// Tells the lobby about a new game room
    pub async fn announce_room_created(&self, room: RoomInfo) -> usize {
        self.broadcast_to_room(LOBBY_ROOM_ID, Envelope::room_created(room))
            .await
    }

    /// Tells the lobby a game room is gone
    pub async fn announce_room_closed(&self, room_id: &str) -> usize {
        self.broadcast_to_room(LOBBY_ROOM_ID, Envelope::room_closed(LOBBY_ROOM_ID, room_id))
            .await
    }

    /// Sends an envelope to every client routed to the room
    pub async fn broadcast_to_room(&self, room_id: &str, envelope: Envelope) -> usize {
        match self.room_handle(room_id).await {
            Ok(handle) => {
                let _room = handle.lock().await;
                self.deliver(room_id, envelope).await
            }
            Err(_) => self.deliver(room_id, envelope).await,
        }
    }

    /// Sends an envelope to one user
    pub async fn send_to_user(&self, user_id: &str, envelope: Envelope) -> bool {
        match Self::render(envelope) {
            Some(frame) => self.hub.send_to_user(user_id, &frame).await,
            None => false,
        }
    }

    /// Delivery without taking the room mutex; callers hold it already
    async fn deliver(&self, room_id: &str, envelope: Envelope) -> usize {
        let kind = envelope.type_name();
        match Self::render(envelope) {
            Some(frame) => {
                let count = self.hub.broadcast_to_room(room_id, &frame).await;
                log::debug!("Broadcast {} to {} clients in room {}", kind, count, room_id);
                count
            }
            None => 0,
        }
    }

    /// Stamps the delivery time and serializes the wire frame
    fn render(mut envelope: Envelope) -> Option<String> {
        envelope.stamp(Utc::now());
        match serde_json::to_string(&envelope) {
            Ok(frame) => Some(frame),
            Err(e) => {
                let err = RustyRoomsError::SystemError(format!(
                    "failed to serialize {} envelope: {}",
                    envelope.type_name(),
                    e
                ));
                log::error!("{}", err);
                None
            }
        }
    }
}

// Shared reference to the registry
pub type SharedRoomRegistry = Arc<RoomRegistry>;
