//! Connection multiplexer: per-connection outbound channels and the low-level
//! room routing tables the registry keeps in sync.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message as WsMessage;

use crate::core::connection::Connection;
use crate::error::{Result, RustyRoomsError};

/// Routing-level configuration of a hub room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRoomConfig {
    pub name: String,
    /// 0 means unlimited
    pub max_clients: usize,
    pub is_private: bool,
}

/// Operations the room registry needs from the connection layer
#[async_trait]
pub trait Multiplexer: Send + Sync {
    async fn create_room_with_id(&self, room_id: &str, config: HubRoomConfig) -> Result<()>;

    /// Fails with `HubRoomNotFound` when the routing entry does not exist
    async fn join_room(&self, user_id: &str, room_id: &str) -> Result<()>;

    async fn leave_room(&self, user_id: &str, room_id: &str);

    /// Drops the routing entry and evicts every client from it
    async fn close_room(&self, room_id: &str);

    /// Returns the number of clients the frame was handed to
    async fn broadcast_to_room(&self, room_id: &str, frame: &str) -> usize;

    async fn send_to_user(&self, user_id: &str, frame: &str) -> bool;

    async fn room_client_count(&self, room_id: &str) -> usize;
}

/// Proof that a connection is registered and routable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: String,
    pub connection_id: String,
    /// Rooms the replaced connection of the same user was routed into
    pub inherited_rooms: Vec<String>,
}

struct Client {
    connection: Connection,
    rooms: HashSet<String>,
}

struct HubRoom {
    config: HubRoomConfig,
    clients: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    clients: HashMap<String, Client>,
    rooms: HashMap<String, HubRoom>,
}

/// In-process multiplexer keyed by user id
#[derive(Default)]
pub struct Hub {
    state: RwLock<HubState>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. A newer connection for the same user replaces
    /// the older one and inherits its room routing; the caller owns those
    /// rooms from then on and finds them in `inherited_rooms`.
    pub async fn register(&self, user_id: &str, sender: mpsc::UnboundedSender<WsMessage>) -> Registration {
        let connection = Connection::new(user_id.to_string(), sender);
        let mut registration = Registration {
            user_id: user_id.to_string(),
            connection_id: connection.id.clone(),
            inherited_rooms: Vec::new(),
        };

        let mut state = self.state.write().await;
        match state.clients.get_mut(user_id) {
            Some(existing) => {
                log::info!(
                    "Replacing connection {} of user {} (open for {:?})",
                    existing.connection.id,
                    user_id,
                    existing.connection.connection_duration()
                );
                existing.connection = connection;
                registration.inherited_rooms = existing.rooms.iter().cloned().collect();
                registration.inherited_rooms.sort();
            }
            None => {
                state.clients.insert(
                    user_id.to_string(),
                    Client {
                        connection,
                        rooms: HashSet::new(),
                    },
                );
            }
        }

        log::debug!("Registered connection {} for user {}", registration.connection_id, user_id);
        registration
    }

    /// Removes the connection and all its routing. Returns false when the
    /// registration was already superseded by a newer connection.
    pub async fn unregister(&self, registration: &Registration) -> bool {
        let mut state = self.state.write().await;

        let current = state
            .clients
            .get(&registration.user_id)
            .map(|c| c.connection.id == registration.connection_id)
            .unwrap_or(false);
        if !current {
            return false;
        }

        if let Some(client) = state.clients.remove(&registration.user_id) {
            for room_id in client.rooms {
                if let Some(room) = state.rooms.get_mut(&room_id) {
                    room.clients.remove(&registration.user_id);
                }
            }
        }
        true
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.clients.len()
    }
}

#[async_trait]
impl Multiplexer for Hub {
    async fn create_room_with_id(&self, room_id: &str, config: HubRoomConfig) -> Result<()> {
        let mut state = self.state.write().await;
        if state.rooms.contains_key(room_id) {
            return Err(RustyRoomsError::HubCreateFailed(format!(
                "room {} already exists",
                room_id
            )));
        }
        state.rooms.insert(
            room_id.to_string(),
            HubRoom {
                config,
                clients: HashSet::new(),
            },
        );
        Ok(())
    }

    async fn join_room(&self, user_id: &str, room_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let HubState { clients, rooms } = &mut *state;

        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RustyRoomsError::HubRoomNotFound(room_id.to_string()))?;
        let client = clients
            .get_mut(user_id)
            .ok_or_else(|| RustyRoomsError::ClientNotConnected(user_id.to_string()))?;

        if !room.clients.contains(user_id)
            && room.config.max_clients > 0
            && room.clients.len() >= room.config.max_clients
        {
            return Err(RustyRoomsError::RoomFull);
        }

        room.clients.insert(user_id.to_string());
        client.rooms.insert(room_id.to_string());
        Ok(())
    }

    async fn leave_room(&self, user_id: &str, room_id: &str) {
        let mut state = self.state.write().await;
        if let Some(room) = state.rooms.get_mut(room_id) {
            room.clients.remove(user_id);
        }
        if let Some(client) = state.clients.get_mut(user_id) {
            client.rooms.remove(room_id);
        }
    }

    async fn close_room(&self, room_id: &str) {
        let mut state = self.state.write().await;
        if let Some(room) = state.rooms.remove(room_id) {
            for user_id in room.clients {
                if let Some(client) = state.clients.get_mut(&user_id) {
                    client.rooms.remove(room_id);
                }
            }
        }
    }

    async fn broadcast_to_room(&self, room_id: &str, frame: &str) -> usize {
        let state = self.state.read().await;
        let Some(room) = state.rooms.get(room_id) else {
            log::debug!("Broadcast to unknown hub room {} dropped", room_id);
            return 0;
        };

        room.clients
            .iter()
            .filter_map(|user_id| state.clients.get(user_id))
            .filter(|client| client.connection.send_text(frame))
            .count()
    }

    async fn send_to_user(&self, user_id: &str, frame: &str) -> bool {
        let state = self.state.read().await;
        match state.clients.get(user_id) {
            Some(client) => client.connection.send_text(frame),
            None => false,
        }
    }

    async fn room_client_count(&self, room_id: &str) -> usize {
        self.state
            .read()
            .await
            .rooms
            .get(room_id)
            .map(|r| r.clients.len())
            .unwrap_or(0)
    }
}

// Shared reference to the hub
pub type SharedHub = Arc<Hub>;

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_clients: usize) -> HubRoomConfig {
        HubRoomConfig {
            name: "room".to_string(),
            max_clients,
            is_private: false,
        }
    }

    #[tokio::test]
    async fn test_join_requires_room_and_client() {
        let hub = Hub::new();
        assert!(matches!(
            hub.join_room("u1", "r1").await,
            Err(RustyRoomsError::HubRoomNotFound(_))
        ));

        hub.create_room_with_id("r1", config(0)).await.unwrap();
        assert!(matches!(
            hub.join_room("u1", "r1").await,
            Err(RustyRoomsError::ClientNotConnected(_))
        ));

        let (tx, _rx) = mpsc::unbounded_channel();
        hub.register("u1", tx).await;
        hub.join_room("u1", "r1").await.unwrap();
        assert_eq!(hub.room_client_count("r1").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let hub = Hub::new();
        hub.create_room_with_id("r1", config(0)).await.unwrap();
        assert!(hub.create_room_with_id("r1", config(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_room_clients() {
        let hub = Hub::new();
        hub.create_room_with_id("r1", config(0)).await.unwrap();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register("u1", tx1).await;
        hub.register("u2", tx2).await;
        hub.join_room("u1", "r1").await.unwrap();

        assert_eq!(hub.broadcast_to_room("r1", "hello").await, 1);
        assert_eq!(rx1.recv().await.unwrap().to_str().unwrap(), "hello");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_room_evicts_clients() {
        let hub = Hub::new();
        hub.create_room_with_id("r1", config(0)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.register("u1", tx).await;
        hub.join_room("u1", "r1").await.unwrap();

        hub.close_room("r1").await;
        assert_eq!(hub.room_client_count("r1").await, 0);
        assert!(matches!(
            hub.join_room("u1", "r1").await,
            Err(RustyRoomsError::HubRoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_hub_enforces_max_clients() {
        let hub = Hub::new();
        hub.create_room_with_id("r1", config(1)).await.unwrap();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        hub.register("u1", tx1).await;
        hub.register("u2", tx2).await;
        hub.join_room("u1", "r1").await.unwrap();
        // Rejoining is idempotent
        hub.join_room("u1", "r1").await.unwrap();
        assert_eq!(hub.join_room("u2", "r1").await, Err(RustyRoomsError::RoomFull));
    }

    #[tokio::test]
    async fn test_superseded_registration_does_not_unregister() {
        let hub = Hub::new();
        hub.create_room_with_id("r1", config(0)).await.unwrap();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let first = hub.register("u1", tx1).await;
        assert!(first.inherited_rooms.is_empty());
        hub.join_room("u1", "r1").await.unwrap();
        let second = hub.register("u1", tx2).await;
        assert_eq!(second.inherited_rooms, vec!["r1".to_string()]);

        assert!(!hub.unregister(&first).await);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.room_client_count("r1").await, 1);

        assert!(hub.unregister(&second).await);
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.room_client_count("r1").await, 0);
    }
}
