use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::constants::{LOBBY_ROOM_ID, LOBBY_ROOM_NAME};

/// Lobby is unique and permanent; game rooms are admin-managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Lobby,
    Game,
}

/// A user's participation record within one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

/// Room metadata as held by the registry
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    pub name: String,
    /// Absent for the lobby
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 0 means unlimited
    pub max_occupancy: usize,
    pub is_active: bool,
    pub members: HashMap<String, Member>,
    /// Authorized but not yet joined
    pub invitees: HashSet<String>,
}

impl Room {
    /// Creates the lobby record
    pub fn lobby() -> Self {
        Self {
            id: LOBBY_ROOM_ID.to_string(),
            kind: RoomKind::Lobby,
            name: LOBBY_ROOM_NAME.to_string(),
            created_by: None,
            created_at: Utc::now(),
            max_occupancy: 0,
            is_active: true,
            members: HashMap::new(),
            invitees: HashSet::new(),
        }
    }

    /// Creates a game room with a freshly generated id
    pub fn game(name: String, created_by: String, max_occupancy: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: RoomKind::Game,
            name,
            created_by: Some(created_by),
            created_at: Utc::now(),
            max_occupancy,
            is_active: true,
            members: HashMap::new(),
            invitees: HashSet::new(),
        }
    }

    pub fn is_lobby(&self) -> bool {
        self.kind == RoomKind::Lobby
    }

    /// True when `occupancy` leaves no room for another client
    pub fn is_full(&self, occupancy: usize) -> bool {
        self.max_occupancy > 0 && occupancy >= self.max_occupancy
    }

    pub fn add_member(&mut self, user_id: &str, username: &str) {
        self.members.insert(
            user_id.to_string(),
            Member {
                user_id: user_id.to_string(),
                username: username.to_string(),
                joined_at: Utc::now(),
            },
        );
    }

    pub fn remove_member(&mut self, user_id: &str) -> Option<Member> {
        self.members.remove(user_id)
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.contains_key(user_id)
    }

    /// Display name of a member, falling back to the raw user id
    pub fn display_name_of(&self, user_id: &str) -> String {
        self.members
            .get(user_id)
            .map(|m| m.username.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    pub fn invite<I>(&mut self, user_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.invitees.extend(user_ids);
    }

    /// Invitation gate applied when room authorization is enabled
    pub fn admits(&self, user_id: &str) -> bool {
        self.is_lobby()
            || self.invitees.contains(user_id)
            || self.created_by.as_deref() == Some(user_id)
    }

    /// Snapshot for callers, with occupancy read from the multiplexer
    pub fn info(&self, player_count: usize) -> RoomInfo {
        let mut users: Vec<Member> = self.members.values().cloned().collect();
        users.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        let mut allowed_users: Vec<String> = self.invitees.iter().cloned().collect();
        allowed_users.sort();

        RoomInfo {
            id: self.id.clone(),
            kind: self.kind,
            name: self.name.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            player_count,
            max_players: self.max_occupancy,
            is_active: self.is_active,
            users,
            allowed_users,
        }
    }
}

/// Room information as returned to callers and sent on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub player_count: usize,
    pub max_players: usize,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_users: Vec<String>,
}
