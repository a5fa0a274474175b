use crate::auth::AuthenticatedUser;
use crate::core::hub::Registration;

/// Per-connection state owned by the connection's read loop
#[derive(Debug, Clone)]
pub struct Session {
    pub user: AuthenticatedUser,
    pub registration: Registration,
    /// Last room the connection joined, left on disconnect
    pub current_room: Option<String>,
}

impl Session {
    pub fn new(user: AuthenticatedUser, registration: Registration) -> Self {
        Self {
            user,
            registration,
            current_room: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.user.display_name
    }

    pub fn is_in(&self, room_id: &str) -> bool {
        self.current_room.as_deref() == Some(room_id)
    }
}
