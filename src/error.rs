use std::error::Error;
use std::fmt;

use warp::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RustyRoomsError {
    // Room errors
    RoomNotFound,
    RoomInactive,
    RoomFull,
    RoomAlreadyClosed,
    CannotCloseLobby,
    NotInvited,
    NotRoomMember,

    // Multiplexer errors
    HubCreateFailed(String),
    HubRoomNotFound(String),
    ClientNotConnected(String),

    // Messages errors
    MessageParseError(String),
    MessageTooLarge(usize),

    // Validation errors
    ValidationError(String),

    // Auth errors
    AuthError(String),
    TokenExpired,
    TokenRevoked,
    Unauthorized,
    Forbidden,

    // System errors
    SystemError(String),

    // Configuration errors
    ConfigError(String),
}

/// Coarse classification used to pick HTTP statuses and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Unauthorized,
    Forbidden,
    Internal,
}

impl RustyRoomsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound => ErrorKind::NotFound,
            Self::RoomInactive
            | Self::RoomFull
            | Self::RoomAlreadyClosed
            | Self::CannotCloseLobby
            | Self::NotInvited => ErrorKind::Conflict,
            Self::NotRoomMember => ErrorKind::Forbidden,
            Self::MessageParseError(_) | Self::MessageTooLarge(_) | Self::ValidationError(_) => {
                ErrorKind::BadRequest
            }
            Self::AuthError(_) | Self::TokenExpired | Self::TokenRevoked | Self::Unauthorized => {
                ErrorKind::Unauthorized
            }
            Self::Forbidden => ErrorKind::Forbidden,
            Self::HubCreateFailed(_)
            | Self::HubRoomNotFound(_)
            | Self::ClientNotConnected(_)
            | Self::SystemError(_)
            | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RustyRoomsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::RoomInactive => write!(f, "Room is not active"),
            Self::RoomFull => write!(f, "Room is full"),
            Self::RoomAlreadyClosed => write!(f, "Room already closed"),
            Self::CannotCloseLobby => write!(f, "Cannot close lobby room"),
            Self::NotInvited => write!(f, "Not invited to this room"),
            Self::NotRoomMember => write!(f, "Not a member of this room"),
            Self::HubCreateFailed(msg) => write!(f, "Failed to create room in hub: {}", msg),
            Self::HubRoomNotFound(id) => write!(f, "Hub room not found: {}", id),
            Self::ClientNotConnected(id) => write!(f, "Client not connected: {}", id),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::TokenExpired => write!(f, "Token has expired"),
            Self::TokenRevoked => write!(f, "Token has been revoked"),
            Self::Unauthorized => write!(f, "Unauthorized access"),
            Self::Forbidden => write!(f, "Admin access required"),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RustyRoomsError {}

impl warp::reject::Reject for RustyRoomsError {}

impl From<serde_json::Error> for RustyRoomsError {
    fn from(err: serde_json::Error) -> Self {
        RustyRoomsError::MessageParseError(err.to_string())
    }
}

// Generic result type for RustyRooms
pub type Result<T> = std::result::Result<T, RustyRoomsError>;
