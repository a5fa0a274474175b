// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const API_PREFIX: &str = "api";
pub const WS_PATH: &str = "ws";

// Lobby is the only room with a fixed identifier
pub const LOBBY_ROOM_ID: &str = "lobby";
pub const LOBBY_ROOM_NAME: &str = "Public Lobby";

// Defaults for rooms created through the in-band protocol
pub const DEFAULT_GAME_ROOM_NAME: &str = "Game Room";
pub const DEFAULT_GAME_ROOM_CAPACITY: usize = 10;

// Token lifetimes (hours)
pub const DEFAULT_ACCESS_TOKEN_HOURS: i64 = 24;
pub const DEFAULT_REFRESH_TOKEN_HOURS: i64 = 168;

pub const DEFAULT_REVOCATION_CLEANUP_SECS: u64 = 3600;

// Inbound frames larger than this are rejected before parsing
pub const MAX_INBOUND_FRAME_SIZE: usize = 8192;
