//! Core room coordination: registry, routing and the connection multiplexer

pub mod connection;
pub mod hub;
pub mod message;
pub mod message_types;
pub mod registry;
pub mod room;
pub mod router;
pub mod session;

// Re-export main components for convenience
pub use connection::Connection;
pub use hub::{Hub, HubRoomConfig, Multiplexer, Registration, SharedHub};
pub use message::{Envelope, Payload};
pub use message_types::ClientMessage;
pub use registry::{RoomRegistry, SharedRoomRegistry};
pub use room::{Member, Room, RoomInfo, RoomKind};
pub use router::MessageRouter;
pub use session::Session;
