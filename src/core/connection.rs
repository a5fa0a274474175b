//! WebSocket connection handle held by the hub

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

/// Outbound side of a single WebSocket connection
pub struct Connection {
    pub id: String,
    pub user_id: String,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(user_id: String, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a text message through this connection
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.send(Message::text(text)) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to user {} (connection {})", self.user_id, self.id);
                false
            }
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_text_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new("u1".to_string(), tx);
        assert!(conn.send_text("hello"));
        drop(rx);
        assert!(!conn.send_text("hello again"));
    }
}
