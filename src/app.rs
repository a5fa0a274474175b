//! Wiring of the hub, registry, authenticator and routes from a config

use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Reply};

use crate::auth::{JwtAuthenticator, TokenManager};
use crate::config::ServerConfig;
use crate::core::hub::Hub;
use crate::core::registry::RoomRegistry;
use crate::handlers::{self, AppState};
use crate::storage::MemoryTokenRevocationStore;

pub struct App {
    pub state: AppState,
    pub token_manager: Arc<TokenManager>,
    pub revocations: Arc<MemoryTokenRevocationStore>,
}

impl App {
    /// Builds every component and creates the lobby's routing entry
    pub async fn build(config: &ServerConfig) -> Self {
        let hub = Arc::new(Hub::new());
        let registry = Arc::new(
            RoomRegistry::new(hub.clone()).with_room_auth(config.room_auth_enabled),
        );
        registry.start().await;

        let token_manager = Arc::new(TokenManager::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        ));
        let revocations = Arc::new(MemoryTokenRevocationStore::new());
        let authenticator = Arc::new(JwtAuthenticator::new(
            token_manager.clone(),
            revocations.clone(),
        ));

        let state = AppState::new(hub, registry, authenticator, config.default_room_capacity);

        Self {
            state,
            token_manager,
            revocations,
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        handlers::routes(self.state.clone())
    }
}
