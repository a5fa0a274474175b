//! Request handlers for the HTTP and WebSocket endpoints

pub mod auth;
pub mod rooms;
pub mod websocket;

use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::auth::SharedAuthenticator;
use crate::constants::{API_PREFIX, WS_PATH};
use crate::core::hub::SharedHub;
use crate::core::registry::SharedRoomRegistry;
use crate::core::router::MessageRouter;
use crate::error::RustyRoomsError;

// Re-export the websocket handler
pub use websocket::handle_ws_client;

/// Shared handles every endpoint needs
#[derive(Clone)]
pub struct AppState {
    pub hub: SharedHub,
    pub registry: SharedRoomRegistry,
    pub router: Arc<MessageRouter>,
    pub authenticator: SharedAuthenticator,
}

impl AppState {
    pub fn new(
        hub: SharedHub,
        registry: SharedRoomRegistry,
        authenticator: SharedAuthenticator,
        default_room_capacity: usize,
    ) -> Self {
        let router = Arc::new(MessageRouter::new(registry.clone(), default_room_capacity));
        Self {
            hub,
            registry,
            router,
            authenticator,
        }
    }
}

pub(crate) fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// `/api/ws` prefix
pub(crate) fn api_ws() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path(API_PREFIX).and(warp::path(WS_PATH))
}

/// JSON body shape shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn success<T: Serialize>(data: T, message: &str) -> warp::reply::Json {
    warp::reply::json(&ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
    })
}

fn failure(status: StatusCode, message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()> {
            success: false,
            message,
            data: None,
        }),
        status,
    )
}

/// Turns rejections into `{success: false, message}` bodies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<RustyRoomsError>() {
        if e.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {}", e);
        }
        (e.status_code(), e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid request".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        log::warn!("Unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Bad request".to_string())
    };

    Ok(failure(status, message))
}

/// Every route the server exposes, with JSON error bodies
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    websocket::ws_route(state.clone())
        .or(rooms::routes(state.registry.clone(), state.authenticator.clone()))
        .or(health)
        .recover(handle_rejection)
}
