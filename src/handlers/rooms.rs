//! Room listing and administration endpoints under `/api/ws`

use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::auth::{AuthenticatedUser, SharedAuthenticator};
use crate::core::message::Envelope;
use crate::core::registry::SharedRoomRegistry;
use crate::error::RustyRoomsError;
use crate::handlers::auth::{require_admin, with_auth};
use crate::handlers::{api_ws, success};

// Request bodies are small JSON documents
const MAX_BODY_SIZE: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    /// 0 means unlimited
    #[serde(default)]
    pub max_players: usize,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub room_id: String,
    pub user_ids: Vec<String>,
}

fn with_registry(
    registry: SharedRoomRegistry,
) -> impl Filter<Extract = (SharedRoomRegistry,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

pub async fn list_rooms(
    _user: AuthenticatedUser,
    registry: SharedRoomRegistry,
) -> Result<impl Reply, Rejection> {
    let rooms = registry.get_all_rooms().await;
    let total = rooms.len();
    Ok(success(
        json!({ "rooms": rooms, "total": total }),
        "Rooms retrieved successfully",
    ))
}

pub async fn get_room(
    room_id: String,
    _user: AuthenticatedUser,
    registry: SharedRoomRegistry,
) -> Result<impl Reply, Rejection> {
    let room = registry
        .get_room(&room_id)
        .await
        .map_err(warp::reject::custom)?;
    Ok(success(
        json!({ "room": room }),
        "Room information retrieved successfully",
    ))
}

pub async fn create_room(
    admin: AuthenticatedUser,
    request: CreateRoomRequest,
    registry: SharedRoomRegistry,
) -> Result<impl Reply, Rejection> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(warp::reject::custom(RustyRoomsError::ValidationError(
            "Room name is required".to_string(),
        )));
    }

    let room = registry
        .create_room(name, &admin.user_id, request.max_players)
        .await
        .map_err(warp::reject::custom)?;
    registry.announce_room_created(room.clone()).await;

    Ok(success(json!({ "room": room }), "Room created successfully"))
}

pub async fn close_room(
    room_id: String,
    admin: AuthenticatedUser,
    registry: SharedRoomRegistry,
) -> Result<impl Reply, Rejection> {
    registry
        .close_room(&room_id)
        .await
        .map_err(warp::reject::custom)?;
    registry.announce_room_closed(&room_id).await;

    log::info!("Room {} closed by admin {}", room_id, admin.user_id);
    Ok(success(json!({ "room_id": room_id }), "Room closed successfully"))
}

pub async fn invite_users(
    admin: AuthenticatedUser,
    request: InviteRequest,
    registry: SharedRoomRegistry,
) -> Result<impl Reply, Rejection> {
    if request.room_id.is_empty() {
        return Err(warp::reject::custom(RustyRoomsError::ValidationError(
            "room_id is required".to_string(),
        )));
    }

    let room = registry
        .invite_users(&request.room_id, &request.user_ids)
        .await
        .map_err(warp::reject::custom)?;

    // Offline invitees keep the grant but miss the notice
    for user_id in &request.user_ids {
        if !registry.send_to_user(user_id, Envelope::invite(room.clone())).await {
            log::debug!("Invite for {} not delivered: user offline", user_id);
        }
    }

    log::info!(
        "Room invitations sent: room_id={} user_count={} by={}",
        request.room_id,
        request.user_ids.len(),
        admin.user_id
    );
    Ok(success(
        json!({ "invited_count": request.user_ids.len() }),
        "Invitations sent successfully",
    ))
}

/// `GET|POST /api/ws/rooms`, `GET|DELETE /api/ws/rooms/{id}`, `POST /api/ws/invite`
pub fn routes(
    registry: SharedRoomRegistry,
    authenticator: SharedAuthenticator,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let rooms = api_ws().and(warp::path("rooms"));

    let list = rooms
        .clone()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(authenticator.clone()))
        .and(with_registry(registry.clone()))
        .and_then(list_rooms);

    let get = rooms
        .clone()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(authenticator.clone()))
        .and(with_registry(registry.clone()))
        .and_then(get_room);

    let create = rooms
        .clone()
        .and(warp::path::end())
        .and(warp::post())
        .and(require_admin(authenticator.clone()))
        .and(json_body::<CreateRoomRequest>())
        .and(with_registry(registry.clone()))
        .and_then(create_room);

    let close = rooms
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(require_admin(authenticator.clone()))
        .and(with_registry(registry.clone()))
        .and_then(close_room);

    let invite = api_ws()
        .and(warp::path("invite"))
        .and(warp::path::end())
        .and(warp::post())
        .and(require_admin(authenticator))
        .and(json_body::<InviteRequest>())
        .and(with_registry(registry))
        .and_then(invite_users);

    list.or(get).or(create).or(close).or(invite)
}
