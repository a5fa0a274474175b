use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use warp::ws::{WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

use crate::auth::AuthenticatedUser;
use crate::constants::LOBBY_ROOM_ID;
use crate::core::message::Envelope;
use crate::core::session::Session;
use crate::handlers::auth::with_auth;
use crate::handlers::{api_ws, with_state, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Checks the requested room before the upgrade; the lobby when none is given
async fn resolve_room(
    query: ConnectQuery,
    user: AuthenticatedUser,
    state: AppState,
) -> Result<(String, AuthenticatedUser, AppState), Rejection> {
    let room_id = query
        .room_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| LOBBY_ROOM_ID.to_string());

    if let Err(e) = state.registry.get_room(&room_id).await {
        warn!("Connection from {} refused: room {} not found", user.user_id, room_id);
        return Err(warp::reject::custom(e));
    }
    Ok((room_id, user, state))
}

/// `GET /api/ws?room_id=..&token=..`: authenticate, check the room, upgrade
pub fn ws_route(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    api_ws()
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ConnectQuery>())
        .and(with_auth(state.authenticator.clone()))
        .and(with_state(state))
        .and_then(resolve_room)
        .untuple_one()
        .and(warp::ws())
        .map(|room_id: String, user: AuthenticatedUser, state: AppState, ws: Ws| {
            debug!("Upgrading connection for user {} into room {}", user.user_id, room_id);
            ws.on_upgrade(move |socket| handle_ws_client(socket, state, user, room_id))
        })
}

// Handle an upgraded WebSocket connection until it closes
pub async fn handle_ws_client(ws: WebSocket, state: AppState, user: AuthenticatedUser, room_id: String) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Forward queued frames to the socket; ends once the hub drops the sender
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Registration completes before the join, so the join notice reaches this client too
    let registration = state.hub.register(&user.user_id, tx).await;
    info!(
        "Client connected: user_id={} connection={} (total {})",
        user.user_id,
        registration.connection_id,
        state.hub.connection_count().await
    );

    let mut session = Session::new(user, registration);

    // Rooms held by a replaced connection of this user; its own cleanup is skipped
    for inherited in std::mem::take(&mut session.registration.inherited_rooms) {
        if inherited != room_id {
            info!("Releasing room {} held by replaced connection of user {}", inherited, session.user_id());
            state
                .registry
                .leave_room(&inherited, session.user_id(), session.display_name())
                .await;
        }
    }

    match state
        .registry
        .join_room(&room_id, session.user_id(), session.display_name())
        .await
    {
        Ok(()) => session.current_room = Some(room_id),
        Err(e) => {
            error!("Failed to auto-join room {} for user {}: {}", room_id, session.user_id(), e);
            state
                .registry
                .send_to_user(session.user_id(), Envelope::error(e.to_string()))
                .await;
        }
    }

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                // Only text frames carry protocol messages
                if let Ok(text) = msg.to_str() {
                    state.router.handle_message(&mut session, text).await;
                }
            }
            Err(e) => {
                warn!("WebSocket error for user {}: {}", session.user_id(), e);
                break;
            }
        }
    }

    // A newer connection for the same user owns the routing now
    if !state.hub.unregister(&session.registration).await {
        info!(
            "Connection {} of user {} superseded, skipping cleanup",
            session.registration.connection_id,
            session.user_id()
        );
        return;
    }

    if let Some(room_id) = session.current_room.take() {
        state
            .registry
            .leave_room(&room_id, session.user_id(), session.display_name())
            .await;
    }

    info!("Client disconnected: user_id={}", session.user_id());
}
