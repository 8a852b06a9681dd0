//! Room endpoint
//!
//! Upgrades an authenticated request and hands the socket to a
//! [`Connection`].

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::Extensions;
use axum::response::{IntoResponse, Redirect, Response};

use crate::identity::Identity;
use crate::room::ConnectionId;
use crate::session::{Connection, ConnectionContext};

use super::listener::AppState;

/// GET on the room path
///
/// Expects the auth gate to have attached an [`Identity`].
pub async fn room_upgrade(
    State(state): State<AppState>,
    extensions: Extensions,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(identity) = extensions.get::<Identity>().cloned() else {
        return Redirect::temporary(&state.config.login_path).into_response();
    };
    let peer_addr = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let id = ConnectionId(state.next_connection_id.fetch_add(1, Ordering::Relaxed));
    let mut context = ConnectionContext::new(id, identity, state.config.avatar);
    if let Some(addr) = peer_addr {
        context = context.with_peer_addr(addr);
    }

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, context, state))
}

async fn handle_socket(socket: WebSocket, context: ConnectionContext, state: AppState) {
    let connection = Connection::new(context, state.room.clone());
    connection.run(socket).await;
}
