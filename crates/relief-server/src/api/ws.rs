//! WebSocket streaming of drone change events.
//!
//! Best-effort, at-least-once fan-out: a lagged subscriber skips missed
//! snapshots and picks up from the next event. Per-drone event order is
//! preserved by the registry.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct StreamQuery {
    /// Only stream updates for this drone.
    drone_id: Option<String>,
}

/// Handler for WebSocket connections.
/// GET /v1/stream
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamQuery>,
) -> axum::response::Response {
    let drone_filter = params.drone_id.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, state, drone_filter))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, drone_filter: Option<String>) {
    let mut rx = state.registry.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(drone_id) = drone_filter.as_deref() {
                            if event.drone.id != drone_id {
                                continue;
                            }
                        }
                        let payload = json!({
                            "type": "drone",
                            "drone": event.drone,
                        });
                        if socket.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        // Drop missed updates; a newer snapshot will arrive soon.
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
