//! `WebSocket` handler for live tick summaries.
//!
//! Clients connect to `GET /ws/ticks` and receive a JSON-encoded
//! [`TickBroadcast`] each time `GET /next-iteration` completes a tick.
//! Every client holds its own [`broadcast::Receiver`], so all of them see
//! the same stream. A client that falls behind skips to the newest tick.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming tick summaries.
///
/// # Route
///
/// `GET /ws/ticks`
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Forward broadcasts to the socket until either side goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");
    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(tick) => {
                    if !send_tick(&mut socket, &tick).await {
                        debug!("WebSocket client disconnected (send failed)");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => {
                    debug!("Broadcast channel closed, shutting down WebSocket");
                    return;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("WebSocket client disconnected");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket error");
                    return;
                }
                // Clients have nothing to say.
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Send one summary as a text frame. Returns `false` once the socket is
/// gone; serialization failures are logged and skipped.
async fn send_tick(socket: &mut WebSocket, tick: &TickBroadcast) -> bool {
    match serde_json::to_string(tick) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(tick = tick.tick, error = %e, "Failed to serialize tick broadcast");
            true
        }
    }
}
