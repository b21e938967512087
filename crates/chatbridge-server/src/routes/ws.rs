//! Peer WebSocket endpoint — attach on upgrade, route inbound frames,
//! detach the instant the socket closes or errors.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_peer(socket, state))
}

/// Drive one peer connection: a writer task drains the outbound queue while
/// the reader loop feeds the hub until the socket goes away.
async fn handle_peer(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let peer_id = state.hub.attach(tx);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match serde_json::to_string(&msg) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!("Failed to encode outbound message: {}", err);
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => state.hub.handle_peer_frame(&peer_id, text.as_str()),
            Ok(Message::Close(_)) => break,
            // Binary and low-level ping/pong frames are not part of the
            // protocol; heartbeats ride as JSON text messages.
            Ok(_) => {}
            Err(err) => {
                debug!("Peer {} socket error: {}", peer_id, err);
                break;
            }
        }
    }

    state.hub.detach(&peer_id);
    writer.abort();
}
