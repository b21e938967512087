//! Status route — hub runtime counters for dashboards and health checks.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "peersAttached": state.hub.peer_count(),
        "pendingCalls": state.hub.pending_count(),
        "conversationsTracked": state.hub.log().len(),
        "peers": state.hub.list_peers(),
        "startedAt": state.started_at,
        "requestTimeoutSecs": state.config.request_timeout.as_secs(),
    }))
}
