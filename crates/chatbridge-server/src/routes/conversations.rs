//! Conversation log routes — observational only.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/{id}", get(get_conversation))
}

async fn list_conversations(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let conversations = state.hub.log().list();
    Json(serde_json::json!({
        "total": conversations.len(),
        "conversations": conversations,
    }))
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.hub.log().get(&id) {
        Some(conversation) => Json(conversation).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("Conversation not found: {}", id),
            })),
        )
            .into_response(),
    }
}
