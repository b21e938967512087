//! Caller-facing message endpoints — both accepted request shapes relay
//! through the same normalize-then-dispatch path.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use chatbridge_core::{Error, Result};
use chatbridge_ingress::{normalize, RelayRequest};
use chatbridge_protocol::RelayReply;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/message", post(send_message))
}

/// The OpenRouter-compatible surface lives outside the `/api` nest so
/// completion-shape clients can point at the server unchanged.
pub fn completion_routes() -> Router<Arc<AppState>> {
    Router::new().route("/v1/chat/completions", post(chat_completions))
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RelayRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match relay(&state, request).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "conversationId": reply.conversation_id,
                "text": reply.text,
            })),
        ),
        Err(err) => error_response(err),
    }
}

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RelayRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match relay(&state, request).await {
        Ok(reply) => (StatusCode::OK, Json(completion_body(&reply))),
        Err(err) => error_response(err),
    }
}

async fn relay(state: &AppState, request: RelayRequest) -> Result<RelayReply> {
    let call = normalize(request)?;
    state.hub.relay(call).await
}

// ---------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------

fn completion_body(reply: &RelayReply) -> serde_json::Value {
    serde_json::json!({
        "id": format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": "chatbridge",
        "conversationId": reply.conversation_id,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": reply.text,
            },
            "finish_reason": "stop",
        }],
    })
}

/// Distinct status per failure kind so callers can tell transient
/// conditions (no peer yet) apart from definite ones (timed out).
fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        Error::NoPeerAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::PeerDisconnected(_) | Error::Agent(_) => StatusCode::BAD_GATEWAY,
        Error::EmptyOrInvalidMessage => StatusCode::BAD_REQUEST,
        Error::DuplicateRequestId(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({
            "error": err.to_string(),
            "kind": err.kind(),
        })),
    )
}
