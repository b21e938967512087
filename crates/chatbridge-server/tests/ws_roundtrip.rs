//! End-to-end relay tests — a real bound server, a fake extension peer over
//! WebSocket, and an HTTP caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use chatbridge_core::BridgeConfig;
use chatbridge_server::routes;
use chatbridge_server::state::AppState;

async fn spawn_server(config: BridgeConfig) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    let app = routes::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

fn test_config() -> BridgeConfig {
    BridgeConfig {
        request_timeout: Duration::from_secs(5),
        ..BridgeConfig::default()
    }
}

/// Connect a fake peer and consume the greeting frame.
async fn connect_peer(
    addr: SocketAddr,
) -> (
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    String,
) {
    let (mut socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    let frame = socket.next().await.unwrap().unwrap();
    let established: serde_json::Value =
        serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(established["type"], "CONNECTION_ESTABLISHED");
    let peer_id = established["peerId"].as_str().unwrap().to_string();

    (socket, peer_id)
}

#[tokio::test]
async fn test_relay_round_trip() {
    let (addr, state) = spawn_server(test_config()).await;
    let (mut socket, _peer_id) = connect_peer(addr).await;

    // Fake peer: answer the next dispatched call.
    let peer = tokio::spawn(async move {
        while let Some(Ok(frame)) = socket.next().await {
            let msg: serde_json::Value =
                serde_json::from_str(frame.to_text().unwrap()).unwrap();
            if msg["type"] == "CLIENT_MESSAGE" {
                assert_eq!(msg["message"], "ping");
                assert_eq!(msg["conversationId"], "c1");
                let reply = serde_json::json!({
                    "type": "AI_RESPONSE",
                    "requestId": msg["requestId"],
                    "response": "pong",
                });
                socket.send(Message::Text(reply.to_string())).await.unwrap();
                break;
            }
        }
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/message", addr))
        .json(&serde_json::json!({ "message": "ping", "conversationId": "c1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["conversationId"], "c1");
    assert_eq!(body["text"], "pong");

    peer.await.unwrap();

    // The exchange landed in the conversation log.
    let conversation = state.hub.log().get("c1").unwrap();
    assert_eq!(conversation.exchanges.len(), 1);
    assert_eq!(conversation.exchanges[0].request, "ping");
    assert_eq!(conversation.exchanges[0].reply, "pong");

    let response = client
        .get(format!("http://{}/api/conversations/c1", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], "c1");
    assert_eq!(body["exchanges"][0]["reply"], "pong");
}

#[tokio::test]
async fn test_completion_shape_round_trip() {
    let (addr, _state) = spawn_server(test_config()).await;
    let (mut socket, _peer_id) = connect_peer(addr).await;

    let peer = tokio::spawn(async move {
        while let Some(Ok(frame)) = socket.next().await {
            let msg: serde_json::Value =
                serde_json::from_str(frame.to_text().unwrap()).unwrap();
            if msg["type"] == "CLIENT_MESSAGE" {
                assert_eq!(msg["message"], "hi");
                let reply = serde_json::json!({
                    "type": "AI_RESPONSE",
                    "requestId": msg["requestId"],
                    "response": "hello there",
                });
                socket.send(Message::Text(reply.to_string())).await.unwrap();
                break;
            }
        }
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/v1/chat/completions", addr))
        .json(&serde_json::json!({
            "model": "anything",
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "hi"}]},
            ],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "hello there");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");

    peer.await.unwrap();
}

#[tokio::test]
async fn test_no_peer_returns_503() {
    let (addr, _state) = spawn_server(test_config()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/message", addr))
        .json(&serde_json::json!({ "message": "anyone?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "noPeerAvailable");
}

#[tokio::test]
async fn test_blank_message_returns_400() {
    let (addr, _state) = spawn_server(test_config()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/message", addr))
        .json(&serde_json::json!({ "message": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "emptyOrInvalidMessage");
}

#[tokio::test]
async fn test_silent_peer_returns_504() {
    let config = BridgeConfig {
        request_timeout: Duration::from_millis(300),
        ..BridgeConfig::default()
    };
    let (addr, state) = spawn_server(config).await;

    // Attached peer that never answers.
    let (_socket, _peer_id) = connect_peer(addr).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/message", addr))
        .json(&serde_json::json!({ "message": "hello?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 504);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "requestTimeout");
    assert_eq!(state.hub.pending_count(), 0);
}

#[tokio::test]
async fn test_peer_vanishing_mid_call_returns_502() {
    let (addr, state) = spawn_server(test_config()).await;
    let (mut socket, _peer_id) = connect_peer(addr).await;

    // Peer reads the dispatched call, then drops the connection instead of
    // answering.
    let peer = tokio::spawn(async move {
        while let Some(Ok(frame)) = socket.next().await {
            let msg: serde_json::Value =
                serde_json::from_str(frame.to_text().unwrap()).unwrap();
            if msg["type"] == "CLIENT_MESSAGE" {
                socket.close(None).await.unwrap();
                break;
            }
        }
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/message", addr))
        .json(&serde_json::json!({ "message": "going once" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "peerDisconnected");

    peer.await.unwrap();
    assert_eq!(state.hub.pending_count(), 0);
    assert_eq!(state.hub.peer_count(), 0);
}

#[tokio::test]
async fn test_status_reports_attached_peer() {
    let (addr, _state) = spawn_server(test_config()).await;
    let (_socket, peer_id) = connect_peer(addr).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/api/status", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["peersAttached"], 1);
    assert_eq!(body["pendingCalls"], 0);
    assert_eq!(body["peers"][0]["id"], peer_id);
}
