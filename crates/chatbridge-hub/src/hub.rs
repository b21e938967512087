//! Relay hub — peer connection registry, call correlation, dispatch, and
//! inbound routing behind one owning component.
//!
//! Registry and correlation-table mutations go through locks held only for
//! the mutation itself, never across an await. Every resolution path funnels
//! through remove-under-lock-then-wake, so exactly one path fires per call:
//! whichever of {reply, error, timeout, disconnect} removes the entry first
//! wins, and the others find nothing to do.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use chatbridge_core::{Error, Result};
use chatbridge_protocol::{HubMessage, OutboundCall, PeerMessage, RelayReply};

use crate::log::{ConversationLog, Exchange};

/// Outbound channel feeding a peer's writer task.
pub type PeerSender = mpsc::UnboundedSender<HubMessage>;

/// A live peer connection tracked by the registry.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    pub id: String,
    pub connected_at: String,
    tx: PeerSender,
}

impl PeerHandle {
    /// Whether the connection can still accept outbound messages.
    pub fn is_writable(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a message for the peer's writer task.
    pub fn send(&self, msg: HubMessage) -> Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| Error::PeerDisconnected("connection closed mid-send".into()))
    }
}

/// Listing entry for an attached peer.
#[derive(Debug, Clone, Serialize)]
pub struct PeerSummary {
    pub id: String,
    #[serde(rename = "connectedAt")]
    pub connected_at: String,
}

/// Bookkeeping for one in-flight call awaiting its correlated reply.
struct PendingCall {
    peer_id: String,
    reply: oneshot::Sender<Result<String>>,
    timer: AbortHandle,
}

/// Identifiers assigned while dispatching a call, plus the receiver the
/// caller suspends on.
struct DispatchedCall {
    request_id: String,
    conversation_id: String,
    peer_id: String,
    rx: oneshot::Receiver<Result<String>>,
}

struct HubInner {
    peers: RwLock<HashMap<String, PeerHandle>>,
    pending: Mutex<HashMap<String, PendingCall>>,
    log: ConversationLog,
    request_timeout: Duration,
}

/// Central relay hub: connection registry, correlation table, dispatcher,
/// inbound router, and conversation log. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    pub fn new(request_timeout: Duration, max_conversations: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                peers: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                log: ConversationLog::new(max_conversations),
                request_timeout,
            }),
        }
    }

    /// The observational conversation record.
    pub fn log(&self) -> &ConversationLog {
        &self.inner.log
    }

    // ---------------------------------------------------------------
    // Connection registry
    // ---------------------------------------------------------------

    /// Record a new peer connection and greet it with its assigned
    /// identifier. Returns the identifier.
    pub fn attach(&self, tx: PeerSender) -> String {
        let peer = PeerHandle {
            id: uuid::Uuid::new_v4().to_string(),
            connected_at: chrono::Utc::now().to_rfc3339(),
            tx,
        };
        let peer_id = peer.id.clone();

        // Greeting goes into the outbound queue before the peer becomes
        // pickable, so it is always the first frame the peer sees.
        let _ = peer.send(HubMessage::ConnectionEstablished {
            peer_id: peer_id.clone(),
            timestamp: peer.connected_at.clone(),
        });
        self.inner.peers.write().insert(peer_id.clone(), peer);

        info!("Peer {} attached", peer_id);
        peer_id
    }

    /// Remove a peer connection and release every call still waiting on it.
    /// Idempotent: detaching an unknown identifier is a no-op.
    pub fn detach(&self, peer_id: &str) {
        let removed = self.inner.peers.write().remove(peer_id);
        if removed.is_some() {
            let cancelled = self.cancel_all_for(peer_id, "peer disconnected");
            info!("Peer {} detached ({} pending calls released)", peer_id, cancelled);
        }
    }

    /// Resolve a target connection: the named peer only if writable, or the
    /// first writable peer when no name is given. No fairness guarantee.
    pub fn pick(&self, peer_id: Option<&str>) -> Result<PeerHandle> {
        let peers = self.inner.peers.read();
        let found = match peer_id {
            Some(id) => peers.get(id).filter(|p| p.is_writable()).cloned(),
            None => peers.values().find(|p| p.is_writable()).cloned(),
        };
        found.ok_or_else(|| Error::NoPeerAvailable {
            attached: peers.values().filter(|p| !p.is_writable()).count(),
        })
    }

    /// Number of attached peers.
    pub fn peer_count(&self) -> usize {
        self.inner.peers.read().len()
    }

    /// Summaries of attached peers.
    pub fn list_peers(&self) -> Vec<PeerSummary> {
        let mut peers: Vec<PeerSummary> = self
            .inner
            .peers
            .read()
            .values()
            .map(|p| PeerSummary {
                id: p.id.clone(),
                connected_at: p.connected_at.clone(),
            })
            .collect();
        peers.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));
        peers
    }

    // ---------------------------------------------------------------
    // Correlation table
    // ---------------------------------------------------------------

    /// Create a pending call and start its cancellation timer. The returned
    /// receiver resolves with exactly one outcome.
    pub fn register(
        &self,
        request_id: &str,
        peer_id: &str,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<Result<String>>> {
        let mut pending = self.inner.pending.lock();
        if pending.contains_key(request_id) {
            return Err(Error::DuplicateRequestId(request_id.to_string()));
        }

        let (tx, rx) = oneshot::channel();

        // The timer lives in the hub, not at the caller's await point, so a
        // caller whose future is dropped mid-wait still cannot leak the
        // table entry.
        let hub = self.clone();
        let timer_id = request_id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            hub.expire(&timer_id, timeout);
        })
        .abort_handle();

        pending.insert(
            request_id.to_string(),
            PendingCall {
                peer_id: peer_id.to_string(),
                reply: tx,
                timer,
            },
        );

        Ok(rx)
    }

    /// Wake a suspended caller with a successful payload. Unmatched
    /// identifiers (late or duplicate replies) are a logged no-op.
    pub fn resolve_success(&self, request_id: &str, payload: String) {
        match self.take(request_id) {
            Some(call) => {
                call.timer.abort();
                let _ = call.reply.send(Ok(payload));
                debug!("Request {} resolved", request_id);
            }
            None => warn!("Unmatched reply for request {} (late or duplicate)", request_id),
        }
    }

    /// Wake a suspended caller with an agent-reported failure.
    pub fn resolve_error(&self, request_id: &str, error: String) {
        match self.take(request_id) {
            Some(call) => {
                call.timer.abort();
                let _ = call.reply.send(Err(Error::Agent(error)));
                debug!("Request {} resolved with agent error", request_id);
            }
            None => warn!("Unmatched error reply for request {} (late or duplicate)", request_id),
        }
    }

    /// Release every pending call owned by a peer. Returns how many were
    /// released.
    pub fn cancel_all_for(&self, peer_id: &str, reason: &str) -> usize {
        let removed: Vec<(String, PendingCall)> = {
            let mut pending = self.inner.pending.lock();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, call)| call.peer_id == peer_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|call| (id, call)))
                .collect()
        };

        let count = removed.len();
        for (request_id, call) in removed {
            call.timer.abort();
            let _ = call.reply.send(Err(Error::PeerDisconnected(reason.to_string())));
            debug!("Request {} released: {}", request_id, reason);
        }
        count
    }

    /// Timeout path, run by the call's timer task.
    fn expire(&self, request_id: &str, timeout: Duration) {
        if let Some(call) = self.take(request_id) {
            let _ = call.reply.send(Err(Error::RequestTimeout(timeout)));
            warn!("Request {} timed out after {}s", request_id, timeout.as_secs());
        }
    }

    fn take(&self, request_id: &str) -> Option<PendingCall> {
        self.inner.pending.lock().remove(request_id)
    }

    /// Number of in-flight calls.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    // ---------------------------------------------------------------
    // Outbound dispatch
    // ---------------------------------------------------------------

    /// Pick a peer, register the pending call, and write the wire message.
    /// Nothing is registered when no peer is available; a write failure
    /// unregisters immediately instead of waiting for the timeout.
    fn dispatch(&self, call: &OutboundCall) -> Result<DispatchedCall> {
        let peer = self.pick(call.peer_id.as_deref())?;

        let request_id = call
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let conversation_id = call
            .conversation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let rx = self.register(&request_id, &peer.id, self.inner.request_timeout)?;

        let message = HubMessage::ClientMessage {
            request_id: request_id.clone(),
            conversation_id: conversation_id.clone(),
            message: call.text.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        if let Err(err) = peer.send(message) {
            if let Some(pending) = self.take(&request_id) {
                pending.timer.abort();
            }
            return Err(err);
        }

        debug!("Request {} dispatched to peer {}", request_id, peer.id);

        Ok(DispatchedCall {
            request_id,
            conversation_id,
            peer_id: peer.id,
            rx,
        })
    }

    /// Relay a call end to end: dispatch, suspend until one resolution path
    /// fires, record the completed exchange, return the reply.
    pub async fn relay(&self, call: OutboundCall) -> Result<RelayReply> {
        let request_text = call.text.clone();
        let dispatched = self.dispatch(&call)?;

        let outcome = dispatched
            .rx
            .await
            .map_err(|_| Error::PeerDisconnected("reply channel dropped".into()))?;
        let reply_text = outcome?;

        self.inner.log.append(
            &dispatched.conversation_id,
            &dispatched.peer_id,
            Exchange {
                request: request_text,
                reply: reply_text.clone(),
                completed_at: chrono::Utc::now().to_rfc3339(),
            },
        );

        debug!(
            "Request {} completed (conversation {})",
            dispatched.request_id, dispatched.conversation_id
        );

        Ok(RelayReply {
            conversation_id: dispatched.conversation_id,
            text: reply_text,
        })
    }

    // ---------------------------------------------------------------
    // Inbound routing
    // ---------------------------------------------------------------

    /// Route one decoded message received from a peer connection.
    pub fn handle_peer_message(&self, peer_id: &str, msg: PeerMessage) {
        match msg {
            PeerMessage::AiResponse { request_id, response } => {
                self.resolve_success(&request_id, response);
            }
            PeerMessage::Error { request_id, error } => {
                self.resolve_error(&request_id, error);
            }
            PeerMessage::Ping => {
                let peers = self.inner.peers.read();
                if let Some(peer) = peers.get(peer_id) {
                    let _ = peer.send(HubMessage::Pong);
                }
            }
        }
    }

    /// Route a raw text frame. Malformed or unrecognized frames are dropped
    /// with a warning; they can never tear down the connection loop.
    pub fn handle_peer_frame(&self, peer_id: &str, raw: &str) {
        match serde_json::from_str::<PeerMessage>(raw) {
            Ok(msg) => self.handle_peer_message(peer_id, msg),
            Err(_) => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => {
                    let tag = value
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("<missing>");
                    warn!("Dropping unrecognized message type {:?} from peer {}", tag, peer_id);
                }
                Err(err) => {
                    warn!("Dropping malformed frame from peer {}: {}", peer_id, err);
                }
            },
        }
    }
}
