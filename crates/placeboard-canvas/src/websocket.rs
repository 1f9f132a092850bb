//! WebSocket Handler
//!
//! One task per connection. The task registers a session, answers inbound
//! frames through the [`MessageHandler`] and forwards broadcast frames
//! queued for its session.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handler::MessageHandler;
use crate::protocol::ServerMessage;
use crate::replace::ReplacePipeline;
use crate::session::SessionRegistry;
use crate::store::StateStore;

/// Default interval between server pings
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
/// Default silence after which a connection is considered dead
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 60;

/// Server-side liveness settings
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    /// How often the server pings
    pub ping_interval: Duration,
    /// Silence after which the connection is dropped
    pub timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_HEARTBEAT_TIMEOUT_SECS),
        }
    }
}

/// Shared state for the canvas endpoints
pub struct CanvasState {
    /// Connected sessions
    pub registry: Arc<SessionRegistry>,
    /// Aggregate counters and history
    pub store: Arc<StateStore>,
    /// Inbound frame dispatch
    pub handler: MessageHandler,
    /// Privileged replace path
    pub replace: Arc<ReplacePipeline>,
    /// Liveness settings
    pub heartbeat: Heartbeat,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl CanvasState {
    /// Create canvas state
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<StateStore>,
        handler: MessageHandler,
        replace: Arc<ReplacePipeline>,
    ) -> Self {
        Self {
            registry,
            store,
            handler,
            replace,
            heartbeat: Heartbeat::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Configure liveness settings
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Use a shutdown token owned by the server
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

/// WebSocket upgrade handler
pub async fn canvas_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<CanvasState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<CanvasState>) {
    let (session_id, mut outbound) = state.registry.open().await;
    let connections = state.registry.count().await;
    info!(session_id = %session_id, connections, "Client connected");

    let (mut sender, mut receiver) = socket.split();

    let mut ping_interval = tokio::time::interval(state.heartbeat.ping_interval);
    ping_interval.reset();
    let mut last_recv = tokio::time::Instant::now();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            last_recv = tokio::time::Instant::now();
                            if send_message(&mut sender, &ServerMessage::error("parse error")).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        last_recv = tokio::time::Instant::now();
                        let _ = sender.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_recv = tokio::time::Instant::now();
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                };

                last_recv = tokio::time::Instant::now();
                debug!(session_id = %session_id, text = %text, "Received message");
                if let Some(reply) = state.handler.handle_text(&text).await {
                    if send_message(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if last_recv.elapsed() > state.heartbeat.timeout {
                    info!(session_id = %session_id, "Heartbeat timeout, closing");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            _ = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.registry.unregister(session_id).await;
    info!(session_id = %session_id, "Client disconnected");
}

/// Send a server message
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), String> {
    let json = message.to_json().map_err(|e| e.to_string())?;
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
