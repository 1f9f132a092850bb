//! WebSocket module for Placeboard
//!
//! Provides the real-time canvas endpoint:
//! - /api/ws - map updates, pixel placements and pings

use axum::{
    extract::{Extension, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use placeboard_canvas::CanvasState;
use std::sync::Arc;

/// Canvas WebSocket upgrade handler
///
/// Delegates to the placeboard-canvas handler with the shared state
/// installed as an extension by the server.
pub async fn canvas_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<CanvasState>>,
) -> impl IntoResponse {
    placeboard_canvas::canvas_ws_handler(ws, State(state)).await
}

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/api/ws", get(canvas_handler))
}
