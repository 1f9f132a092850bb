//! Canvas statistics endpoint

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use placeboard_canvas::{AggregateState, CanvasState};
use serde::Serialize;
use std::sync::Arc;

/// `GET /api/stats` body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Live WebSocket sessions
    pub connection_count: usize,
    #[serde(flatten)]
    pub state: AggregateState,
    /// Server time, Unix millis
    pub date: i64,
}

async fn get_stats(Extension(state): Extension<Arc<CanvasState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connection_count: state.registry.count().await,
        state: state.store.snapshot().await,
        date: Utc::now().timestamp_millis(),
    })
}

/// Create stats routes
pub fn stats_routes() -> Router {
    Router::new().route("/api/stats", get(get_stats))
}
