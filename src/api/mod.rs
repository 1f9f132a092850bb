//! Web API module for Placeboard
//!
//! Provides HTTP endpoints for:
//! - Canvas statistics
//! - Privileged canvas replacement
//! - Health checks

pub mod health;
pub mod orders;
pub mod stats;

use axum::Router;

pub use health::health_routes;
pub use orders::{orders_routes, UploadSpool};
pub use stats::stats_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(stats_routes()).merge(orders_routes())
}
