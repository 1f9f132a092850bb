//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all server components.

use super::background_tasks::start_snapshot_task;
use super::config::AppConfig;
use super::loader::load_config;
use super::shutdown::shutdown_signal;
use super::validation::validate_config;
use crate::api::UploadSpool;
use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, Extension, Router};
use placeboard_canvas::{
    CanvasState, CanvasValidator, MessageHandler, ReplacePipeline, SessionRegistry, StateStore,
};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Placeboard v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    validate_config(&config)?;

    for dir in [&config.storage.maps_dir, &config.storage.uploads_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let store = Arc::new(
        StateStore::load_or_bootstrap(&config.storage.data_file)
            .await
            .with_context(|| {
                format!(
                    "Failed to load canvas state from {}",
                    config.storage.data_file.display()
                )
            })?,
    );
    let current_map = store.current_map().await;
    let pixels_placed = store.pixels_placed().await;
    info!(current_map = %current_map, pixels_placed, "Canvas state loaded");

    let shutdown = CancellationToken::new();
    let state = build_canvas_state(&config, store.clone(), shutdown.clone());

    let snapshot_handle =
        start_snapshot_task(&store, config.storage.snapshot_interval(), shutdown.clone());

    let app = build_router(&config, state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    shutdown.cancel();

    let snapshot_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(snapshot_timeout, snapshot_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Snapshot task error: {}", e),
        Err(_) => warn!("Snapshot task shutdown timeout"),
    }

    info!("Placeboard shutdown complete");
    Ok(())
}

/// Wire registry, validator, handler and replace pipeline into one state
pub fn build_canvas_state(
    config: &AppConfig,
    store: Arc<StateStore>,
    shutdown: CancellationToken,
) -> Arc<CanvasState> {
    let registry = Arc::new(
        SessionRegistry::new().with_queue_capacity(config.websocket.session_queue_capacity),
    );
    let validator = CanvasValidator::new(config.canvas.size());
    let handler = MessageHandler::new(store.clone(), validator.size());

    let mut pipeline = ReplacePipeline::new(
        validator,
        registry.clone(),
        store.clone(),
        config.storage.maps_dir.clone(),
    );
    if let Some(password) = config.admin.password.clone() {
        pipeline = pipeline.with_secret(SecretString::from(password));
    }

    Arc::new(
        CanvasState::new(registry, store, handler, Arc::new(pipeline))
            .with_heartbeat(config.websocket.heartbeat())
            .with_shutdown(shutdown),
    )
}

/// Build the main router with all endpoints
pub fn build_router(config: &AppConfig, state: Arc<CanvasState>) -> Router {
    // Map images are embedded by third-party overlays
    let maps = Router::new()
        .nest_service("/maps", ServeDir::new(&config.storage.maps_dir))
        .layer(CorsLayer::new().allow_origin(Any));

    let static_files =
        ServeDir::new(&config.storage.static_dir).append_index_html_on_directories(true);

    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .merge(maps)
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(config.upload.max_bytes))
        .layer(Extension(UploadSpool::new(config.storage.uploads_dir.clone())))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
