//! Placeboard Canvas - Shared Pixel Canvas
//!
//! This crate provides the canvas core of Placeboard:
//! - Palette: the closed set of allowed pixel colors
//! - Validator: PNG decoding, size and palette checks for replacement canvases
//! - Session: registry of live connections with broadcast fan-out
//! - Protocol: WebSocket client/server message types
//! - Handler: per-frame protocol dispatch
//! - Store: aggregate counters and map history with JSON snapshots
//! - Replace: the privileged canvas replacement pipeline
//! - WebSocket: axum connection handler
//! - Error: Error types for canvas operations
//!
//! ## Usage
//!
//! ```ignore
//! use placeboard_canvas::{
//!     canvas_ws_handler, CanvasState, CanvasValidator, MessageHandler,
//!     ReplacePipeline, SessionRegistry, StateStore,
//! };
//! use axum::{Router, routing::get};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SessionRegistry::new());
//! let store = Arc::new(StateStore::load_or_bootstrap("data.json").await?);
//! let validator = CanvasValidator::default();
//! let handler = MessageHandler::new(store.clone(), validator.size());
//! let replace = Arc::new(ReplacePipeline::new(validator, registry.clone(), store.clone(), "maps"));
//! let state = Arc::new(CanvasState::new(registry, store, handler, replace));
//!
//! let app: Router<()> = Router::new()
//!     .route("/api/ws", get(canvas_ws_handler))
//!     .with_state(state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod palette;
pub mod protocol;
pub mod replace;
pub mod session;
pub mod store;
pub mod validator;
pub mod websocket;

// Re-export main types
pub use error::{Error, Result};
pub use handler::{MessageHandler, PixelPlacement, MAX_COLOR_CODE};
pub use palette::{ColorValue, Palette, Rgb, PALETTE, PALETTE_SIZE};
pub use protocol::{ClientMessage, ServerMessage};
pub use replace::{ReplacePipeline, ReplaceRequest, UploadedImage, PNG_CONTENT_TYPE};
pub use session::{Session, SessionRegistry};
pub use store::{AggregateState, MapHistoryEntry, StateStore};
pub use validator::{CanvasSize, CanvasValidator, ValidatedImage};
pub use websocket::{canvas_ws_handler, CanvasState, Heartbeat};
