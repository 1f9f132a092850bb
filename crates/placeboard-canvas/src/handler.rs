//! Message Handler
//!
//! Turns one inbound text frame into at most one reply for the same
//! connection. Nothing here ever broadcasts.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Error;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::StateStore;
use crate::validator::CanvasSize;

/// Highest color code accepted in a pixel placement
pub const MAX_COLOR_CODE: i64 = 32;

/// A pixel placement that passed the range checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPlacement {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Color code
    pub color: u8,
}

impl PixelPlacement {
    /// Accept a placement only if all three fields are present and in range
    #[must_use]
    pub fn check(
        x: Option<i64>,
        y: Option<i64>,
        color: Option<i64>,
        canvas: CanvasSize,
    ) -> Option<Self> {
        let (x, y, color) = (x?, y?, color?);
        if !canvas.contains(x, y) || !(0..=MAX_COLOR_CODE).contains(&color) {
            return None;
        }
        Some(Self {
            x: u32::try_from(x).ok()?,
            y: u32::try_from(y).ok()?,
            color: u8::try_from(color).ok()?,
        })
    }
}

/// Per-frame protocol dispatch
#[derive(Clone)]
pub struct MessageHandler {
    store: Arc<StateStore>,
    canvas: CanvasSize,
}

impl MessageHandler {
    /// Create a handler over the shared state store
    #[must_use]
    pub fn new(store: Arc<StateStore>, canvas: CanvasSize) -> Self {
        Self { store, canvas }
    }

    /// Handle one text frame; `None` means nothing is sent back
    pub async fn handle_text(&self, text: &str) -> Option<ServerMessage> {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(code = e.code(), error = %e, "Rejected inbound frame");
                return Some(ServerMessage::from(&e));
            }
        };

        self.dispatch(message).await
    }

    /// Handle an already parsed message
    pub async fn dispatch(&self, message: ClientMessage) -> Option<ServerMessage> {
        match message {
            ClientMessage::GetMap => {
                let current = self.store.current_map().await;
                Some(ServerMessage::map(current, None))
            }

            ClientMessage::Ping => Some(ServerMessage::Pong),

            ClientMessage::PlacePixel { x, y, color } => {
                match PixelPlacement::check(x, y, color, self.canvas) {
                    Some(pixel) => {
                        let total = self.store.record_pixel().await;
                        debug!(
                            x = pixel.x,
                            y = pixel.y,
                            color = pixel.color,
                            total = total,
                            "Pixel placed"
                        );
                    }
                    None => {
                        trace!(?x, ?y, ?color, "Ignored out of range pixel");
                    }
                }
                None
            }

            ClientMessage::Unknown(kind) => {
                let err = Error::UnknownCommand(kind);
                debug!(error = %err, "Rejected inbound frame");
                Some(ServerMessage::from(&err))
            }
        }
    }
}
