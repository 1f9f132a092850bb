//! Error types for placeboard-canvas
//!
//! One error type covers the three failure surfaces of the canvas:
//! inbound WebSocket frames, the privileged replace path and storage.

use thiserror::Error;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Inbound frame is not valid JSON
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Inbound frame has no string `type` field
    #[error("message has no type")]
    MissingType,

    /// Inbound frame carries a type the server does not know
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Shared secret or reason missing or wrong
    #[error("unauthorized replace request")]
    Unauthorized,

    /// Multipart upload without an image part
    #[error("no image was uploaded")]
    MissingImage,

    /// Declared content type is not PNG
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Bytes could not be decoded as a PNG image
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Image does not have the canvas dimensions
    #[error("image is {width}x{height}, expected {expected_width}x{expected_height}")]
    Dimensions {
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
        /// Canvas width
        expected_width: u32,
        /// Canvas height
        expected_height: u32,
    },

    /// A pixel uses a color outside the palette
    #[error("pixel {x}, {y} has a color outside the palette")]
    InvalidColor {
        /// Column of the first offending pixel
        x: u32,
        /// Row of the first offending pixel
        y: u32,
    },

    /// Filesystem error while reading or writing state
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid message error
    #[must_use]
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if the connection that produced this error may keep going
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidMessage(_) | Self::MissingType | Self::UnknownCommand(_)
        )
    }

    /// Check if the error was caused by the submitted canvas image itself
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Decode(_)
                | Self::Dimensions { .. }
                | Self::InvalidColor { .. }
        )
    }

    /// Get error code for logs and protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "parse_error",
            Self::MissingType => "missing_type",
            Self::UnknownCommand(_) => "unknown_command",
            Self::Unauthorized => "unauthorized",
            Self::MissingImage => "missing_image",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Decode(_) => "decode_error",
            Self::Dimensions { .. } => "dimension_error",
            Self::InvalidColor { .. } => "invalid_color",
            Self::Storage(_) => "storage_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Text sent back on the WebSocket for recoverable protocol errors
    #[must_use]
    pub fn protocol_text(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => "parse error",
            Self::MissingType => "missing type",
            Self::UnknownCommand(_) => "unknown command",
            _ => "internal error",
        }
    }

    /// Plain-text message shown to whoever submitted the replace form
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized | Self::MissingImage => "Erreur dans le formulaire !".to_string(),
            Self::UnsupportedFormat(_) => "L'image doit être un PNG !".to_string(),
            Self::Dimensions {
                expected_width,
                expected_height,
                ..
            } => format!(
                "L'image doit être de {}x{} !",
                expected_width, expected_height
            ),
            Self::InvalidColor { x, y } => {
                format!("Le pixel {}, {} comporte une couleur invalide.", x, y)
            }
            _ => "Une erreur est survenue !".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;
