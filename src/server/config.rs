//! Server configuration types
//!
//! Contains all configuration structures for the Placeboard server.

use placeboard_canvas::{validator, CanvasSize, Heartbeat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3987
}

/// Where state, maps and uploads live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Aggregate state snapshot
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// Accepted canvas images, served under /maps
    #[serde(default = "default_maps_dir")]
    pub maps_dir: PathBuf,
    /// Spool directory for uploads in flight
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Front-end assets served at the root
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            maps_dir: default_maps_dir(),
            uploads_dir: default_uploads_dir(),
            static_dir: default_static_dir(),
            snapshot_interval_secs: default_snapshot_interval(),
        }
    }
}

impl StorageConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs.max(1))
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_maps_dir() -> PathBuf {
    PathBuf::from("maps")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_snapshot_interval() -> u64 {
    120
}

/// Canvas dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }
}

fn default_canvas_width() -> u32 {
    validator::DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> u32 {
    validator::DEFAULT_CANVAS_HEIGHT
}

/// WebSocket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    /// Broadcast frames buffered per connection before dropping
    #[serde(default = "default_queue_capacity")]
    pub session_queue_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            session_queue_capacity: default_queue_capacity(),
        }
    }
}

impl WebSocketConfig {
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            timeout: Duration::from_secs(self.heartbeat_timeout_secs.max(1)),
        }
    }
}

fn default_ping_interval() -> u64 {
    placeboard_canvas::websocket::DEFAULT_PING_INTERVAL_SECS
}

fn default_heartbeat_timeout() -> u64 {
    placeboard_canvas::websocket::DEFAULT_HEARTBEAT_TIMEOUT_SECS
}

fn default_queue_capacity() -> usize {
    placeboard_canvas::session::DEFAULT_QUEUE_CAPACITY
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

/// Replace-canvas credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Shared secret for /updateorders; falls back to the PASSWORD env var
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
