//! Aggregate State Store
//!
//! Process-wide counters and map history, held in memory behind a single
//! lock and snapshotted to a JSON file. The snapshot keeps the historical
//! key names (`nbPixelsReplaced`, `currentMap`, `mapHistory`) so older data
//! files load unchanged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Map shown before any replacement was accepted
pub const BLANK_MAP: &str = "blank.png";
/// Reason recorded for the bootstrap entry
pub const BLANK_MAP_REASON: &str = "Feuille blanche";
/// Timestamp (Unix millis) recorded for the bootstrap entry
pub const BLANK_MAP_DATE: i64 = 1_648_890_843_309;

/// One accepted canvas image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapHistoryEntry {
    /// Map identifier (file name)
    pub file: String,
    /// Reason given by the operator
    pub reason: String,
    /// When the map was accepted, Unix millis
    pub date: i64,
}

/// Process-wide aggregate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    /// Total accepted pixel placements
    #[serde(rename = "nbPixelsReplaced")]
    pub pixels_placed: u64,
    /// Identifier of the current map
    #[serde(rename = "currentMap")]
    pub current_map: String,
    /// Every accepted map, oldest first
    #[serde(rename = "mapHistory")]
    pub map_history: Vec<MapHistoryEntry>,
}

impl AggregateState {
    /// State of a server that has never accepted a map
    #[must_use]
    pub fn bootstrap() -> Self {
        Self {
            pixels_placed: 0,
            current_map: BLANK_MAP.to_string(),
            map_history: vec![MapHistoryEntry {
                file: BLANK_MAP.to_string(),
                reason: BLANK_MAP_REASON.to_string(),
                date: BLANK_MAP_DATE,
            }],
        }
    }

    /// Check that the current map is the last history entry
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.map_history
            .last()
            .is_some_and(|entry| entry.file == self.current_map)
    }
}

impl Default for AggregateState {
    fn default() -> Self {
        Self::bootstrap()
    }
}

/// Owner of the aggregate state and its snapshot file
pub struct StateStore {
    state: RwLock<AggregateState>,
    path: PathBuf,
    /// Serialises snapshot writers
    persist_lock: Mutex<()>,
}

impl StateStore {
    /// Create a store with explicit initial state
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, state: AggregateState) -> Self {
        Self {
            state: RwLock::new(state),
            path: path.into(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Load the snapshot at `path`, or bootstrap if there is none
    ///
    /// A snapshot that exists but cannot be parsed is an error; it is never
    /// replaced silently.
    pub async fn load_or_bootstrap(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: AggregateState = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::storage(format!("corrupt snapshot {}: {}", path.display(), e))
                })?;
                info!(
                    path = %path.display(),
                    pixels_placed = state.pixels_placed,
                    current_map = %state.current_map,
                    "Aggregate state loaded"
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting from a blank canvas");
                AggregateState::bootstrap()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(path, state))
    }

    /// Snapshot file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> AggregateState {
        self.state.read().await.clone()
    }

    /// Identifier of the current map
    pub async fn current_map(&self) -> String {
        self.state.read().await.current_map.clone()
    }

    /// Total accepted pixel placements
    pub async fn pixels_placed(&self) -> u64 {
        self.state.read().await.pixels_placed
    }

    /// Newest timestamp used by any recorded map, taken from its date or
    /// from a `<millis>.png` file name
    pub async fn latest_map_millis(&self) -> i64 {
        let state = self.state.read().await;
        state
            .map_history
            .iter()
            .flat_map(|entry| {
                let from_name = entry
                    .file
                    .strip_suffix(".png")
                    .and_then(|stem| stem.parse::<i64>().ok());
                [Some(entry.date), from_name]
            })
            .flatten()
            .max()
            .unwrap_or(0)
    }

    /// Count one accepted pixel placement; returns the new total
    pub async fn record_pixel(&self) -> u64 {
        let mut state = self.state.write().await;
        state.pixels_placed = state.pixels_placed.saturating_add(1);
        state.pixels_placed
    }

    /// Make `file` the current map and append it to the history
    pub async fn replace_map(
        &self,
        file: impl Into<String>,
        reason: impl Into<String>,
    ) -> MapHistoryEntry {
        let entry = MapHistoryEntry {
            file: file.into(),
            reason: reason.into(),
            date: Utc::now().timestamp_millis(),
        };

        let mut state = self.state.write().await;
        state.current_map = entry.file.clone();
        state.map_history.push(entry.clone());
        entry
    }

    /// Write the full state to the snapshot file
    ///
    /// The file is replaced atomically through a sibling temp file.
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;

        let json = {
            let state = self.state.read().await;
            serde_json::to_vec(&*state)?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = json.len(), "Aggregate state persisted");
        Ok(())
    }
}
