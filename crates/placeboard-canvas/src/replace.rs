//! Canvas Replace Pipeline
//!
//! The privileged path that swaps the whole canvas: check the shared
//! secret, validate the uploaded PNG, store it under a fresh map id,
//! record it in the aggregate state and tell every session.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::protocol::ServerMessage;
use crate::session::SessionRegistry;
use crate::store::{MapHistoryEntry, StateStore};
use crate::validator::CanvasValidator;

/// The only accepted upload content type
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// An uploaded image spooled to a temporary file
///
/// The file is deleted when this value is dropped, whatever the outcome
/// of the request.
#[derive(Debug)]
pub struct UploadedImage {
    file: NamedTempFile,
    content_type: Option<String>,
}

impl UploadedImage {
    /// Wrap a spooled upload
    #[must_use]
    pub fn new(file: NamedTempFile, content_type: Option<String>) -> Self {
        Self { file, content_type }
    }

    /// Path of the spooled file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Content type declared by the client
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// A replace request as received from the form
#[derive(Debug, Default)]
pub struct ReplaceRequest {
    /// Spooled `image` part
    pub image: Option<UploadedImage>,
    /// `reason` field
    pub reason: Option<String>,
    /// `password` field
    pub password: Option<SecretString>,
}

/// Orchestrates validator, store and registry for a canvas replacement
pub struct ReplacePipeline {
    validator: CanvasValidator,
    registry: Arc<SessionRegistry>,
    store: Arc<StateStore>,
    maps_dir: PathBuf,
    secret: Option<SecretString>,
    /// Orders commits and remembers the last issued map timestamp
    commit: Mutex<i64>,
}

impl ReplacePipeline {
    /// Create a pipeline writing accepted maps into `maps_dir`
    #[must_use]
    pub fn new(
        validator: CanvasValidator,
        registry: Arc<SessionRegistry>,
        store: Arc<StateStore>,
        maps_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            validator,
            registry,
            store,
            maps_dir: maps_dir.into(),
            secret: None,
            commit: Mutex::new(0),
        }
    }

    /// Set the shared secret; without one every request is refused
    #[must_use]
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.secret = Some(secret).filter(|s| !s.expose_secret().is_empty());
        self
    }

    /// Whether a shared secret is configured
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Directory accepted maps are written to
    #[must_use]
    pub fn maps_dir(&self) -> &Path {
        &self.maps_dir
    }

    /// Run a replace request to completion
    pub async fn submit(&self, request: ReplaceRequest) -> Result<MapHistoryEntry> {
        let ReplaceRequest {
            image,
            reason,
            password,
        } = request;

        let reason = reason.filter(|r| !r.is_empty());

        let reason = match (reason, password) {
            (Some(reason), Some(password)) if self.secret_matches(&password) => reason,
            _ => {
                warn!("Replace request refused: bad credential or missing reason");
                return Err(Error::Unauthorized);
            }
        };

        let image = image.ok_or(Error::MissingImage)?;
        match image.content_type() {
            Some(PNG_CONTENT_TYPE) => {}
            other => {
                return Err(Error::UnsupportedFormat(
                    other.unwrap_or("unknown").to_string(),
                ))
            }
        }

        let bytes = tokio::fs::read(image.path()).await?;
        let validator = self.validator.clone();
        let validated = tokio::task::spawn_blocking(move || validator.validate(bytes))
            .await
            .map_err(|e| Error::internal(format!("validation task failed: {}", e)))??;

        let entry = {
            let mut last = self.commit.lock().await;
            let newest = self.store.latest_map_millis().await.max(*last);
            let millis = Utc::now().timestamp_millis().max(newest + 1);
            let file = format!("{}.png", millis);

            tokio::fs::create_dir_all(&self.maps_dir).await?;
            let mut out = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.maps_dir.join(&file))
                .await?;
            out.write_all(validated.bytes()).await?;
            out.flush().await?;
            drop(out);
            *last = millis;

            let entry = self.store.replace_map(file, reason).await;
            let message = ServerMessage::map(entry.file.clone(), Some(entry.reason.clone()));
            match self.registry.broadcast(&message).await {
                Ok(delivered) => {
                    info!(map = %entry.file, sessions = delivered, "Canvas replaced")
                }
                Err(e) => error!(map = %entry.file, error = %e, "Canvas replaced but broadcast failed"),
            }

            if let Err(e) = self.store.persist().await {
                error!(error = %e, "Failed to persist state after canvas replacement");
            }
            entry
        };

        drop(image);
        Ok(entry)
    }

    fn secret_matches(&self, candidate: &SecretString) -> bool {
        match &self.secret {
            Some(secret) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(candidate.expose_secret().as_bytes())
                .into(),
            None => false,
        }
    }
}
