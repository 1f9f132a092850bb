//! Canvas replacement endpoint
//!
//! `POST /updateorders` takes a multipart form with `image`, `reason` and
//! `password`. The image is spooled to the uploads directory and handed to
//! the replace pipeline; the spooled file is removed whatever the outcome.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::Router;
use placeboard_canvas::{CanvasState, Error, ReplaceRequest, UploadedImage};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Directory uploads are spooled to before validation
#[derive(Debug, Clone)]
pub struct UploadSpool {
    dir: Arc<PathBuf>,
}

impl UploadSpool {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stream a form field into a fresh temp file; `None` if it was empty
    async fn spool(&self, mut field: Field<'_>) -> Result<Option<NamedTempFile>, OrdersError> {
        let temp = NamedTempFile::new_in(self.dir()).map_err(Error::from)?;
        let mut file = tokio::fs::File::from_std(temp.as_file().try_clone().map_err(Error::from)?);

        let mut written = 0usize;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await.map_err(Error::from)?;
            written += chunk.len();
        }
        file.flush().await.map_err(Error::from)?;

        debug!(bytes = written, path = %temp.path().display(), "Upload spooled");
        Ok((written > 0).then_some(temp))
    }
}

/// Failure of a replace request
#[derive(Debug)]
pub enum OrdersError {
    /// The multipart body itself could not be read
    Form(MultipartError),
    /// The pipeline refused or failed the request
    Canvas(Error),
}

impl From<MultipartError> for OrdersError {
    fn from(err: MultipartError) -> Self {
        Self::Form(err)
    }
}

impl From<Error> for OrdersError {
    fn from(err: Error) -> Self {
        Self::Canvas(err)
    }
}

impl IntoResponse for OrdersError {
    fn into_response(self) -> Response {
        match self {
            Self::Form(e) => {
                warn!(error = %e.body_text(), "Unreadable replace form");
                (e.status(), "Erreur dans le formulaire !").into_response()
            }
            Self::Canvas(e) => {
                let status = match &e {
                    Error::Unauthorized => StatusCode::UNAUTHORIZED,
                    Error::MissingImage
                    | Error::InvalidMessage(_)
                    | Error::MissingType
                    | Error::UnknownCommand(_) => StatusCode::BAD_REQUEST,
                    Error::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Error::Decode(_) | Error::Dimensions { .. } | Error::InvalidColor { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    Error::Storage(_) | Error::Serialization(_) | Error::Internal(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if status.is_server_error() {
                    warn!(code = e.code(), error = %e, "Replace request failed");
                } else {
                    info!(code = e.code(), error = %e, "Replace request rejected");
                }
                (status, e.user_message()).into_response()
            }
        }
    }
}

async fn read_form(
    spool: &UploadSpool,
    mut multipart: Multipart,
) -> Result<ReplaceRequest, OrdersError> {
    let mut request = ReplaceRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let content_type = field.content_type().map(str::to_owned);
                request.image = spool
                    .spool(field)
                    .await?
                    .map(|file| UploadedImage::new(file, content_type));
            }
            Some("reason") => request.reason = Some(field.text().await?),
            Some("password") => request.password = Some(SecretString::from(field.text().await?)),
            other => debug!(field = ?other, "Ignoring form field"),
        }
    }

    Ok(request)
}

async fn update_orders(
    Extension(state): Extension<Arc<CanvasState>>,
    Extension(spool): Extension<UploadSpool>,
    multipart: Multipart,
) -> Result<Redirect, OrdersError> {
    let request = read_form(&spool, multipart).await?;
    let entry = state.replace.submit(request).await?;
    info!(map = %entry.file, reason = %entry.reason, "New canvas accepted");
    Ok(Redirect::to("/"))
}

/// Create canvas replacement routes
pub fn orders_routes() -> Router {
    Router::new().route("/updateorders", post(update_orders))
}
