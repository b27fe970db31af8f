//! Image proxy routes: list recent images and upload a new one.

use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use metrics::counter;
use scope_media::{ImageDescriptor, UploadRequest};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::errors::{ApiError, UploadError};
use crate::metrics::UPLOADS_TOTAL;
use crate::server::AppState;

/// Multipart field carrying the file.
pub const UPLOAD_FIELD: &str = "image";

/// `GET /api/images`
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageDescriptor>>, ApiError> {
    let images = state
        .media
        .list_recent(state.config.image_list_limit)
        .await
        .map_err(UploadError::from)?;
    Ok(Json(images))
}

/// `POST /api/images/upload`
///
/// The file is spooled to a temporary file that is removed on every exit
/// path, then handed to the media store.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let result = handle_upload(&state, multipart).await;
    let outcome = match &result {
        Ok(_) => "stored",
        Err(UploadError::Media(_)) => "upstream_error",
        Err(_) => "rejected",
    };
    counter!(UPLOADS_TOTAL, "outcome" => outcome).increment(1);

    let image = result.map_err(|e| {
        warn!(error = %e, "image upload failed");
        ApiError::from(e)
    })?;
    info!(id = %image.id, "image uploaded");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Image uploaded successfully!",
            "image": image,
        })),
    ))
}

async fn handle_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageDescriptor, UploadError> {
    let mut multipart = multipart.map_err(|e| UploadError::Malformed(e.body_text()))?;
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(|e| map_multipart(&e, limit))? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_owned();
        if !content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage);
        }
        let original_filename = field.file_name().unwrap_or("upload").to_owned();

        let spool = spool_field(state, field, limit).await?;
        let request = UploadRequest {
            path: spool.path().to_path_buf(),
            original_filename,
            content_type,
        };
        let image = state.media.upload(&request).await?;
        if let Err(e) = spool.close() {
            warn!(error = %e, "failed to remove spooled upload");
        }
        return Ok(image);
    }
    Err(UploadError::NoFile)
}

/// Stream a field into a fresh temporary file, enforcing `limit`.
async fn spool_field(
    state: &AppState,
    mut field: Field<'_>,
    limit: usize,
) -> Result<NamedTempFile, UploadError> {
    let mut builder = tempfile::Builder::new();
    let _ = builder.prefix("scope-upload-");
    let spool = match &state.config.spool_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    let mut out = tokio::fs::File::from_std(spool.reopen()?);

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(|e| map_multipart(&e, limit))? {
        written += chunk.len();
        if written > limit {
            return Err(UploadError::TooLarge { limit });
        }
        out.write_all(&chunk).await?;
    }
    out.flush().await?;
    if written == 0 {
        return Err(UploadError::NoFile);
    }
    Ok(spool)
}

fn map_multipart(error: &MultipartError, limit: usize) -> UploadError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }
    } else {
        UploadError::Malformed(error.body_text())
    }
}
