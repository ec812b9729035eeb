//! Image intake for post images and profile pictures.
//!
//! Uploads are staged in memory while the rest of the multipart form is
//! validated, and only written to disk once the owning row is about to be
//! persisted. Stored files are named `<unix-millis>-<uuid>.<ext>` and served
//! under [`UPLOADS_URL_PREFIX`].

use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::AppError;

/// Per-file ceiling.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Request body ceiling for multipart routes: one image plus form fields.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

const FALLBACK_EXTENSION: &str = "img";

/// A validated image that has not been written yet.
#[derive(Debug)]
pub struct StagedImage {
    bytes: Vec<u8>,
    extension: String,
}

impl StagedImage {
    pub fn new(bytes: Vec<u8>, content_type: &str, file_name: Option<&str>) -> Result<Self, AppError> {
        check_content_type(content_type)?;
        check_size(bytes.len())?;
        Ok(Self {
            bytes,
            extension: extension_for(file_name, content_type),
        })
    }

    /// Writes the image under `dir` and returns its public URL path.
    pub async fn store(self, dir: &Path) -> Result<String, AppError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!("Failed to create upload dir {}: {:?}", dir.display(), e);
            AppError::InternalServerError
        })?;

        let name = unique_name(&self.extension);
        let path = dir.join(&name);
        tokio::fs::write(&path, &self.bytes).await.map_err(|e| {
            tracing::error!("Failed to write upload {}: {:?}", path.display(), e);
            AppError::InternalServerError
        })?;

        tracing::debug!(bytes = self.bytes.len(), "stored upload {}", name);
        Ok(format!("{}/{}", UPLOADS_URL_PREFIX, name))
    }
}

/// Reads a file field into a [`StagedImage`].
///
/// Returns `Ok(None)` for an empty file input (no file chosen).
pub async fn accept_image(mut field: Field<'_>) -> Result<Option<StagedImage>, AppError> {
    let file_name = field.file_name().map(str::to_owned);
    if file_name.as_deref().map_or(true, str::is_empty) {
        while field.chunk().await.map_err(multipart_error)?.is_some() {}
        return Ok(None);
    }

    let content_type = field.content_type().unwrap_or_default().to_owned();
    check_content_type(&content_type)?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        check_size(bytes.len() + chunk.len())?;
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Ok(None);
    }

    StagedImage::new(bytes, &content_type, file_name.as_deref()).map(Some)
}

/// Reads a text field of a multipart form.
pub async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

/// Drains a field the form handler does not use.
pub async fn skip(field: Field<'_>) -> Result<(), AppError> {
    field.bytes().await.map_err(multipart_error)?;
    Ok(())
}

pub fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("File too large (max 5MB)".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn check_content_type(content_type: &str) -> Result<(), AppError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(AppError::BadRequest("Only image files are allowed".to_string()))
    }
}

fn check_size(len: usize) -> Result<(), AppError> {
    if len > MAX_IMAGE_BYTES {
        Err(AppError::BadRequest("File too large (max 5MB)".to_string()))
    } else {
        Ok(())
    }
}

fn extension_for(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn unique_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}
