use std::path::Path;

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use mime_guess::mime;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Public path prefix uploaded files are served from.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// An image received with a post, not yet written to disk.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// The image MIME type, from the file name or else the declared content type.
    fn mime(&self) -> Option<mime::Mime> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first());
        let from_header = || {
            self.content_type
                .as_deref()
                .and_then(|ct| ct.parse::<mime::Mime>().ok())
        };
        // SVG can carry script and uploads are served from the API origin.
        from_name
            .or_else(from_header)
            .filter(|m| m.type_() == mime::IMAGE && m.subtype() != mime::SVG)
    }

    fn extension(&self, mime: &mime::Mime) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase());
        from_name.or_else(|| {
            mime_guess::get_mime_extensions(mime)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
    }
}

/// Write an uploaded image under a fresh name and return its public path.
pub async fn store_image(dir: &Path, upload: ImageUpload) -> AppResult<String> {
    if upload.data.is_empty() {
        return Err(AppError::BadRequest("Uploaded image is empty".into()));
    }
    let mime = upload
        .mime()
        .ok_or_else(|| AppError::BadRequest("Uploaded file is not an image".into()))?;

    let file_name = match upload.extension(&mime) {
        Some(ext) => format!("{}.{}", uuid::Uuid::now_v7(), ext),
        None => uuid::Uuid::now_v7().to_string(),
    };

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&file_name), &upload.data).await?;

    tracing::info!("Stored upload {} ({} bytes)", file_name, upload.data.len());
    Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
}

/// Remove a stored upload by its public path. Failures are logged, not returned.
pub async fn discard(dir: &Path, public_path: &str) {
    let Some(name) = public_path
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| is_safe_file_name(name))
    else {
        tracing::warn!("Refusing to discard upload {}", public_path);
        return;
    };

    match tokio::fs::remove_file(dir.join(name)).await {
        Ok(()) => tracing::info!("Discarded upload {}", name),
        Err(e) => tracing::warn!("Failed to discard upload {}: {}", name, e),
    }
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// GET /uploads/{file}
pub async fn serve(
    State(state): State<AppState>,
    UrlPath(file): UrlPath<String>,
) -> AppResult<Response> {
    if !is_safe_file_name(&file) {
        return Err(AppError::NotFound("File not found".into()));
    }

    let data = match tokio::fs::read(state.config.uploads_path().join(&file)).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".into()))
        }
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        data,
    )
        .into_response())
}
