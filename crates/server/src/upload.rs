use std::path::Path;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use encore_core::unix_now_ms;
use serde::Serialize;
use thiserror::Error;

use crate::state::AppState;

/// Successful uploads answer with the stored filename and a path relative to
/// the media root, ready to drop into a step's `url`/`value` field.
#[derive(Debug, Serialize)]
pub struct UploadReply {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file in upload request")]
    MissingFile,
    #[error("malformed multipart request: {0}")]
    Multipart(#[from] MultipartError),
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::MissingFile | UploadError::Multipart(_) => {
                (StatusCode::BAD_REQUEST, "No file.").into_response()
            }
            UploadError::Io(err) => {
                log::error!("upload failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Upload failed.").into_response()
            }
        }
    }
}

/// How a stored upload is named.
enum NamePolicy {
    /// Keep the client's filename. Re-uploading the same name overwrites.
    Original,
    /// `{field}-{unix_ms}{ext}`, so repeated image uploads never collide.
    Stamped,
}

pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadReply>, UploadError> {
    let reply = store_upload(
        multipart,
        &state.media_dir,
        "audio",
        "audioFile",
        NamePolicy::Original,
    )
    .await?;
    log::info!("uploaded audio: {}", reply.filename);
    Ok(Json(reply))
}

pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadReply>, UploadError> {
    let reply = store_upload(
        multipart,
        &state.media_dir,
        "videos",
        "videoFile",
        NamePolicy::Original,
    )
    .await?;
    log::info!("uploaded video: {}", reply.filename);
    Ok(Json(reply))
}

pub async fn upload_logo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadReply>, UploadError> {
    let reply = store_upload(
        multipart,
        &state.media_dir,
        "images",
        "logoFile",
        NamePolicy::Stamped,
    )
    .await?;
    log::info!("uploaded logo: {}", reply.filename);
    Ok(Json(reply))
}

pub async fn upload_start_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadReply>, UploadError> {
    let reply = store_upload(
        multipart,
        &state.media_dir,
        "images",
        "startImage",
        NamePolicy::Stamped,
    )
    .await?;
    log::info!("uploaded start image: {}", reply.filename);
    Ok(Json(reply))
}

/// Store the single expected file part under `{media_dir}/{subdir}/`.
async fn store_upload(
    mut multipart: Multipart,
    media_dir: &Path,
    subdir: &str,
    field: &str,
    policy: NamePolicy,
) -> Result<UploadReply, UploadError> {
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }

        // Strip any path components a client might smuggle in.
        let original = part
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or(UploadError::MissingFile)?;

        let data = part.bytes().await?;

        let filename = match policy {
            NamePolicy::Original => original,
            NamePolicy::Stamped => {
                let ext = Path::new(&original)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| format!(".{ext}"))
                    .unwrap_or_default();
                format!("{field}-{}{ext}", unix_now_ms())
            }
        };

        let dir = media_dir.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), &data).await?;

        return Ok(UploadReply {
            path: format!("{subdir}/{filename}"),
            filename,
        });
    }

    Err(UploadError::MissingFile)
}
