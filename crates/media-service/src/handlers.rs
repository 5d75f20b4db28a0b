//! API request handlers for the media upload service

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use visage_common::{ErrorBody, SuccessBody};

use crate::models::{extension_allowed, object_key};
use crate::storage::ObjectStore;

const UPLOAD_PATH: &str = "/upload";
const UPLOAD_MULTIPLE_PATH: &str = "/upload-multiple";

/// Shared application state
pub struct AppState {
    pub store: ObjectStore,
}

/// API error type carrying the shared error envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>, path: &str) -> Self {
        ApiError {
            status,
            body: ErrorBody::new(error, message, status.as_u16()).with_path(path),
        }
    }

    fn bad_request(message: impl Into<String>, path: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", message, path)
    }

    fn not_found(message: impl Into<String>, path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", message, path)
    }

    fn storage(err: anyhow::Error, path: &str) -> Self {
        error!("Storage operation failed: {:#}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage Error",
            err.to_string(),
            path,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Response data for a single upload
#[derive(Debug, Serialize)]
pub struct UploadData {
    pub user_id: String,
    pub url: String,
    pub key: String,
}

/// One successfully uploaded file within a batch
#[derive(Debug, Serialize)]
pub struct UploadedFileInfo {
    pub url: String,
    pub key: String,
    pub filename: String,
}

/// Response data for a batch upload
#[derive(Debug, Serialize)]
pub struct MultipleUploadData {
    pub user_id: String,
    pub total_files: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub files: Vec<UploadedFileInfo>,
    pub errors: Vec<String>,
}

/// Response data for a download lookup
#[derive(Debug, Serialize)]
pub struct DownloadData {
    pub url: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: i64,
}

/// Response data for a delete
#[derive(Debug, Serialize)]
pub struct DeleteData {
    pub key: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "media-service"
    }))
}

struct IncomingFile {
    filename: String,
    data: Bytes,
}

/// Pull `uid` and file parts out of a multipart body. `field_name` is the
/// part name files arrive under ("file" or "files").
async fn read_upload_form(
    multipart: &mut Multipart,
    field_name: &str,
    path: &str,
) -> Result<(String, Vec<IncomingFile>), ApiError> {
    let mut uid: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e), path))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "uid" {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Unreadable uid field: {}", e), path))?;
            uid = Some(value);
        } else if name == field_name {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Unreadable file field: {}", e), path)
            })?;
            files.push(IncomingFile { filename, data });
        }
    }

    let uid = uid
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing form field: uid", path))?;

    Ok((uid, files))
}

fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Upload one file and return its canonical retrieval URL
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessBody<UploadData>>), ApiError> {
    let (uid, mut files) = read_upload_form(&mut multipart, "file", UPLOAD_PATH).await?;

    let file = files
        .pop()
        .filter(|f| !f.data.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file provided", UPLOAD_PATH))?;

    if file.filename.is_empty() {
        return Err(ApiError::bad_request("No filename provided", UPLOAD_PATH));
    }

    if !extension_allowed(&file.filename) {
        return Err(ApiError::bad_request(
            format!("Unsupported file type: {}", file.filename),
            UPLOAD_PATH,
        ));
    }

    let key = object_key(&uid, &file.filename, Utc::now().timestamp_millis());
    let content_type = content_type_for(&file.filename);

    info!(
        "Uploading {} for user {} ({} bytes)",
        key,
        uid,
        file.data.len()
    );

    state
        .store
        .put(&key, file.data, &content_type)
        .await
        .map_err(|e| ApiError::storage(e, UPLOAD_PATH))?;

    let url = state.store.object_url(&key);

    Ok((
        StatusCode::CREATED,
        Json(
            SuccessBody::new(UploadData {
                user_id: uid,
                url,
                key,
            })
            .with_message("Upload successful"),
        ),
    ))
}

/// Upload several files, best-effort: one bad file does not fail the batch
pub async fn upload_multiple_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessBody<MultipleUploadData>>), ApiError> {
    let (uid, files) = read_upload_form(&mut multipart, "files", UPLOAD_MULTIPLE_PATH).await?;

    if files.is_empty() {
        return Err(ApiError::bad_request(
            "No files provided",
            UPLOAD_MULTIPLE_PATH,
        ));
    }

    let total_files = files.len();
    let mut uploaded = Vec::new();
    let mut errors = Vec::new();

    for file in files {
        if file.filename.is_empty() {
            errors.push("Empty filename in upload list".to_string());
            continue;
        }

        if file.data.is_empty() {
            errors.push(format!("Failed to upload {}: file is empty", file.filename));
            continue;
        }

        if !extension_allowed(&file.filename) {
            errors.push(format!(
                "Failed to upload {}: unsupported file type",
                file.filename
            ));
            continue;
        }

        let key = object_key(&uid, &file.filename, Utc::now().timestamp_millis());
        let content_type = content_type_for(&file.filename);

        match state.store.put(&key, file.data, &content_type).await {
            Ok(()) => {
                let url = state.store.object_url(&key);
                uploaded.push(UploadedFileInfo {
                    url,
                    key,
                    filename: file.filename,
                });
            }
            Err(e) => {
                error!("Batch upload failed for {}: {:#}", file.filename, e);
                errors.push(format!("Failed to upload {}: {}", file.filename, e));
            }
        }
    }

    let successful_uploads = uploaded.len();
    let failed_uploads = total_files - successful_uploads;
    let message = format!(
        "Upload completed: {} successful, {} failed",
        successful_uploads, failed_uploads
    );

    Ok((
        StatusCode::CREATED,
        Json(
            SuccessBody::new(MultipleUploadData {
                user_id: uid,
                total_files,
                successful_uploads,
                failed_uploads,
                files: uploaded,
                errors,
            })
            .with_message(message),
        ),
    ))
}

/// Resolve a stored object to its canonical retrieval URL
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SuccessBody<DownloadData>>, ApiError> {
    let path = format!("/download/{}", key);

    let info = state
        .store
        .stat(&key)
        .await
        .map_err(|e| ApiError::storage(e, &path))?
        .ok_or_else(|| ApiError::not_found(format!("File not found with key: {}", key), &path))?;

    let url = state.store.object_url(&key);

    Ok(Json(
        SuccessBody::new(DownloadData {
            url,
            key,
            content_type: info.content_type,
            size: info.size,
        })
        .with_message("File retrieved successfully"),
    ))
}

/// Delete a stored object
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SuccessBody<DeleteData>>, ApiError> {
    let path = format!("/delete/{}", key);

    state
        .store
        .stat(&key)
        .await
        .map_err(|e| ApiError::storage(e, &path))?
        .ok_or_else(|| ApiError::not_found(format!("File not found with key: {}", key), &path))?;

    state
        .store
        .delete(&key)
        .await
        .map_err(|e| ApiError::storage(e, &path))?;

    Ok(Json(
        SuccessBody::new(DeleteData { key }).with_message("File deleted successfully"),
    ))
}
