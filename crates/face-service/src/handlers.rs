//! API request handlers for the face verification service

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use visage_common::{ErrorBody, SuccessBody};

use crate::error::VerifyError;
use crate::models::VerificationVerdict;
use crate::verify::Verifier;

const VERIFY_PATH: &str = "/face/verify";
const UPLOAD_PATH: &str = "/face/upload";

/// Shared application state
pub struct AppState {
    pub verifier: Verifier,
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

    fn from_verify(err: VerifyError, path: &str) -> Self {
        match err {
            VerifyError::NotConfigured(user_id) => {
                info!("Verification requested for unconfigured user: {}", user_id);
                Self::new(
                    StatusCode::NOT_FOUND,
                    "Not Found",
                    "Face verification has not been set up for this user",
                    path,
                )
            }
            VerifyError::NoReferenceImages(user_id) => {
                info!("User {} has a row but no reference images", user_id);
                Self::new(
                    StatusCode::NOT_FOUND,
                    "Not Found",
                    format!("No face data found for user {}", user_id),
                    path,
                )
            }
            VerifyError::AllFetchesFailed { errors } => {
                error!("All reference downloads failed: {:?}", errors);
                let mut api_error = Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Processing Failed",
                    "Failed to download any face images for this user",
                    path,
                );
                api_error.body = api_error
                    .body
                    .with_validation_errors(serde_json::json!({ "download_errors": errors }));
                api_error
            }
            VerifyError::ScoringService(message) => {
                error!("Scoring service failure: {}", message);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Face Verification Failed",
                    message,
                    path,
                )
            }
            VerifyError::Store(e) => {
                error!("Reference store failure: {}", e);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    e.to_string(),
                    path,
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request to append reference image URLs for a user
#[derive(Debug, Deserialize)]
pub struct UploadReferencesRequest {
    pub url_list: Vec<String>,
}

/// Response data for an append call
#[derive(Debug, Serialize)]
pub struct UploadReferencesData {
    pub created: bool,
    pub user_id: String,
    pub total_images: usize,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "face-service"
    }))
}

/// Verify a probe image against a user's stored reference images
///
/// Multipart form: `uid` (user identifier) and `file` (probe image bytes).
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SuccessBody<VerificationVerdict>>, ApiError> {
    let mut uid: Option<String> = None;
    let mut probe: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e), VERIFY_PATH))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "uid" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Unreadable uid field: {}", e), VERIFY_PATH)
                })?;
                uid = Some(value);
            }
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Unreadable file field: {}", e), VERIFY_PATH)
                })?;
                probe = Some(bytes);
            }
            _ => {}
        }
    }

    let uid = uid
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing form field: uid", VERIFY_PATH))?;

    Uuid::parse_str(&uid)
        .map_err(|e| ApiError::bad_request(format!("Invalid UUID format: {}", e), VERIFY_PATH))?;

    let probe = probe
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file provided", VERIFY_PATH))?;

    info!("Verifying probe image for user: {}", uid);

    let verdict = state
        .verifier
        .verify(&uid, probe)
        .await
        .map_err(|e| ApiError::from_verify(e, VERIFY_PATH))?;

    Ok(Json(SuccessBody::new(verdict)))
}

/// Append reference image URLs for a user, creating the row if absent
pub async fn upload_references_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<UploadReferencesRequest>,
) -> Result<Json<SuccessBody<UploadReferencesData>>, ApiError> {
    Uuid::parse_str(&user_id)
        .map_err(|e| ApiError::bad_request(format!("Invalid UUID format: {}", e), UPLOAD_PATH))?;

    if payload.url_list.is_empty() {
        return Err(ApiError::bad_request(
            "url_list must not be empty",
            UPLOAD_PATH,
        ));
    }

    info!(
        "Appending {} reference URL(s) for user: {}",
        payload.url_list.len(),
        user_id
    );

    let outcome = state
        .verifier
        .append_references(&user_id, &payload.url_list)
        .await
        .map_err(|e| ApiError::from_verify(e, UPLOAD_PATH))?;

    let message = if outcome.created {
        "Created new user with images"
    } else {
        "Appended images to existing user"
    };

    Ok(Json(
        SuccessBody::new(UploadReferencesData {
            created: outcome.created,
            user_id,
            total_images: outcome.total_images,
        })
        .with_message(message),
    ))
}
