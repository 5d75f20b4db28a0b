//! JSON response envelopes shared by both services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured error response body.
///
/// `validationErrors` carries field- or item-level diagnostics, e.g. the
/// per-reference download failures behind a "processing failed" response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error type/category, e.g. "Not Found" or "Processing Failed"
    pub error: String,

    /// Human-readable detail
    pub message: String,

    /// HTTP status code mirrored into the body
    pub status: u16,

    /// When the error occurred
    pub timestamp: DateTime<Utc>,

    /// Request path where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Field- or item-specific diagnostics
    #[serde(rename = "validationErrors", skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status,
            timestamp: Utc::now(),
            path: None,
            validation_errors: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_validation_errors(mut self, errors: serde_json::Value) -> Self {
        self.validation_errors = Some(errors);
        self
    }
}

/// Successful response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessBody<T> {
    /// Always `true`; lets callers branch without inspecting the status code
    pub success: bool,

    /// Handler payload
    pub data: T,

    /// Optional human-readable note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> SuccessBody<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_empty_optionals() {
        let body = ErrorBody::new("Not Found", "no such user", 404);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "no such user");
        assert_eq!(json["status"], 404);
        assert!(json.get("path").is_none());
        assert!(json.get("validationErrors").is_none());
    }

    #[test]
    fn test_error_body_validation_errors_key_is_camel_case() {
        let body = ErrorBody::new("Processing Failed", "downloads failed", 500)
            .with_path("/face/verify")
            .with_validation_errors(serde_json::json!({
                "download_errors": ["Failed to fetch image http://x: timeout"]
            }));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["path"], "/face/verify");
        assert_eq!(
            json["validationErrors"]["download_errors"][0],
            "Failed to fetch image http://x: timeout"
        );
    }

    #[test]
    fn test_success_body_shape() {
        let body = SuccessBody::new(serde_json::json!({"total_images": 3}))
            .with_message("Appended images to existing user");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["total_images"], 3);
        assert_eq!(json["message"], "Appended images to existing user");
    }

    #[test]
    fn test_success_body_without_message() {
        let body = SuccessBody::new(42u32);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["data"], 42);
        assert!(json.get("message").is_none());
    }
}
