//! Data models for the face verification service

use serde::{Deserialize, Serialize};

/// Aggregated result of one verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    /// Arithmetic mean of the per-reference similarity scores that were
    /// actually obtained; 0.0 when the scorer scored nothing
    pub similarity: f64,

    /// Whether `similarity` strictly exceeds the configured threshold
    #[serde(rename = "match")]
    pub is_match: bool,

    /// Number of references the scorer returned a score for
    pub images_processed: usize,

    /// Size of the user's stored reference list
    pub total_images: usize,

    /// Fetch failures (in submission order) followed by scorer-side failures
    /// (in the order the scorer reported them); never silently truncated
    pub errors: Vec<String>,
}

/// Result of appending reference image URLs for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    /// Whether a new row was created for the user
    pub created: bool,

    /// Total reference count after the append
    pub total_images: usize,
}
