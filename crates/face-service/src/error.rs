//! Error taxonomy for the verification aggregator.

use crate::storage::StoreError;
use thiserror::Error;

/// Failure kinds a verification call can terminate with.
///
/// Individual fetch and scoring failures are not represented here; they are
/// recovered locally and surfaced inside the verdict's `errors` list.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The user has never registered reference images (no row in the store)
    #[error("Face verification has not been set up for this user")]
    NotConfigured(String),

    /// The user has a row but its reference list is empty
    #[error("No face data found for user {0}")]
    NoReferenceImages(String),

    /// Every reference image download failed; carries one entry per reference
    #[error("Failed to download any face images for this user")]
    AllFetchesFailed { errors: Vec<String> },

    /// The batched scoring call failed (transport, non-2xx, or explicit failure)
    #[error("{0}")]
    ScoringService(String),

    /// Reference store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
