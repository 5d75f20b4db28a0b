//! Face Verification Service
//!
//! Thin HTTP service that verifies an uploaded probe image against a
//! user's previously stored reference images. The actual biometric
//! comparison is delegated to an external scoring service; this crate
//! orchestrates the reference store, the per-image downloads and the
//! batched scoring call, and aggregates everything into one verdict.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod models;
pub mod scorer;
pub mod storage;
pub mod verify;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::VerifyError;
pub use handlers::AppState;
pub use models::{AppendOutcome, VerificationVerdict};
pub use verify::Verifier;

/// Probe images are small photos; anything past this is rejected upfront.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/face/verify", post(handlers::verify_handler))
        .route(
            "/face/upload/:user_id",
            post(handlers::upload_references_handler),
        )
        .with_state(shared_state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
