//! Media Upload Service
//!
//! Thin HTTP service that proxies file uploads into an S3-compatible
//! object store and hands back canonical retrieval URLs. Uploads pass a
//! file-type allow-list; batch uploads are best-effort with per-file
//! error bookkeeping.

pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use storage::ObjectStore;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/upload", post(handlers::upload_handler))
        .route("/upload-multiple", post(handlers::upload_multiple_handler))
        .route("/download/*key", get(handlers::download_handler))
        .route("/delete/*key", delete(handlers::delete_handler))
        .with_state(shared_state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
