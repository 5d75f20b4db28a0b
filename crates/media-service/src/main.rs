//! Media Upload Service
//!
//! REST API proxying file uploads into an S3-compatible object store

use anyhow::{Context, Result};
use media_service::{create_router, AppState, Config, ObjectStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Media Upload Service");
    info!("S3 endpoint: {}", config.s3_endpoint);
    info!("Bucket: {}", config.bucket);

    // Initialize storage and make sure the bucket exists
    let store = ObjectStore::connect(&config)
        .await
        .context("Failed to initialize object store")?;

    store
        .ensure_bucket()
        .await
        .context("Failed to ensure bucket")?;

    let state = AppState { store };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Media Upload Service running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
