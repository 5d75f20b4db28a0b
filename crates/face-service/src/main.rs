//! Face Verification Service
//!
//! REST API for verifying probe images against stored reference images

use anyhow::{Context, Result};
use face_service::fetcher::HttpImageFetcher;
use face_service::scorer::HttpScorerClient;
use face_service::storage::RedisReferenceStore;
use face_service::{create_router, AppState, Config, Verifier};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "face_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Face Verification Service");
    info!("Redis URL: {}", config.redis_url);
    info!("Scoring service: {}", config.scorer_url);
    info!("Similarity threshold: {}", config.similarity_threshold);

    // Initialize collaborators
    let store = RedisReferenceStore::new(&config.redis_url)
        .await
        .context("Failed to initialize reference store")?;

    let fetcher =
        HttpImageFetcher::new(config.fetch_timeout).context("Failed to build image fetcher")?;

    let scorer = HttpScorerClient::new(config.scorer_url.clone(), config.scorer_timeout)
        .context("Failed to build scorer client")?;

    let verifier = Verifier::new(
        Arc::new(store),
        Arc::new(fetcher),
        Arc::new(scorer),
        config.similarity_threshold,
    );

    let state = AppState { verifier };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Face Verification Service running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
