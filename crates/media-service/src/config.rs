//! Configuration management for the media upload service
//!
//! Loads configuration from environment variables with sensible defaults.
//! Defaults target a local MinIO instance; any S3-compatible endpoint works.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// S3-compatible endpoint URL
    pub s3_endpoint: String,

    /// Static access key
    pub s3_access_key: String,

    /// Static secret key
    pub s3_secret_key: String,

    /// Bucket all uploads land in; created at startup if absent
    pub bucket: String,

    /// Base URL under which stored objects are publicly reachable.
    /// Canonical retrieval URLs are `{public_base_url}/{bucket}/{key}`.
    pub public_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let s3_endpoint =
            env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let config = Config {
            host: env::var("MEDIA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("MEDIA_PORT")
                .unwrap_or_else(|_| "8085".to_string())
                .parse()
                .context("Invalid MEDIA_PORT")?,

            s3_access_key: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),

            s3_secret_key: env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string()),

            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "media".to_string()),

            public_base_url: env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),

            s3_endpoint,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("MEDIA_PORT must be greater than 0");
        }

        if self.bucket.is_empty() {
            anyhow::bail!("S3_BUCKET must not be empty");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
