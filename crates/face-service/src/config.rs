//! Configuration management for the face verification service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for the reference image store
    pub redis_url: String,

    /// Base URL of the remote face scoring service
    pub scorer_url: String,

    /// Similarity threshold for a match verdict (strict greater-than)
    pub similarity_threshold: f64,

    /// Timeout applied to each reference image download
    pub fetch_timeout: Duration,

    /// Timeout applied to the batched scoring call
    pub scorer_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config {
            host: env::var("FACE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("FACE_PORT")
                .unwrap_or_else(|_| "8084".to_string())
                .parse()
                .context("Invalid FACE_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            scorer_url: env::var("FACE_API_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),

            similarity_threshold: env::var("FACE_SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()
                .context("Invalid FACE_SIMILARITY_THRESHOLD")?,

            fetch_timeout: Duration::from_secs(
                env::var("IMAGE_FETCH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid IMAGE_FETCH_TIMEOUT_SECS")?,
            ),

            scorer_timeout: Duration::from_secs(
                env::var("SCORER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid SCORER_TIMEOUT_SECS")?,
            ),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("FACE_PORT must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            anyhow::bail!("FACE_SIMILARITY_THRESHOLD must be within [0, 1]");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
