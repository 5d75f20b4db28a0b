//! Client for the remote face scoring service
//!
//! One verification makes exactly one batched call: every surviving
//! reference image goes out as its own multipart part (`reference_0`,
//! `reference_1`, ...) alongside the `probe` part. The scorer answers with
//! per-reference similarity scores plus its own error list for references
//! it could not score (e.g. no face detected).

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Per-reference scoring results from one batched call
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    /// One similarity in [0, 1] per reference the scorer accepted
    pub similarities: Vec<f64>,

    /// Scorer-side failures, one per rejected reference
    pub errors: Vec<String>,
}

/// Failure of the batched scoring call as a whole
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Scoring service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Scoring service returned status {0}")]
    Status(reqwest::StatusCode),

    /// The scorer answered but flagged the request as failed
    #[error("{0}")]
    Service(String),

    #[error("Malformed scoring response: {0}")]
    Malformed(String),
}

/// Computes similarity scores for a batch of reference images against one
/// probe image.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn score(&self, references: &[Bytes], probe: &Bytes) -> Result<ScoreReport, ScorerError>;
}

#[derive(Debug, Deserialize)]
struct ScoreEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ScoreData>,
}

#[derive(Debug, Deserialize)]
struct ScoreData {
    #[serde(default)]
    similarities: Vec<f64>,
    #[serde(default)]
    errors: Vec<String>,
}

fn into_report(envelope: ScoreEnvelope) -> Result<ScoreReport, ScorerError> {
    if !envelope.success {
        let reason = envelope
            .error
            .unwrap_or_else(|| "unspecified scoring failure".to_string());
        return Err(ScorerError::Service(reason));
    }

    let data = envelope
        .data
        .ok_or_else(|| ScorerError::Malformed("missing data field".to_string()))?;

    Ok(ScoreReport {
        similarities: data.similarities,
        errors: data.errors,
    })
}

/// HTTP multipart implementation of [`SimilarityScorer`]
pub struct HttpScorerClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScorerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScorerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl SimilarityScorer for HttpScorerClient {
    async fn score(&self, references: &[Bytes], probe: &Bytes) -> Result<ScoreReport, ScorerError> {
        let url = format!("{}/verify", self.base_url);

        debug!(
            "Submitting {} reference(s) to scoring service: {}",
            references.len(),
            url
        );

        let mut form = reqwest::multipart::Form::new();
        for (i, reference) in references.iter().enumerate() {
            let part = reqwest::multipart::Part::bytes(reference.to_vec())
                .file_name(format!("reference_{}.jpg", i))
                .mime_str("image/jpeg")?;
            form = form.part(format!("reference_{}", i), part);
        }
        let probe_part = reqwest::multipart::Part::bytes(probe.to_vec())
            .file_name("probe.jpg")
            .mime_str("image/jpeg")?;
        form = form.part("probe", probe_part);

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(ScorerError::Status(response.status()));
        }

        let envelope: ScoreEnvelope = response
            .json()
            .await
            .map_err(|e| ScorerError::Malformed(e.to_string()))?;

        into_report(envelope)
    }
}
