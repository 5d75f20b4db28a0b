//! Verification aggregator
//!
//! Combines the reference store, the image fetcher and the remote scorer
//! into one verdict per verification call. The policy is best-effort: a
//! single bad reference image must not fail verification for a user who
//! has several good ones, so per-reference failures are recorded and
//! skipped, never retried and never fatal on their own.

use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::VerifyError;
use crate::fetcher::ImageFetcher;
use crate::models::{AppendOutcome, VerificationVerdict};
use crate::scorer::SimilarityScorer;
use crate::storage::ReferenceStore;

/// Orchestrates one verification or append call. Read-only with respect to
/// persisted state during `verify`; all entities except the stored
/// reference list are request-scoped.
pub struct Verifier {
    store: Arc<dyn ReferenceStore>,
    fetcher: Arc<dyn ImageFetcher>,
    scorer: Arc<dyn SimilarityScorer>,
    threshold: f64,
}

impl Verifier {
    pub fn new(
        store: Arc<dyn ReferenceStore>,
        fetcher: Arc<dyn ImageFetcher>,
        scorer: Arc<dyn SimilarityScorer>,
        threshold: f64,
    ) -> Self {
        Self {
            store,
            fetcher,
            scorer,
            threshold,
        }
    }

    /// Verify a probe image against the user's stored reference images.
    pub async fn verify(
        &self,
        user_id: &str,
        probe: Bytes,
    ) -> Result<VerificationVerdict, VerifyError> {
        let references = self
            .store
            .get_references(user_id)
            .await?
            .ok_or_else(|| VerifyError::NotConfigured(user_id.to_string()))?;

        if references.is_empty() {
            return Err(VerifyError::NoReferenceImages(user_id.to_string()));
        }

        let total_images = references.len();

        // Fetches run concurrently; join_all preserves submission order, so
        // the error list stays in reference-list order regardless of which
        // download finishes first.
        let outcomes = join_all(references.iter().map(|url| self.fetcher.fetch(url))).await;

        let mut fetched = Vec::new();
        let mut errors = Vec::new();
        for (url, outcome) in references.iter().zip(outcomes) {
            match outcome {
                Ok(bytes) => fetched.push(bytes),
                Err(e) => {
                    warn!("Reference fetch failed for user {}: {} ({})", user_id, url, e);
                    errors.push(format!("Failed to fetch image {}: {}", url, e));
                }
            }
        }

        if fetched.is_empty() {
            return Err(VerifyError::AllFetchesFailed { errors });
        }

        let report = self
            .scorer
            .score(&fetched, &probe)
            .await
            .map_err(|e| VerifyError::ScoringService(e.to_string()))?;

        // A well-behaved scorer returns at most one score per submitted
        // reference; anything more would let images_processed exceed
        // total_images, so reject it rather than trust the count.
        if report.similarities.len() > fetched.len() {
            return Err(VerifyError::ScoringService(format!(
                "Scoring service returned {} scores for {} references",
                report.similarities.len(),
                fetched.len()
            )));
        }

        // Fetch errors first (submission order), then scorer-side errors in
        // the order the scorer reported them.
        errors.extend(report.errors);

        let images_processed = report.similarities.len();
        let similarity = if images_processed == 0 {
            0.0
        } else {
            report.similarities.iter().sum::<f64>() / images_processed as f64
        };

        let verdict = VerificationVerdict {
            similarity,
            is_match: images_processed > 0 && similarity > self.threshold,
            images_processed,
            total_images,
            errors,
        };

        info!(
            "Verification for user {}: similarity {:.4}, match {}, {}/{} images",
            user_id, verdict.similarity, verdict.is_match, images_processed, total_images
        );

        Ok(verdict)
    }

    /// Append reference image URLs for a user, creating the row if absent.
    /// No deduplication; order is preserved.
    pub async fn append_references(
        &self,
        user_id: &str,
        urls: &[String],
    ) -> Result<AppendOutcome, VerifyError> {
        let outcome = self.store.append_references(user_id, urls).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use crate::scorer::{ScoreReport, ScorerError};
    use crate::storage::StoreError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        rows: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl ReferenceStore for FakeStore {
        async fn get_references(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError> {
            Ok(self.rows.get(user_id).cloned())
        }

        async fn append_references(
            &self,
            _user_id: &str,
            urls: &[String],
        ) -> Result<AppendOutcome, StoreError> {
            Ok(AppendOutcome {
                created: true,
                total_images: urls.len(),
            })
        }
    }

    /// Fails every URL containing "bad", serves bytes for everything else
    struct FakeFetcher;

    #[async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            if url.contains("bad") {
                Err(FetchError::Other("connection refused".to_string()))
            } else {
                Ok(Bytes::from_static(b"jpeg-bytes"))
            }
        }
    }

    struct FakeScorer {
        result: Mutex<Option<Result<ScoreReport, ScorerError>>>,
        seen_batch_sizes: Mutex<Vec<usize>>,
    }

    impl FakeScorer {
        fn returning(report: ScoreReport) -> Self {
            Self {
                result: Mutex::new(Some(Ok(report))),
                seen_batch_sizes: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: ScorerError) -> Self {
            Self {
                result: Mutex::new(Some(Err(err))),
                seen_batch_sizes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SimilarityScorer for FakeScorer {
        async fn score(
            &self,
            references: &[Bytes],
            _probe: &Bytes,
        ) -> Result<ScoreReport, ScorerError> {
            self.seen_batch_sizes.lock().unwrap().push(references.len());
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("scorer called more than once per verification")
        }
    }

    fn verifier_with(
        rows: HashMap<String, Vec<String>>,
        scorer: FakeScorer,
        threshold: f64,
    ) -> (Verifier, Arc<FakeScorer>) {
        let scorer = Arc::new(scorer);
        let verifier = Verifier::new(
            Arc::new(FakeStore { rows }),
            Arc::new(FakeFetcher),
            scorer.clone(),
            threshold,
        );
        (verifier, scorer)
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_configured() {
        let (verifier, _) = verifier_with(
            HashMap::new(),
            FakeScorer::returning(ScoreReport {
                similarities: vec![],
                errors: vec![],
            }),
            0.5,
        );

        let err = verifier
            .verify("ghost", Bytes::from_static(b"probe"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_empty_reference_list_is_distinct_from_unknown_user() {
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), vec![]);
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![],
                errors: vec![],
            }),
            0.5,
        );

        let err = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::NoReferenceImages(_)));
    }

    #[tokio::test]
    async fn test_all_fetches_failed_names_every_reference() {
        let mut rows = HashMap::new();
        rows.insert(
            "u1".to_string(),
            urls(&["http://bad/1", "http://bad/2", "http://bad/3"]),
        );
        let (verifier, scorer) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![],
                errors: vec![],
            }),
            0.5,
        );

        let err = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap_err();

        match err {
            VerifyError::AllFetchesFailed { errors } => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].contains("http://bad/1"));
                assert!(errors[1].contains("http://bad/2"));
                assert!(errors[2].contains("http://bad/3"));
            }
            other => panic!("expected AllFetchesFailed, got {:?}", other),
        }

        // Scorer must not be reached when nothing was fetched
        assert!(scorer.seen_batch_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_fetch_failure_with_match() {
        // 3 references, 1 fetch fails, scorer returns [0.8, 0.6] for the
        // surviving 2: similarity 0.7, match, 2/3 processed, one error.
        let mut rows = HashMap::new();
        rows.insert(
            "u1".to_string(),
            urls(&["http://ok/1", "http://bad/2", "http://ok/3"]),
        );
        let (verifier, scorer) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.8, 0.6],
                errors: vec![],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();

        assert!((verdict.similarity - 0.7).abs() < 1e-12);
        assert!(verdict.is_match);
        assert_eq!(verdict.images_processed, 2);
        assert_eq!(verdict.total_images, 3);
        assert_eq!(verdict.errors.len(), 1);
        assert!(verdict.errors[0].contains("Failed to fetch image http://bad/2"));

        // Exactly one batched call with the two surviving references
        assert_eq!(*scorer.seen_batch_sizes.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_error_merge_order_fetch_then_scorer() {
        // N=4, M=3 fetched, K=2 scored: 1 fetch error then 1 scorer error.
        let mut rows = HashMap::new();
        rows.insert(
            "u1".to_string(),
            urls(&["http://ok/1", "http://bad/2", "http://ok/3", "http://ok/4"]),
        );
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.4, 0.2],
                errors: vec!["No face detected in reference_2".to_string()],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();

        assert_eq!(verdict.images_processed, 2);
        assert_eq!(verdict.total_images, 4);
        assert_eq!(verdict.errors.len(), 2);
        assert!(verdict.errors[0].contains("Failed to fetch image http://bad/2"));
        assert_eq!(verdict.errors[1], "No face detected in reference_2");
        assert!((verdict.similarity - 0.3).abs() < 1e-12);
        assert!(!verdict.is_match);
    }

    #[tokio::test]
    async fn test_match_threshold_is_strict() {
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.5],
                errors: vec![],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();
        assert!(!verdict.is_match);

        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.5000001],
                errors: vec![],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();
        assert!(verdict.is_match);
    }

    #[tokio::test]
    async fn test_scorer_rejecting_everything_is_a_reportable_verdict() {
        // The store and the fetches succeeded, so a scorer that finds
        // nothing scoreable yields a verdict, not a failure.
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1", "http://ok/2"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![],
                errors: vec![
                    "No face detected in reference_0".to_string(),
                    "No face detected in reference_1".to_string(),
                ],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();

        assert_eq!(verdict.images_processed, 0);
        assert_eq!(verdict.total_images, 2);
        assert_eq!(verdict.similarity, 0.0);
        assert!(!verdict.is_match);
        assert_eq!(verdict.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_scorer_failure_is_fatal() {
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::failing(ScorerError::Service("model not loaded".to_string())),
            0.5,
        );

        let err = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::ScoringService(ref msg) if msg == "model not loaded"));
    }

    #[tokio::test]
    async fn test_excess_scores_are_rejected() {
        // Two references fetched, three scores back: the count can no
        // longer be trusted, so the call fails instead of reporting
        // images_processed > total_images.
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1", "http://ok/2"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.9, 0.8, 0.7],
                errors: vec![],
            }),
            0.5,
        );

        let err = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, VerifyError::ScoringService(ref msg) if msg.contains("3 scores for 2 references"))
        );
    }

    #[tokio::test]
    async fn test_processed_never_exceeds_total() {
        let mut rows = HashMap::new();
        rows.insert("u1".to_string(), urls(&["http://ok/1", "http://bad/2"]));
        let (verifier, _) = verifier_with(
            rows,
            FakeScorer::returning(ScoreReport {
                similarities: vec![0.9],
                errors: vec![],
            }),
            0.5,
        );

        let verdict = verifier
            .verify("u1", Bytes::from_static(b"probe"))
            .await
            .unwrap();
        assert!(verdict.images_processed <= verdict.total_images);
    }
}
