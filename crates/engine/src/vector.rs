//! Embedding-proximity ranking. Anchors on one or more reference
//! products (averaged into a centroid) or on a free-text intent
//! embedding, then ranks the catalog by cosine similarity.

use shoprec_core::config::VectorConfig;
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::providers::EmbeddingProvider;
use shoprec_core::store::ProductStore;
use shoprec_core::types::{Algorithm, RecommendationResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct VectorSimilarityEngine {
    store: Arc<dyn ProductStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    metrics: Arc<dyn MetricsSink>,
    config: VectorConfig,
}

impl VectorSimilarityEngine {
    pub fn new(
        store: Arc<dyn ProductStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        metrics: Arc<dyn MetricsSink>,
        config: VectorConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            metrics,
            config,
        }
    }

    fn record_failure(&self) {
        self.metrics.record(MetricsEvent::AlgorithmFailure {
            algorithm: Algorithm::VectorSimilarity,
        });
    }

    /// Rank products near the reference centroid (when references are
    /// given) or near the intent-text embedding. No usable query vector
    /// means no results; the orchestrator handles the fallback.
    pub async fn recommend(
        &self,
        domain_id: &str,
        reference_product_ids: &[String],
        intent_text: Option<&str>,
        exclude_product_ids: &[String],
        limit: usize,
    ) -> Vec<RecommendationResult> {
        let query = if !reference_product_ids.is_empty() {
            self.reference_centroid(domain_id, reference_product_ids)
                .await
        } else if let Some(text) = intent_text {
            self.intent_vector(text).await
        } else {
            None
        };

        let query = match query {
            Some(v) => v,
            None => return Vec::new(),
        };

        // Pull enough candidates that post-filtering references and
        // exclusions still leaves a full page.
        let pool = self
            .config
            .candidate_pool
            .max(limit + reference_product_ids.len() + exclude_product_ids.len());

        let neighbors = match self.store.nearest_embeddings(domain_id, &query, pool).await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(domain_id = %domain_id, error = %e, "Vector search failed");
                metrics::counter!("recs.store_errors").increment(1);
                self.record_failure();
                return Vec::new();
            }
        };

        let intent_based = reference_product_ids.is_empty();
        let mut results: Vec<RecommendationResult> = neighbors
            .into_iter()
            .filter(|(product_id, score)| {
                *score >= self.config.min_similarity
                    && !reference_product_ids.iter().any(|r| r == product_id)
                    && !exclude_product_ids.iter().any(|x| x == product_id)
            })
            .map(|(product_id, score)| {
                let mut metadata = HashMap::new();
                metadata.insert("similarity".to_string(), serde_json::json!(score));
                if intent_based {
                    if let Some(text) = intent_text {
                        metadata.insert("intent".to_string(), serde_json::json!(text));
                    }
                }
                RecommendationResult {
                    product_id,
                    score,
                    algorithm: Algorithm::VectorSimilarity,
                    reason: if intent_based {
                        "Matches your query".to_string()
                    } else {
                        "Similar to viewed products".to_string()
                    },
                    metadata,
                }
            })
            .collect();

        results.truncate(limit);
        results
    }

    /// Component-wise mean of the reference embeddings. Missing
    /// embeddings are skipped; dimension mismatches are skipped too
    /// (embeddings are fixed-width per domain, so a mismatch is stale
    /// ingestion data).
    async fn reference_centroid(
        &self,
        domain_id: &str,
        reference_product_ids: &[String],
    ) -> Option<Vec<f64>> {
        let mut centroid: Option<Vec<f64>> = None;
        let mut count = 0usize;

        for product_id in reference_product_ids {
            let vector = match self.store.embedding(domain_id, product_id).await {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(e) => {
                    warn!(domain_id = %domain_id, product_id = %product_id, error = %e,
                        "Failed to load reference embedding");
                    metrics::counter!("recs.store_errors").increment(1);
                    continue;
                }
            };

            match centroid.as_mut() {
                None => {
                    centroid = Some(vector);
                    count = 1;
                }
                Some(acc) if acc.len() == vector.len() => {
                    for (a, v) in acc.iter_mut().zip(vector.iter()) {
                        *a += v;
                    }
                    count += 1;
                }
                Some(_) => {
                    warn!(domain_id = %domain_id, product_id = %product_id,
                        "Reference embedding dimension mismatch, skipping");
                }
            }
        }

        let mut centroid = centroid?;
        for component in centroid.iter_mut() {
            *component /= count as f64;
        }
        Some(centroid)
    }

    async fn intent_vector(&self, text: &str) -> Option<Vec<f64>> {
        let timeout = Duration::from_millis(self.config.embed_timeout_ms);
        match tokio::time::timeout(timeout, self.embedder.embed(text)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                warn!(error = %e, "Embedding provider failed, no vector available");
                metrics::counter!("recs.embedding_errors").increment(1);
                self.record_failure();
                None
            }
            Err(_) => {
                warn!(timeout_ms = self.config.embed_timeout_ms, "Embedding provider timed out");
                metrics::counter!("recs.embedding_errors").increment(1);
                self.record_failure();
                None
            }
        }
    }
}
