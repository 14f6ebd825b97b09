//! Hybrid orchestrator: validates the request, fans out to the four
//! scoring algorithms concurrently, and merges their rankings into one
//! deduplicated, explainable list. A failing algorithm degrades ranking
//! quality; it never fails the request.

use crate::collaborative::CollaborativeFilterEngine;
use crate::content::ContentBasedEngine;
use crate::context::ContextAnalyzer;
use crate::popularity::PopularityEngine;
use crate::vector::VectorSimilarityEngine;
use chrono::Utc;
use shoprec_core::config::EngineConfig;
use shoprec_core::error::{RecsError, RecsResult};
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::providers::{EmbeddingProvider, IntentProvider};
use shoprec_core::store::{EventStore, ProductStore};
use shoprec_core::types::{
    Algorithm, ConversationIntent, PriceRange, RecommendationRequest, RecommendationResponse,
    RecommendationResult,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub struct HybridRecommender {
    store: Arc<dyn ProductStore>,
    events: Arc<dyn EventStore>,
    vector: VectorSimilarityEngine,
    collaborative: CollaborativeFilterEngine,
    content: ContentBasedEngine,
    popularity: PopularityEngine,
    analyzer: ContextAnalyzer,
    metrics: Arc<dyn MetricsSink>,
    config: EngineConfig,
}

/// One merged candidate with every algorithm that surfaced it.
struct Merged {
    result: RecommendationResult,
    contributors: Vec<Algorithm>,
}

impl HybridRecommender {
    pub fn new(
        store: Arc<dyn ProductStore>,
        events: Arc<dyn EventStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        intent_provider: Arc<dyn IntentProvider>,
        metrics: Arc<dyn MetricsSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            vector: VectorSimilarityEngine::new(
                store.clone(),
                embedder,
                metrics.clone(),
                config.vector.clone(),
            ),
            collaborative: CollaborativeFilterEngine::new(
                events.clone(),
                metrics.clone(),
                config.collaborative.clone(),
            ),
            content: ContentBasedEngine::new(
                store.clone(),
                metrics.clone(),
                config.content.clone(),
            ),
            popularity: PopularityEngine::new(
                events.clone(),
                metrics.clone(),
                config.popularity.clone(),
            ),
            analyzer: ContextAnalyzer::new(intent_provider, config.context.clone()),
            store,
            events,
            metrics,
            config,
        }
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> RecsResult<RecommendationResponse> {
        let limit = self.validate(request)?;
        let started = Instant::now();

        let references = self.reference_products(request).await;
        let intent = match &request.context {
            Some(text) => Some(self.analyzer.analyze(text, &request.domain_id).await),
            None => None,
        };
        // Free-text context only drives the vector engine when there is
        // no behavioral anchor; references are the stronger signal.
        let intent_text = if references.is_empty() {
            request.context.as_deref()
        } else {
            None
        };

        let pinned = request.algorithm.unwrap_or(Algorithm::Hybrid);
        let excludes = &request.exclude_product_ids;

        let (vector_results, collaborative_results, content_results, popularity_results) = tokio::join!(
            self.timed(Algorithm::VectorSimilarity, async {
                if !runs(pinned, Algorithm::VectorSimilarity) {
                    return Vec::new();
                }
                self.vector
                    .recommend(&request.domain_id, &references, intent_text, excludes, limit)
                    .await
            }),
            self.timed(Algorithm::Collaborative, async {
                let session_id = match (&request.session_id, runs(pinned, Algorithm::Collaborative))
                {
                    (Some(session_id), true) => session_id,
                    _ => return Vec::new(),
                };
                self.collaborative
                    .recommend(&request.domain_id, session_id, excludes, limit)
                    .await
            }),
            self.timed(Algorithm::ContentBased, async {
                if !runs(pinned, Algorithm::ContentBased) {
                    return Vec::new();
                }
                self.content
                    .recommend(&request.domain_id, &references, excludes, limit)
                    .await
            }),
            self.timed(Algorithm::Popularity, async {
                if !runs(pinned, Algorithm::Popularity) {
                    return Vec::new();
                }
                self.popularity
                    .recommend(&request.domain_id, excludes, limit)
                    .await
            }),
        );

        let mut merged: HashMap<String, Merged> = HashMap::new();
        let contributions = vector_results
            .into_iter()
            .chain(collaborative_results)
            .chain(content_results)
            .chain(popularity_results);
        for result in contributions {
            if excludes.iter().any(|x| *x == result.product_id)
                || references.iter().any(|r| *r == result.product_id)
            {
                continue;
            }
            match merged.entry(result.product_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Merged {
                        contributors: vec![result.algorithm],
                        result,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    if !existing.contributors.contains(&result.algorithm) {
                        existing.contributors.push(result.algorithm);
                    }
                    // Highest-scoring contributor supplies score, reason,
                    // and algorithm.
                    if result.score > existing.result.score {
                        existing.result = result;
                    }
                }
            }
        }

        if let Some(range) = intent.as_ref().and_then(|i| i.price_range.as_ref()) {
            self.apply_price_filter(&request.domain_id, range, &mut merged)
                .await;
        }

        let mut recommendations: Vec<RecommendationResult> = merged
            .into_values()
            .map(|mut merged| {
                let contributors: Vec<&str> =
                    merged.contributors.iter().map(|a| a.as_str()).collect();
                merged
                    .result
                    .metadata
                    .insert("algorithms".to_string(), serde_json::json!(contributors));
                merged.result
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations.truncate(limit);

        let execution_time_ms = started.elapsed().as_millis() as u64;
        info!(
            domain_id = %request.domain_id,
            algorithm = pinned.as_str(),
            results = recommendations.len(),
            execution_time_ms,
            "Recommendation request served"
        );

        Ok(RecommendationResponse {
            request_id: Uuid::new_v4(),
            recommendations,
            algorithm: pinned,
            execution_time_ms,
            generated_at: Utc::now(),
        })
    }

    /// Expose the analyzer for callers that want intent without a full
    /// recommendation pass.
    pub async fn analyze_context(&self, raw_text: &str, domain_id: &str) -> ConversationIntent {
        self.analyzer.analyze(raw_text, domain_id).await
    }

    fn validate(&self, request: &RecommendationRequest) -> RecsResult<usize> {
        if request.domain_id.trim().is_empty() {
            return Err(RecsError::Validation("domain_id must not be empty".into()));
        }
        let limit = request.limit.unwrap_or(self.config.hybrid.default_limit);
        if limit == 0 || limit > self.config.hybrid.max_limit {
            return Err(RecsError::Validation(format!(
                "limit must be between 1 and {}, got {limit}",
                self.config.hybrid.max_limit
            )));
        }
        Ok(limit)
    }

    /// Distinct products the session has interacted with, oldest first.
    /// These anchor the vector and content engines and never appear in
    /// their own recommendation set.
    async fn reference_products(&self, request: &RecommendationRequest) -> Vec<String> {
        let session_id = match &request.session_id {
            Some(session_id) => session_id,
            None => return Vec::new(),
        };
        let mut events = match self
            .events
            .session_events(&request.domain_id, session_id)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!(domain_id = %request.domain_id, session_id = %session_id, error = %e,
                    "Failed to load session references");
                metrics::counter!("recs.store_errors").increment(1);
                return Vec::new();
            }
        };
        events.sort_by_key(|e| e.timestamp);

        let mut references = Vec::new();
        for event in events {
            if (event.clicked || event.purchased) && !references.contains(&event.product_id) {
                references.push(event.product_id);
            }
        }
        references
    }

    /// Drop merged candidates whose known price falls outside the intent
    /// bounds. Products without a parseable price pass through; a price
    /// filter should not empty the result set over catalog gaps.
    async fn apply_price_filter(
        &self,
        domain_id: &str,
        range: &PriceRange,
        merged: &mut HashMap<String, Merged>,
    ) {
        if range.min.is_none() && range.max.is_none() {
            return;
        }
        let products = match self.store.products(domain_id).await {
            Ok(products) => products,
            Err(e) => {
                warn!(domain_id = %domain_id, error = %e,
                    "Failed to load catalog for price filtering");
                metrics::counter!("recs.store_errors").increment(1);
                return;
            }
        };
        let prices: HashMap<String, f64> = products
            .into_iter()
            .filter_map(|p| p.price_value().map(|price| (p.id, price)))
            .collect();

        merged.retain(|product_id, _| match prices.get(product_id) {
            Some(price) => {
                range.min.map_or(true, |min| *price >= min)
                    && range.max.map_or(true, |max| *price <= max)
            }
            None => true,
        });
    }

    async fn timed<F>(&self, algorithm: Algorithm, fut: F) -> Vec<RecommendationResult>
    where
        F: Future<Output = Vec<RecommendationResult>>,
    {
        let started = Instant::now();
        let results = fut.await;
        self.metrics.record(MetricsEvent::AlgorithmRun {
            algorithm,
            result_count: results.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        results
    }
}

fn runs(pinned: Algorithm, algorithm: Algorithm) -> bool {
    pinned == Algorithm::Hybrid || pinned == algorithm
}
