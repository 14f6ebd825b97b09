//! Frequency-weighted popularity ranking over the interaction log. The
//! terminal fallback: whenever the primary algorithms have no signal,
//! this one usually still does.

use shoprec_core::config::PopularityConfig;
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::store::EventStore;
use shoprec_core::types::{Algorithm, RecommendationResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct PopularityEngine {
    events: Arc<dyn EventStore>,
    metrics: Arc<dyn MetricsSink>,
    config: PopularityConfig,
}

#[derive(Default)]
struct Counts {
    clicks: u64,
    purchases: u64,
}

impl PopularityEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        metrics: Arc<dyn MetricsSink>,
        config: PopularityConfig,
    ) -> Self {
        Self {
            events,
            metrics,
            config,
        }
    }

    pub async fn recommend(
        &self,
        domain_id: &str,
        exclude_product_ids: &[String],
        limit: usize,
    ) -> Vec<RecommendationResult> {
        // An empty or unreadable log is "no signal", not an error.
        let events = match self.events.domain_events(domain_id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(domain_id = %domain_id, error = %e, "Failed to load event log");
                metrics::counter!("recs.store_errors").increment(1);
                self.metrics.record(MetricsEvent::AlgorithmFailure {
                    algorithm: Algorithm::Popularity,
                });
                return Vec::new();
            }
        };

        let mut counts: HashMap<String, Counts> = HashMap::new();
        for event in events {
            if exclude_product_ids.iter().any(|x| *x == event.product_id) {
                continue;
            }
            let entry = counts.entry(event.product_id).or_default();
            if event.clicked {
                entry.clicks += 1;
            }
            if event.purchased {
                entry.purchases += 1;
            }
        }

        let mut results: Vec<RecommendationResult> = counts
            .into_iter()
            .filter(|(_, c)| c.clicks + c.purchases > 0)
            .map(|(product_id, c)| {
                let weighted = c.purchases as f64 * self.config.purchase_weight
                    + c.clicks as f64 * self.config.click_weight;
                let score = (weighted / self.config.normalization_divisor).min(1.0);
                let mut metadata = HashMap::new();
                metadata.insert("clicks".to_string(), serde_json::json!(c.clicks));
                metadata.insert("purchases".to_string(), serde_json::json!(c.purchases));
                RecommendationResult {
                    product_id,
                    score,
                    algorithm: Algorithm::Popularity,
                    reason: "Popular product".to_string(),
                    metadata,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        results
    }
}
