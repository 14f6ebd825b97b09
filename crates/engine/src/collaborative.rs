//! Session-based collaborative filtering: find neighbor sessions with
//! overlapping interaction sets, then surface what those neighbors
//! interacted with, weighted by similarity and interaction strength.

use chrono::{DateTime, Utc};
use shoprec_core::config::CollaborativeConfig;
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::similarity::jaccard_similarity;
use shoprec_core::store::EventStore;
use shoprec_core::types::{Algorithm, RecommendationEvent, RecommendationResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

pub struct CollaborativeFilterEngine {
    events: Arc<dyn EventStore>,
    metrics: Arc<dyn MetricsSink>,
    config: CollaborativeConfig,
}

struct Neighbor {
    similarity: f64,
    last_seen: DateTime<Utc>,
    events: Vec<RecommendationEvent>,
}

/// Accumulated evidence for one candidate product.
#[derive(Default)]
struct Candidate {
    weight: f64,
    purchase_weight: f64,
    click_weight: f64,
    neighbors: HashSet<String>,
}

impl CollaborativeFilterEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        metrics: Arc<dyn MetricsSink>,
        config: CollaborativeConfig,
    ) -> Self {
        Self {
            events,
            metrics,
            config,
        }
    }

    fn record_failure(&self) {
        self.metrics.record(MetricsEvent::AlgorithmFailure {
            algorithm: Algorithm::Collaborative,
        });
    }

    pub async fn recommend(
        &self,
        domain_id: &str,
        session_id: &str,
        exclude_product_ids: &[String],
        limit: usize,
    ) -> Vec<RecommendationResult> {
        let own_events = match self.events.session_events(domain_id, session_id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(domain_id = %domain_id, session_id = %session_id, error = %e,
                    "Failed to load session history");
                metrics::counter!("recs.store_errors").increment(1);
                self.record_failure();
                return Vec::new();
            }
        };

        let own_set: HashSet<String> = own_events
            .iter()
            .filter(|e| e.clicked || e.purchased)
            .map(|e| e.product_id.clone())
            .collect();
        if own_set.is_empty() {
            return Vec::new();
        }

        let domain_events = match self.events.domain_events(domain_id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(domain_id = %domain_id, error = %e, "Failed to load domain events");
                metrics::counter!("recs.store_errors").increment(1);
                self.record_failure();
                return Vec::new();
            }
        };

        let neighbors = self.select_neighbors(session_id, &own_set, domain_events);
        if neighbors.is_empty() {
            return Vec::new();
        }
        let neighbor_count = neighbors.len();

        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        for (neighbor_session, neighbor) in &neighbors {
            // One contribution per (neighbor, product); a purchase anywhere
            // in the neighbor's history outweighs repeated clicks.
            let mut purchased: HashSet<&str> = HashSet::new();
            let mut seen: HashSet<&str> = HashSet::new();
            for event in &neighbor.events {
                if event.purchased {
                    purchased.insert(event.product_id.as_str());
                }
                if event.clicked || event.purchased {
                    seen.insert(event.product_id.as_str());
                }
            }

            for product_id in seen {
                if own_set.contains(product_id)
                    || exclude_product_ids.iter().any(|x| x == product_id)
                {
                    continue;
                }
                let strength = if purchased.contains(product_id) {
                    self.config.purchase_weight
                } else {
                    self.config.click_weight
                };
                let contribution = neighbor.similarity * strength;

                let candidate = candidates.entry(product_id.to_string()).or_default();
                candidate.weight += contribution;
                if purchased.contains(product_id) {
                    candidate.purchase_weight += contribution;
                } else {
                    candidate.click_weight += contribution;
                }
                candidate.neighbors.insert(neighbor_session.clone());
            }
        }

        if candidates.is_empty() {
            return Vec::new();
        }

        // Normalize into [0, 1]: divide by the strongest accumulated
        // weight, or by a fixed ceiling when a single neighbor is the
        // only evidence.
        let max_weight = candidates
            .values()
            .map(|c| c.weight)
            .fold(f64::MIN, f64::max);
        let divisor = if neighbor_count == 1 {
            self.config.single_neighbor_ceiling
        } else {
            max_weight
        };

        let mut results: Vec<RecommendationResult> = candidates
            .into_iter()
            .map(|(product_id, candidate)| {
                let score = (candidate.weight / divisor).min(1.0);
                let reason = if candidate.purchase_weight > candidate.click_weight {
                    "Customers with similar interests also purchased".to_string()
                } else {
                    "Customers with similar interests also viewed".to_string()
                };
                let mut metadata = HashMap::new();
                metadata.insert("raw_weight".to_string(), serde_json::json!(candidate.weight));
                metadata.insert(
                    "neighbor_count".to_string(),
                    serde_json::json!(candidate.neighbors.len()),
                );
                RecommendationResult {
                    product_id,
                    score,
                    algorithm: Algorithm::Collaborative,
                    reason,
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

    /// Group domain events by session, keep sessions whose interaction
    /// sets reach the Jaccard floor, then cap at the configured neighbor
    /// count (ties broken by most recent interaction).
    fn select_neighbors(
        &self,
        session_id: &str,
        own_set: &HashSet<String>,
        domain_events: Vec<RecommendationEvent>,
    ) -> Vec<(String, Neighbor)> {
        let mut by_session: HashMap<String, Vec<RecommendationEvent>> = HashMap::new();
        for event in domain_events {
            if event.session_id == session_id {
                continue;
            }
            by_session
                .entry(event.session_id.clone())
                .or_default()
                .push(event);
        }

        let mut neighbors: Vec<(String, Neighbor)> = by_session
            .into_iter()
            .filter_map(|(session, events)| {
                let set: HashSet<String> = events
                    .iter()
                    .filter(|e| e.clicked || e.purchased)
                    .map(|e| e.product_id.clone())
                    .collect();
                if set.is_disjoint(own_set) {
                    return None;
                }
                let similarity = jaccard_similarity(own_set, &set);
                if similarity < self.config.min_jaccard {
                    return None;
                }
                let last_seen = events
                    .iter()
                    .map(|e| e.timestamp)
                    .max()
                    .unwrap_or_else(Utc::now);
                Some((
                    session,
                    Neighbor {
                        similarity,
                        last_seen,
                        events,
                    },
                ))
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.1.similarity
                .partial_cmp(&a.1.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.last_seen.cmp(&a.1.last_seen))
        });
        neighbors.truncate(self.config.max_neighbors);
        neighbors
    }
}
