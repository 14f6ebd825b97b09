//! Attribute-overlap content filtering: score catalog products against
//! one or more reference products by shared categories/tags, with a
//! price-proximity bonus.

use shoprec_core::config::ContentConfig;
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::similarity::jaccard_similarity;
use shoprec_core::store::ProductStore;
use shoprec_core::types::{Algorithm, Product, RecommendationResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

pub struct ContentBasedEngine {
    store: Arc<dyn ProductStore>,
    metrics: Arc<dyn MetricsSink>,
    config: ContentConfig,
}

impl ContentBasedEngine {
    pub fn new(
        store: Arc<dyn ProductStore>,
        metrics: Arc<dyn MetricsSink>,
        config: ContentConfig,
    ) -> Self {
        Self {
            store,
            metrics,
            config,
        }
    }

    fn record_failure(&self) {
        self.metrics.record(MetricsEvent::AlgorithmFailure {
            algorithm: Algorithm::ContentBased,
        });
    }

    pub async fn recommend(
        &self,
        domain_id: &str,
        reference_product_ids: &[String],
        exclude_product_ids: &[String],
        limit: usize,
    ) -> Vec<RecommendationResult> {
        if reference_product_ids.is_empty() {
            return Vec::new();
        }

        let mut references: Vec<Product> = Vec::new();
        for product_id in reference_product_ids {
            match self.store.product(domain_id, product_id).await {
                Ok(Some(product)) => references.push(product),
                Ok(None) => {}
                Err(e) => {
                    warn!(domain_id = %domain_id, product_id = %product_id, error = %e,
                        "Failed to load reference product");
                    metrics::counter!("recs.store_errors").increment(1);
                }
            }
        }
        if references.is_empty() {
            return Vec::new();
        }

        let reference_attributes: HashSet<String> = references
            .iter()
            .flat_map(|p| p.attribute_set())
            .collect();
        // slug → display name, for reason strings.
        let reference_categories: HashMap<String, String> = references
            .iter()
            .flat_map(|p| p.categories.iter())
            .map(|c| (c.slug.clone(), c.name.clone()))
            .collect();
        let reference_price = mean_price(&references);

        let candidates = match self.store.products(domain_id).await {
            Ok(products) => products,
            Err(e) => {
                warn!(domain_id = %domain_id, error = %e, "Failed to load catalog");
                metrics::counter!("recs.store_errors").increment(1);
                self.record_failure();
                return Vec::new();
            }
        };

        let mut results: Vec<RecommendationResult> = candidates
            .into_iter()
            .filter(|candidate| {
                !reference_product_ids.iter().any(|r| *r == candidate.id)
                    && !exclude_product_ids.iter().any(|x| *x == candidate.id)
            })
            .filter_map(|candidate| {
                let attributes = candidate.attribute_set();
                let overlap = jaccard_similarity(&attributes, &reference_attributes);
                let price_bonus = self.price_bonus(reference_price, candidate.price_value());
                let score = (self.config.attribute_weight * overlap + price_bonus).min(1.0);
                if score < self.config.min_score {
                    return None;
                }

                let shared: Vec<String> = attributes
                    .intersection(&reference_attributes)
                    .cloned()
                    .collect();
                let shared_category = candidate
                    .categories
                    .iter()
                    .find(|c| reference_categories.contains_key(&c.slug))
                    .map(|c| c.name.clone());

                let reason = self.reason(score, shared_category.as_deref());
                let mut metadata = HashMap::new();
                metadata.insert("shared_attributes".to_string(), serde_json::json!(shared));

                Some(RecommendationResult {
                    product_id: candidate.id,
                    score,
                    algorithm: Algorithm::ContentBased,
                    reason,
                    metadata,
                })
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

    /// Linear bonus up to `price_weight` when both prices are known and
    /// within the tolerance band; nothing otherwise.
    fn price_bonus(&self, reference: Option<f64>, candidate: Option<f64>) -> f64 {
        let (reference, candidate) = match (reference, candidate) {
            (Some(r), Some(c)) if r > 0.0 => (r, c),
            _ => return 0.0,
        };
        let relative_diff = (candidate - reference).abs() / reference;
        if relative_diff > self.config.price_tolerance {
            return 0.0;
        }
        self.config.price_weight * (1.0 - relative_diff / self.config.price_tolerance)
    }

    fn reason(&self, score: f64, shared_category: Option<&str>) -> String {
        if score >= 0.85 {
            match shared_category {
                Some(name) => format!("Very similar product in {name}"),
                None => "Very similar product".to_string(),
            }
        } else if score >= 0.75 {
            "Similar category and price range".to_string()
        } else {
            match shared_category {
                Some(name) => format!("Related product in {name}"),
                None => "Related product".to_string(),
            }
        }
    }
}

fn mean_price(products: &[Product]) -> Option<f64> {
    let prices: Vec<f64> = products.iter().filter_map(|p| p.price_value()).collect();
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoprec_core::metrics::noop_metrics;
    use shoprec_core::store::MemoryStore;
    use shoprec_core::types::Category;

    fn product(id: &str, price: &str, category: (&str, &str), tags: &[&str]) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            price: Some(price.into()),
            categories: vec![Category {
                name: category.0.into(),
                slug: category.1.into(),
            }],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: String::new(),
        }
    }

    fn engine(store: Arc<MemoryStore>) -> ContentBasedEngine {
        ContentBasedEngine::new(store, noop_metrics(), ContentConfig::default())
    }

    #[tokio::test]
    async fn test_identical_attributes_score_very_similar() {
        let store = Arc::new(MemoryStore::new());
        store.insert_product(
            "shop",
            product("ref", "100", ("Electronics", "electronics"), &["usb"]),
        );
        store.insert_product(
            "shop",
            product("twin", "105", ("Electronics", "electronics"), &["usb"]),
        );

        let refs = vec!["ref".to_string()];
        let results = engine(store).recommend("shop", &refs, &[], 10).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].score >= 0.85);
        assert_eq!(results[0].reason, "Very similar product in Electronics");
    }

    #[tokio::test]
    async fn test_no_overlap_far_price_filtered_out() {
        let store = Arc::new(MemoryStore::new());
        store.insert_product(
            "shop",
            product("ref", "100", ("Electronics", "electronics"), &[]),
        );
        store.insert_product(
            "shop",
            product("other", "900", ("Garden", "garden"), &["outdoor"]),
        );

        let refs = vec!["ref".to_string()];
        let results = engine(store).recommend("shop", &refs, &[], 10).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_partial_overlap_gets_related_reason() {
        let store = Arc::new(MemoryStore::new());
        store.insert_product(
            "shop",
            product("ref", "100", ("Electronics", "electronics"), &["usb", "cable"]),
        );
        store.insert_product(
            "shop",
            product("partial", "400", ("Electronics", "electronics"), &["wireless"]),
        );

        let refs = vec!["ref".to_string()];
        let results = engine(store).recommend("shop", &refs, &[], 10).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].score < 0.75);
        assert_eq!(results[0].reason, "Related product in Electronics");
        let shared = results[0].metadata.get("shared_attributes").unwrap();
        assert!(shared
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("electronics")));
    }

    #[tokio::test]
    async fn test_price_proximity_breaks_ties() {
        let store = Arc::new(MemoryStore::new());
        store.insert_product(
            "shop",
            product("ref", "100", ("Electronics", "electronics"), &[]),
        );
        store.insert_product(
            "shop",
            product("near", "102", ("Electronics", "electronics"), &[]),
        );
        store.insert_product(
            "shop",
            product("far", "500", ("Electronics", "electronics"), &[]),
        );

        let refs = vec!["ref".to_string()];
        let results = engine(store).recommend("shop", &refs, &[], 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].product_id, "near");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_references_and_exclusions_absent() {
        let store = Arc::new(MemoryStore::new());
        for id in ["ref", "a", "b"] {
            store.insert_product("shop", product(id, "100", ("Gadgets", "gadgets"), &[]));
        }

        let refs = vec!["ref".to_string()];
        let excluded = vec!["a".to_string()];
        let results = engine(store).recommend("shop", &refs, &excluded, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].product_id, "b");
    }

    #[tokio::test]
    async fn test_unknown_references_yield_empty() {
        let store = Arc::new(MemoryStore::new());
        store.insert_product("shop", product("a", "100", ("Gadgets", "gadgets"), &[]));
        let refs = vec!["missing".to_string()];
        assert!(engine(store).recommend("shop", &refs, &[], 10).await.is_empty());
    }
}
