//! Product/event store seam. The real deployment backs these traits with
//! the platform's database; `MemoryStore` is a DashMap-backed
//! implementation used by tests and local runs.
//!
//! Store failures never propagate through the engine boundary: callers
//! catch errors at the algorithm level and treat them as "no signal".

use crate::error::{RecsError, RecsResult};
use crate::similarity::cosine_similarity;
use crate::types::{Product, ProductEmbedding, RecommendationEvent};
use async_trait::async_trait;
use dashmap::DashMap;

/// Read access to the product catalog and its embeddings.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products in a domain.
    async fn products(&self, domain_id: &str) -> RecsResult<Vec<Product>>;

    /// A single product by id.
    async fn product(&self, domain_id: &str, product_id: &str) -> RecsResult<Option<Product>>;

    /// The stored embedding for a product, if the ingestion pipeline has
    /// produced one.
    async fn embedding(&self, domain_id: &str, product_id: &str) -> RecsResult<Option<Vec<f64>>>;

    /// Nearest stored embeddings to a query vector, by cosine similarity,
    /// best first. The store performs the search; callers post-filter.
    async fn nearest_embeddings(
        &self,
        domain_id: &str,
        query: &[f64],
        limit: usize,
    ) -> RecsResult<Vec<(String, f64)>>;
}

/// Read/append access to the interaction event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events recorded for one session in a domain.
    async fn session_events(
        &self,
        domain_id: &str,
        session_id: &str,
    ) -> RecsResult<Vec<RecommendationEvent>>;

    /// All events in a domain.
    async fn domain_events(&self, domain_id: &str) -> RecsResult<Vec<RecommendationEvent>>;

    /// Append one event. This is the engine's only write path.
    async fn append(&self, event: RecommendationEvent) -> RecsResult<()>;
}

/// In-memory store implementing both seams.
#[derive(Default)]
pub struct MemoryStore {
    products: DashMap<(String, String), Product>,
    embeddings: DashMap<(String, String), Vec<f64>>,
    events: DashMap<String, Vec<RecommendationEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, domain_id: &str, product: Product) {
        self.products
            .insert((domain_id.to_string(), product.id.clone()), product);
    }

    pub fn insert_embedding(&self, embedding: ProductEmbedding) {
        self.embeddings.insert(
            (embedding.domain_id.clone(), embedding.product_id.clone()),
            embedding.vector,
        );
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn products(&self, domain_id: &str) -> RecsResult<Vec<Product>> {
        Ok(self
            .products
            .iter()
            .filter(|entry| entry.key().0 == domain_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn product(&self, domain_id: &str, product_id: &str) -> RecsResult<Option<Product>> {
        Ok(self
            .products
            .get(&(domain_id.to_string(), product_id.to_string()))
            .map(|p| p.clone()))
    }

    async fn embedding(&self, domain_id: &str, product_id: &str) -> RecsResult<Option<Vec<f64>>> {
        Ok(self
            .embeddings
            .get(&(domain_id.to_string(), product_id.to_string()))
            .map(|v| v.clone()))
    }

    async fn nearest_embeddings(
        &self,
        domain_id: &str,
        query: &[f64],
        limit: usize,
    ) -> RecsResult<Vec<(String, f64)>> {
        let mut scored: Vec<(String, f64)> = self
            .embeddings
            .iter()
            .filter(|entry| entry.key().0 == domain_id)
            .map(|entry| {
                (
                    entry.key().1.clone(),
                    cosine_similarity(query, entry.value()),
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn session_events(
        &self,
        domain_id: &str,
        session_id: &str,
    ) -> RecsResult<Vec<RecommendationEvent>> {
        Ok(self
            .events
            .get(domain_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.session_id == session_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn domain_events(&self, domain_id: &str) -> RecsResult<Vec<RecommendationEvent>> {
        Ok(self
            .events
            .get(domain_id)
            .map(|events| events.clone())
            .unwrap_or_default())
    }

    async fn append(&self, event: RecommendationEvent) -> RecsResult<()> {
        self.events
            .entry(event.domain_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }
}

/// Store that fails every operation, for exercising the degraded path.
pub struct UnavailableStore;

#[async_trait]
impl ProductStore for UnavailableStore {
    async fn products(&self, _domain_id: &str) -> RecsResult<Vec<Product>> {
        Err(RecsError::Store("store unavailable".into()))
    }

    async fn product(&self, _domain_id: &str, _product_id: &str) -> RecsResult<Option<Product>> {
        Err(RecsError::Store("store unavailable".into()))
    }

    async fn embedding(&self, _domain_id: &str, _product_id: &str) -> RecsResult<Option<Vec<f64>>> {
        Err(RecsError::Store("store unavailable".into()))
    }

    async fn nearest_embeddings(
        &self,
        _domain_id: &str,
        _query: &[f64],
        _limit: usize,
    ) -> RecsResult<Vec<(String, f64)>> {
        Err(RecsError::Store("store unavailable".into()))
    }
}

#[async_trait]
impl EventStore for UnavailableStore {
    async fn session_events(
        &self,
        _domain_id: &str,
        _session_id: &str,
    ) -> RecsResult<Vec<RecommendationEvent>> {
        Err(RecsError::Store("store unavailable".into()))
    }

    async fn domain_events(&self, _domain_id: &str) -> RecsResult<Vec<RecommendationEvent>> {
        Err(RecsError::Store("store unavailable".into()))
    }

    async fn append(&self, _event: RecommendationEvent) -> RecsResult<()> {
        Err(RecsError::Store("store unavailable".into()))
    }
}
