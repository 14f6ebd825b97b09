//! Shared domain types for the recommendation engine: catalog snapshots,
//! interaction events, and the request/response surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A product category as supplied by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

/// Immutable product snapshot supplied by the external catalog.
/// The engine reads these; it never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Decimal price string as the catalog stores it (e.g. `"1,299.99"`).
    /// `None` when the catalog has no price for the product.
    pub price: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Union of category slugs and tags, used by content-based scoring.
    pub fn attribute_set(&self) -> HashSet<String> {
        self.categories
            .iter()
            .map(|c| c.slug.clone())
            .chain(self.tags.iter().cloned())
            .collect()
    }

    /// Parse the catalog price string, tolerating a leading currency
    /// symbol and thousands separators. Returns `None` when absent or
    /// unparseable.
    pub fn price_value(&self) -> Option<f64> {
        let raw = self.price.as_deref()?;
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
    }
}

/// Per-product embedding vector, produced by the external ingestion
/// pipeline. Fixed dimensionality per domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductEmbedding {
    pub domain_id: String,
    pub product_id: String,
    pub vector: Vec<f64>,
}

/// The two interaction kinds the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Purchase,
}

/// One observed interaction. Append-only; the source of truth for the
/// collaborative filter and the popularity fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationEvent {
    pub session_id: String,
    pub domain_id: String,
    pub product_id: String,
    pub clicked: bool,
    pub purchased: bool,
    pub timestamp: DateTime<Utc>,
}

/// Which scoring algorithm produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    VectorSimilarity,
    Collaborative,
    ContentBased,
    Popularity,
    Hybrid,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::VectorSimilarity => "vector_similarity",
            Algorithm::Collaborative => "collaborative",
            Algorithm::ContentBased => "content_based",
            Algorithm::Popularity => "popularity",
            Algorithm::Hybrid => "hybrid",
        }
    }
}

/// A single ranked recommendation. Constructed fresh per request and
/// never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub product_id: String,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
    pub algorithm: Algorithm,
    pub reason: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Request surface exposed to the surrounding application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub domain_id: String,
    pub session_id: Option<String>,
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
    /// Desired result count; defaults to the configured limit when unset.
    pub limit: Option<usize>,
    /// Pin a single algorithm instead of the hybrid fan-out.
    pub algorithm: Option<Algorithm>,
    /// Free-text conversation context fed to the context analyzer.
    pub context: Option<String>,
    #[serde(default)]
    pub exclude_product_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub recommendations: Vec<RecommendationResult>,
    pub algorithm: Algorithm,
    pub execution_time_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// Price bounds extracted from conversation context. Either bound may be
/// open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Structured intent extracted from free-text conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationIntent {
    pub detected_intent: String,
    #[serde(default)]
    pub mentioned_products: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub urgency: Urgency,
}

/// Read-only aggregate view over the event log, for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationMetrics {
    pub total_events: u64,
    pub total_clicks: u64,
    pub total_purchases: u64,
    /// Clicks over total events; 0.0 when the log is empty.
    pub click_through_rate: f64,
    pub unique_products: u64,
    /// Product ids with their weighted interaction counts, descending.
    pub top_products: Vec<(String, u64)>,
}
