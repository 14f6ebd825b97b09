//! Engine configuration. Loaded from environment variables with the
//! prefix `SHOPREC__`; every tunable has a serde default so the zero-config
//! path matches the documented behavior exactly.

use serde::Deserialize;

/// Root engine configuration, one section per component.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub collaborative: CollaborativeConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub popularity: PopularityConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorConfig {
    /// Candidates below this cosine similarity are dropped.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// How many nearest neighbors to pull from the store before
    /// post-filtering references and exclusions.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    /// Budget for the embedding provider before the engine gives up and
    /// returns no results.
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,
}

fn default_min_similarity() -> f64 { 0.7 }
fn default_candidate_pool() -> usize { 50 }
fn default_embed_timeout_ms() -> u64 { 5000 }

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            candidate_pool: default_candidate_pool(),
            embed_timeout_ms: default_embed_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaborativeConfig {
    /// Neighbor sessions below this Jaccard similarity are discarded.
    #[serde(default = "default_min_jaccard")]
    pub min_jaccard: f64,
    /// At most this many neighbor sessions contribute.
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,
    #[serde(default = "default_purchase_weight")]
    pub purchase_weight: f64,
    #[serde(default = "default_click_weight")]
    pub click_weight: f64,
    /// Normalization divisor used when only one neighbor contributes,
    /// instead of the observed maximum.
    #[serde(default = "default_single_neighbor_ceiling")]
    pub single_neighbor_ceiling: f64,
}

fn default_min_jaccard() -> f64 { 0.3 }
fn default_max_neighbors() -> usize { 20 }
fn default_purchase_weight() -> f64 { 3.0 }
fn default_click_weight() -> f64 { 1.0 }
fn default_single_neighbor_ceiling() -> f64 { 3.0 }

impl Default for CollaborativeConfig {
    fn default() -> Self {
        Self {
            min_jaccard: default_min_jaccard(),
            max_neighbors: default_max_neighbors(),
            purchase_weight: default_purchase_weight(),
            click_weight: default_click_weight(),
            single_neighbor_ceiling: default_single_neighbor_ceiling(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Candidates scoring below this are not meaningful recommendations.
    #[serde(default = "default_min_content_score")]
    pub min_score: f64,
    /// Weight of category/tag overlap in the combined score.
    #[serde(default = "default_attribute_weight")]
    pub attribute_weight: f64,
    /// Maximum price-proximity bonus.
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,
    /// Relative price difference beyond which no bonus applies.
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,
}

fn default_min_content_score() -> f64 { 0.2 }
fn default_attribute_weight() -> f64 { 0.85 }
fn default_price_weight() -> f64 { 0.15 }
fn default_price_tolerance() -> f64 { 0.25 }

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_content_score(),
            attribute_weight: default_attribute_weight(),
            price_weight: default_price_weight(),
            price_tolerance: default_price_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularityConfig {
    #[serde(default = "default_purchase_weight")]
    pub purchase_weight: f64,
    #[serde(default = "default_click_weight")]
    pub click_weight: f64,
    /// Weighted counts divide by this and cap at 1.0.
    #[serde(default = "default_normalization_divisor")]
    pub normalization_divisor: f64,
}

fn default_normalization_divisor() -> f64 { 10.0 }

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            purchase_weight: default_purchase_weight(),
            click_weight: default_click_weight(),
            normalization_divisor: default_normalization_divisor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Fallback `detected_intent` keeps this many leading characters.
    #[serde(default = "default_intent_snippet_len")]
    pub intent_snippet_len: usize,
    /// Budget for the structured-completion provider before falling back.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

fn default_intent_snippet_len() -> usize { 200 }
fn default_provider_timeout_ms() -> u64 { 5000 }

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            intent_snippet_len: default_intent_snippet_len(),
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HybridConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize { 5 }
fn default_max_limit() -> usize { 20 }

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SHOPREC")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
