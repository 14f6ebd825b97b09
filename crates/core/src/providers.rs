//! Provider seams for the two network-bound collaborators: embedding
//! generation and structured intent extraction. Both are injected as
//! trait objects so the engine can be exercised with deterministic
//! implementations and degraded with always-failing ones.

use crate::error::{RecsError, RecsResult};
use crate::types::ConversationIntent;
use async_trait::async_trait;
use std::collections::HashMap;

/// Turns free text into an embedding vector. Failure means "no vector
/// available", never a hard error for the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> RecsResult<Vec<f64>>;
}

/// Extracts structured purchase intent from conversation text via an
/// external structured-completion provider.
#[async_trait]
pub trait IntentProvider: Send + Sync {
    async fn extract_intent(&self, text: &str) -> RecsResult<ConversationIntent>;
}

/// Deterministic embedder backed by a fixed text → vector map, with an
/// optional default vector for unknown inputs.
#[derive(Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f64>>,
    default: Option<Vec<f64>>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f64>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    pub fn with_default(mut self, vector: Vec<f64>) -> Self {
        self.default = Some(vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> RecsResult<Vec<f64>> {
        self.vectors
            .get(text)
            .cloned()
            .or_else(|| self.default.clone())
            .ok_or_else(|| RecsError::Embedding(format!("no embedding for input: {text}")))
    }
}

/// Embedder that always fails, for exercising the no-vector path.
pub struct UnavailableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnavailableEmbedder {
    async fn embed(&self, _text: &str) -> RecsResult<Vec<f64>> {
        Err(RecsError::Embedding("embedding provider unavailable".into()))
    }
}

/// Intent provider that replays a canned JSON payload. The payload goes
/// through serde like a real provider response would, so a malformed
/// payload surfaces as a `Serialization` error and triggers the
/// deterministic fallback downstream.
pub struct StaticIntentProvider {
    payload: String,
}

impl StaticIntentProvider {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl IntentProvider for StaticIntentProvider {
    async fn extract_intent(&self, _text: &str) -> RecsResult<ConversationIntent> {
        let intent: ConversationIntent = serde_json::from_str(&self.payload)?;
        Ok(intent)
    }
}

/// Intent provider that always fails, for exercising the fallback path.
pub struct UnavailableIntentProvider;

#[async_trait]
impl IntentProvider for UnavailableIntentProvider {
    async fn extract_intent(&self, _text: &str) -> RecsResult<ConversationIntent> {
        Err(RecsError::Intent("intent provider unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Urgency;

    #[tokio::test]
    async fn test_static_embedder_lookup_and_default() {
        let embedder = StaticEmbedder::new()
            .with_vector("laptop", vec![1.0, 0.0])
            .with_default(vec![0.5, 0.5]);
        assert_eq!(embedder.embed("laptop").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(embedder.embed("unknown").await.unwrap(), vec![0.5, 0.5]);

        let strict = StaticEmbedder::new().with_vector("laptop", vec![1.0]);
        assert!(strict.embed("unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_static_intent_provider_parses_payload() {
        let provider = StaticIntentProvider::new(
            r#"{"detected_intent":"buy a laptop","mentioned_products":["laptop"],"price_range":{"min":100.0,"max":500.0},"urgency":"high"}"#,
        );
        let intent = provider.extract_intent("anything").await.unwrap();
        assert_eq!(intent.detected_intent, "buy a laptop");
        assert_eq!(intent.urgency, Urgency::High);
        assert_eq!(intent.price_range.unwrap().max, Some(500.0));
    }

    #[tokio::test]
    async fn test_static_intent_provider_rejects_malformed_payload() {
        let provider = StaticIntentProvider::new("{not json");
        assert!(provider.extract_intent("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable_providers_fail() {
        assert!(UnavailableEmbedder.embed("text").await.is_err());
        assert!(UnavailableIntentProvider
            .extract_intent("text")
            .await
            .is_err());
    }
}
