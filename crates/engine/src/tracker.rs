//! The engine's only write path: recording click/purchase interactions
//! into the append-only event log, plus the derived metrics view the
//! dashboards read.

use chrono::Utc;
use shoprec_core::config::PopularityConfig;
use shoprec_core::error::RecsResult;
use shoprec_core::metrics::{MetricsEvent, MetricsSink};
use shoprec_core::store::EventStore;
use shoprec_core::types::{EventKind, RecommendationEvent, RecommendationMetrics};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

const TOP_PRODUCTS: usize = 10;

pub struct EventTracker {
    events: Arc<dyn EventStore>,
    metrics: Arc<dyn MetricsSink>,
    config: PopularityConfig,
}

impl EventTracker {
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

    /// Append one interaction to the event log. Sessionless callers
    /// (e.g. a chat widget that only has a conversation id) fall back to
    /// the conversation id as the session key.
    pub async fn track_event(
        &self,
        domain_id: &str,
        product_id: &str,
        kind: EventKind,
        session_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> RecsResult<()> {
        let session_key = session_id.or(conversation_id).unwrap_or("anonymous");
        let event = RecommendationEvent {
            session_id: session_key.to_string(),
            domain_id: domain_id.to_string(),
            product_id: product_id.to_string(),
            clicked: kind == EventKind::Click,
            purchased: kind == EventKind::Purchase,
            timestamp: Utc::now(),
        };
        self.events.append(event).await?;
        self.metrics.record(MetricsEvent::EventTracked { kind });
        info!(domain_id = %domain_id, product_id = %product_id, kind = ?kind, "Interaction tracked");
        Ok(())
    }

    /// Aggregate stats over the domain's event log.
    pub async fn metrics(&self, domain_id: &str) -> RecsResult<RecommendationMetrics> {
        let events = self.events.domain_events(domain_id).await?;

        let mut clicks: u64 = 0;
        let mut purchases: u64 = 0;
        let mut per_product: HashMap<String, (u64, u64)> = HashMap::new();
        for event in &events {
            let counts = per_product.entry(event.product_id.clone()).or_default();
            if event.clicked {
                clicks += 1;
                counts.0 += 1;
            }
            if event.purchased {
                purchases += 1;
                counts.1 += 1;
            }
        }

        let total_events = events.len() as u64;
        let unique_products = per_product.len() as u64;
        let mut top_products: Vec<(String, u64)> = per_product
            .into_iter()
            .map(|(product_id, (clicks, purchases))| {
                let weighted = (purchases as f64 * self.config.purchase_weight
                    + clicks as f64 * self.config.click_weight)
                    .round() as u64;
                (product_id, weighted)
            })
            .collect();
        top_products.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_products.truncate(TOP_PRODUCTS);

        Ok(RecommendationMetrics {
            total_events,
            total_clicks: clicks,
            total_purchases: purchases,
            click_through_rate: if total_events == 0 {
                0.0
            } else {
                clicks as f64 / total_events as f64
            },
            unique_products,
            top_products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoprec_core::metrics::{capture_metrics, noop_metrics};
    use shoprec_core::store::MemoryStore;

    fn tracker(store: Arc<MemoryStore>) -> EventTracker {
        EventTracker::new(store, noop_metrics(), PopularityConfig::default())
    }

    #[tokio::test]
    async fn test_track_event_appends_to_log() {
        let store = Arc::new(MemoryStore::new());
        let tracker = tracker(store.clone());
        tracker
            .track_event("shop", "p1", EventKind::Click, Some("s1"), None)
            .await
            .unwrap();
        tracker
            .track_event("shop", "p1", EventKind::Purchase, Some("s1"), None)
            .await
            .unwrap();

        let events = store.domain_events("shop").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].clicked && !events[0].purchased);
        assert!(events[1].purchased && !events[1].clicked);
    }

    #[tokio::test]
    async fn test_session_key_falls_back_to_conversation() {
        let store = Arc::new(MemoryStore::new());
        let tracker = tracker(store.clone());
        tracker
            .track_event("shop", "p1", EventKind::Click, None, Some("conv-7"))
            .await
            .unwrap();
        tracker
            .track_event("shop", "p2", EventKind::Click, None, None)
            .await
            .unwrap();

        assert_eq!(store.session_events("shop", "conv-7").await.unwrap().len(), 1);
        assert_eq!(
            store.session_events("shop", "anonymous").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_metrics_aggregates_log() {
        let store = Arc::new(MemoryStore::new());
        let tracker = tracker(store);
        for _ in 0..3 {
            tracker
                .track_event("shop", "hot", EventKind::Click, Some("s1"), None)
                .await
                .unwrap();
        }
        tracker
            .track_event("shop", "hot", EventKind::Purchase, Some("s1"), None)
            .await
            .unwrap();
        tracker
            .track_event("shop", "warm", EventKind::Click, Some("s2"), None)
            .await
            .unwrap();

        let metrics = tracker.metrics("shop").await.unwrap();
        assert_eq!(metrics.total_events, 5);
        assert_eq!(metrics.total_clicks, 4);
        assert_eq!(metrics.total_purchases, 1);
        assert!((metrics.click_through_rate - 0.8).abs() < 1e-9);
        assert_eq!(metrics.unique_products, 2);
        // hot: 1 purchase × 3 + 3 clicks = 6; warm: 1.
        assert_eq!(metrics.top_products[0], ("hot".to_string(), 6));
        assert_eq!(metrics.top_products[1], ("warm".to_string(), 1));
    }

    #[tokio::test]
    async fn test_metrics_empty_log() {
        let store = Arc::new(MemoryStore::new());
        let metrics = tracker(store).metrics("shop").await.unwrap();
        assert_eq!(metrics.total_events, 0);
        assert_eq!(metrics.click_through_rate, 0.0);
        assert!(metrics.top_products.is_empty());
    }

    #[tokio::test]
    async fn test_tracked_events_reach_metrics_sink() {
        let store = Arc::new(MemoryStore::new());
        let sink = capture_metrics();
        let tracker = EventTracker::new(store, sink.clone(), PopularityConfig::default());
        tracker
            .track_event("shop", "p1", EventKind::Purchase, Some("s1"), None)
            .await
            .unwrap();

        assert!(sink.events().contains(&MetricsEvent::EventTracked {
            kind: EventKind::Purchase,
        }));
    }
}
