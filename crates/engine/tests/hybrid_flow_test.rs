//! End-to-end recommendation flow: interactions tracked through the
//! event tracker feed the collaborative and popularity signals of a
//! subsequent hybrid request.

use shoprec_core::config::EngineConfig;
use shoprec_core::metrics::capture_metrics;
use shoprec_core::providers::{StaticEmbedder, UnavailableIntentProvider};
use shoprec_core::store::MemoryStore;
use shoprec_core::types::{
    Algorithm, Category, EventKind, Product, ProductEmbedding, RecommendationRequest,
};
use shoprec_engine::{EventTracker, HybridRecommender};
use std::sync::Arc;

const DOMAIN: &str = "shop.example.com";

fn product(id: &str, price: &str) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        price: Some(price.into()),
        categories: vec![Category {
            name: "Outdoor".into(),
            slug: "outdoor".into(),
        }],
        tags: vec![],
        description: String::new(),
    }
}

fn request(session_id: Option<&str>) -> RecommendationRequest {
    RecommendationRequest {
        domain_id: DOMAIN.into(),
        session_id: session_id.map(String::from),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_neighbor_purchase_surfaces_through_hybrid() {
    let store = Arc::new(MemoryStore::new());
    for id in ["prod-1", "prod-2", "prod-9", "prod-10"] {
        store.insert_product(DOMAIN, product(id, "40"));
    }

    let tracker = EventTracker::new(
        store.clone(),
        shoprec_core::metrics::noop_metrics(),
        Default::default(),
    );
    // Visitor session viewed prod-1 and prod-2.
    for id in ["prod-1", "prod-2"] {
        tracker
            .track_event(DOMAIN, id, EventKind::Click, Some("visitor"), None)
            .await
            .unwrap();
    }
    // Neighbor session overlaps on both (Jaccard 2/4 = 0.5) and
    // purchased prod-9.
    for id in ["prod-1", "prod-2", "prod-10"] {
        tracker
            .track_event(DOMAIN, id, EventKind::Click, Some("neighbor"), None)
            .await
            .unwrap();
    }
    tracker
        .track_event(DOMAIN, "prod-9", EventKind::Purchase, Some("neighbor"), None)
        .await
        .unwrap();

    let recommender = HybridRecommender::new(
        store.clone(),
        store,
        Arc::new(StaticEmbedder::new()),
        Arc::new(UnavailableIntentProvider),
        shoprec_core::metrics::noop_metrics(),
        EngineConfig::default(),
    );
    let response = recommender.recommend(&request(Some("visitor"))).await.unwrap();

    let prod9 = response
        .recommendations
        .iter()
        .find(|r| r.product_id == "prod-9")
        .expect("neighbor's purchase should surface");
    assert!(prod9.score > 0.0);
    let contributors = prod9
        .metadata
        .get("algorithms")
        .and_then(|v| v.as_array())
        .expect("merged results carry contributor metadata");
    assert!(contributors.contains(&serde_json::json!("collaborative")));

    // The visitor's own history never recommends itself.
    assert!(response
        .recommendations
        .iter()
        .all(|r| r.product_id != "prod-1" && r.product_id != "prod-2"));
    assert_eq!(response.algorithm, Algorithm::Hybrid);
}

#[tokio::test]
async fn test_cold_start_then_warm_catalog() {
    let store = Arc::new(MemoryStore::new());
    let recommender = HybridRecommender::new(
        store.clone(),
        store.clone(),
        Arc::new(StaticEmbedder::new().with_default(vec![1.0, 0.0])),
        Arc::new(UnavailableIntentProvider),
        shoprec_core::metrics::noop_metrics(),
        EngineConfig::default(),
    );

    // Nothing ingested, nothing tracked: empty result, not an error.
    let cold = recommender.recommend(&request(None)).await.unwrap();
    assert!(cold.recommendations.is_empty());

    // Ingest embeddings and one click; the same request now finds signal.
    store.insert_product(DOMAIN, product("prod-a", "25"));
    store.insert_embedding(ProductEmbedding {
        domain_id: DOMAIN.into(),
        product_id: "prod-a".into(),
        vector: vec![0.9, 0.1],
    });
    let tracker = EventTracker::new(
        store.clone(),
        shoprec_core::metrics::noop_metrics(),
        Default::default(),
    );
    tracker
        .track_event(DOMAIN, "prod-a", EventKind::Click, Some("someone"), None)
        .await
        .unwrap();

    let mut warm_request = request(None);
    warm_request.context = Some("camping gear".into());
    let warm = recommender.recommend(&warm_request).await.unwrap();
    assert!(!warm.recommendations.is_empty());
    assert!(warm
        .recommendations
        .iter()
        .any(|r| r.product_id == "prod-a"));
}

#[tokio::test]
async fn test_limit_defaults_to_five() {
    let store = Arc::new(MemoryStore::new());
    let tracker = EventTracker::new(
        store.clone(),
        shoprec_core::metrics::noop_metrics(),
        Default::default(),
    );
    for i in 0..12 {
        tracker
            .track_event(
                DOMAIN,
                &format!("prod-{i}"),
                EventKind::Click,
                Some("busy"),
                None,
            )
            .await
            .unwrap();
    }

    let recommender = HybridRecommender::new(
        store.clone(),
        store,
        Arc::new(StaticEmbedder::new()),
        Arc::new(UnavailableIntentProvider),
        shoprec_core::metrics::noop_metrics(),
        EngineConfig::default(),
    );
    let response = recommender.recommend(&request(None)).await.unwrap();
    assert_eq!(response.recommendations.len(), 5);
}

#[tokio::test]
async fn test_dashboard_metrics_reflect_tracked_events() {
    let store = Arc::new(MemoryStore::new());
    let sink = capture_metrics();
    let tracker = EventTracker::new(store.clone(), sink.clone(), Default::default());

    tracker
        .track_event(DOMAIN, "prod-1", EventKind::Click, Some("s1"), None)
        .await
        .unwrap();
    tracker
        .track_event(DOMAIN, "prod-1", EventKind::Purchase, Some("s1"), None)
        .await
        .unwrap();

    let metrics = tracker.metrics(DOMAIN).await.unwrap();
    assert_eq!(metrics.total_events, 2);
    assert_eq!(metrics.total_purchases, 1);
    assert_eq!(metrics.top_products[0].0, "prod-1");
    assert_eq!(sink.count(), 2);
}
