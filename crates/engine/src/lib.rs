//! Product recommendation engine: four independent scoring algorithms
//! (vector similarity, collaborative filtering, content-based filtering,
//! popularity) merged by a hybrid orchestrator, plus conversational
//! intent analysis and the interaction-event write path.

pub mod collaborative;
pub mod content;
pub mod context;
pub mod hybrid;
pub mod popularity;
pub mod tracker;
pub mod vector;

pub use collaborative::CollaborativeFilterEngine;
pub use content::ContentBasedEngine;
pub use context::ContextAnalyzer;
pub use hybrid::HybridRecommender;
pub use popularity::PopularityEngine;
pub use tracker::EventTracker;
pub use vector::VectorSimilarityEngine;
