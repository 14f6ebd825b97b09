//! Dependency-injected metrics sink. Components accept an
//! `Arc<dyn MetricsSink>` rather than reaching for process-wide state, so
//! tests can capture exactly what the engine recorded.

use crate::types::{Algorithm, EventKind};
use parking_lot::Mutex;
use std::sync::Arc;

/// One observation emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsEvent {
    /// An algorithm finished (possibly with zero results).
    AlgorithmRun {
        algorithm: Algorithm,
        result_count: usize,
        duration_ms: u64,
    },
    /// An algorithm's upstream failed and it degraded to empty results.
    AlgorithmFailure { algorithm: Algorithm },
    /// An interaction event was written to the log.
    EventTracked { kind: EventKind },
}

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

/// No-op sink for callers that don't collect metrics.
pub struct NoOpMetrics;

impl MetricsSink for NoOpMetrics {
    fn record(&self, _event: MetricsEvent) {}
}

/// In-memory sink that captures observations for testing.
#[derive(Default)]
pub struct CaptureMetrics {
    events: Mutex<Vec<MetricsEvent>>,
}

impl CaptureMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn failures_for(&self, algorithm: Algorithm) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, MetricsEvent::AlgorithmFailure { algorithm: a } if *a == algorithm))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl MetricsSink for CaptureMetrics {
    fn record(&self, event: MetricsEvent) {
        self.events.lock().push(event);
    }
}

/// Convenience: a no-op sink for callers that don't need metrics.
pub fn noop_metrics() -> Arc<dyn MetricsSink> {
    Arc::new(NoOpMetrics)
}

/// Convenience: a capture sink for tests.
pub fn capture_metrics() -> Arc<CaptureMetrics> {
    Arc::new(CaptureMetrics::new())
}
