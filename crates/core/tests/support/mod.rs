//! Shared test helpers for `bulwark-core` integration tests.
//!
//! Fixtures build orchestrators on mock time with a shared metrics collector,
//! so scenarios can assert on breaker state and recorded events together.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bulwark_common::error::UpstreamError;
use bulwark_common::resilience::MockClock;
use bulwark_core::{
    AlertThresholds, MetricsCollector, Orchestrator, OrchestratorBuilder, ResilienceSettings,
    RetentionPolicy,
};

/// Orchestrator on mock time plus handles to its clock and collector
pub struct Harness {
    pub orchestrator: Orchestrator<MockClock>,
    pub clock: MockClock,
    pub metrics: Arc<MetricsCollector<MockClock>>,
}

impl Harness {
    pub fn new(settings: ResilienceSettings) -> Self {
        let clock = MockClock::new();
        let metrics = Arc::new(MetricsCollector::with_clock(
            RetentionPolicy::default(),
            AlertThresholds::default(),
            clock.clone(),
        ));
        let orchestrator = OrchestratorBuilder::new(settings)
            .with_clock(Arc::new(clock.clone()))
            .with_metrics(Arc::clone(&metrics))
            .with_config_source("test")
            .build()
            .expect("test settings should be valid");
        Self { orchestrator, clock, metrics }
    }
}

/// Counts invocations of a wrapped call
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn network_error() -> UpstreamError {
    UpstreamError::network("connection reset by peer")
}

pub fn bad_request() -> UpstreamError {
    UpstreamError::http(400, "missing field 'text'")
}
