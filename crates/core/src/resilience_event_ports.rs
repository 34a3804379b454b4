//! Resilience event port - where the orchestrator reports what happened
//!
//! The orchestrator never talks to a metrics backend directly. It emits
//! [`MetricsEvent`]s through this port; the in-process [`MetricsCollector`]
//! is the usual implementation, and hosts may forward events elsewhere.
//!
//! [`MetricsCollector`]: crate::metrics::MetricsCollector

use std::sync::Arc;

use bulwark_common::resilience::{
    AttemptObserver, AttemptRecord, CallOutcome, CallSummary, CircuitState, TransitionListener,
};

use crate::metrics::MetricsEvent;

/// Port trait for resilience event delivery
///
/// Implementations must be thread-safe, fast and infallible from the
/// caller's point of view: recording problems are logged and swallowed, never
/// returned to the code path that produced the event.
pub trait ResilienceEventSink: Send + Sync {
    /// Record a single event
    fn record(&self, event: MetricsEvent);
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl ResilienceEventSink for NoopEventSink {
    fn record(&self, _event: MetricsEvent) {}
}

/// Adapts a sink to the observer hooks of breakers and executors
pub(crate) struct SinkAdapter {
    sink: Arc<dyn ResilienceEventSink>,
}

impl SinkAdapter {
    pub(crate) fn new(sink: Arc<dyn ResilienceEventSink>) -> Self {
        Self { sink }
    }
}

impl AttemptObserver for SinkAdapter {
    fn on_attempt(&self, record: &AttemptRecord) {
        self.sink.record(MetricsEvent::Attempt(record.clone()));
    }

    fn on_call_complete(&self, summary: &CallSummary) {
        let event = if summary.outcome == CallOutcome::Rejected {
            MetricsEvent::CallRejected { operation: summary.operation.to_string() }
        } else {
            MetricsEvent::CallCompleted {
                operation: summary.operation.to_string(),
                outcome: summary.outcome,
                attempts: summary.attempts,
                latency: summary.latency,
            }
        };
        self.sink.record(event);
    }
}

impl TransitionListener for SinkAdapter {
    fn on_transition(&self, operation: &str, from: CircuitState, to: CircuitState) {
        self.sink.record(MetricsEvent::CircuitTransition {
            operation: operation.to_string(),
            from,
            to,
        });
    }
}
