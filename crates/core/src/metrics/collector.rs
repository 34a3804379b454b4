//! In-process metrics collector

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bulwark_common::error::ErrorSeverity;
use bulwark_common::resilience::{AttemptOutcome, CallOutcome, CircuitState, Clock, SystemClock};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{
    Alert, AlertKind, AlertThresholds, ConfigLoadRecord, MetricsEvent, MetricsSnapshot,
    RetentionPolicy,
};
use crate::resilience_event_ports::ResilienceEventSink;

#[derive(Debug, Clone, Copy)]
enum Entry {
    Attempt { retry: bool, outcome: AttemptOutcome },
    Call { outcome: CallOutcome, latency: Duration },
    Transition { to: CircuitState },
    Rejected,
}

#[derive(Debug)]
struct OperationBuffer {
    entries: VecDeque<(Instant, Entry)>,
    circuit_state: CircuitState,
}

impl OperationBuffer {
    fn new() -> Self {
        Self { entries: VecDeque::new(), circuit_state: CircuitState::Closed }
    }

    /// Drop entries older than `cutoff`; returns how many were removed
    fn prune_before(&mut self, cutoff: Option<Instant>) -> usize {
        let Some(cutoff) = cutoff else { return 0 };
        let before = self.entries.len();
        while self.entries.front().is_some_and(|(at, _)| *at < cutoff) {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }
}

/// Thread-safe, bounded metrics collector
///
/// Writes touch only the buffer of the event's operation. Reads aggregate
/// whatever is buffered at that moment; concurrent writers may or may not be
/// included.
///
/// # Example
/// ```
/// use bulwark_core::metrics::{MetricsCollector, MetricsEvent};
/// use bulwark_core::ResilienceEventSink;
///
/// let collector = MetricsCollector::new();
/// collector.record(MetricsEvent::CallRejected { operation: "qa".into() });
/// assert_eq!(collector.snapshot(Some("qa")).rejections, 1);
/// ```
pub struct MetricsCollector<C: Clock = SystemClock> {
    policy: RetentionPolicy,
    thresholds: AlertThresholds,
    clock: C,
    operations: DashMap<String, OperationBuffer>,
    config_events: Mutex<VecDeque<(Instant, ConfigLoadRecord)>>,
    dropped_events: AtomicU64,
}

impl<C: Clock> fmt::Debug for MetricsCollector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("policy", &self.policy)
            .field("thresholds", &self.thresholds)
            .field("operations", &self.operations.len())
            .field("dropped_events", &self.dropped_events.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MetricsCollector<SystemClock> {
    /// Collector with default retention and thresholds
    pub fn new() -> Self {
        Self::with_clock(RetentionPolicy::default(), AlertThresholds::default(), SystemClock)
    }

    pub fn with_policy(policy: RetentionPolicy, thresholds: AlertThresholds) -> Self {
        Self::with_clock(policy, thresholds, SystemClock)
    }
}

impl Default for MetricsCollector<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MetricsCollector<C> {
    pub fn with_clock(policy: RetentionPolicy, thresholds: AlertThresholds, clock: C) -> Self {
        Self {
            policy,
            thresholds,
            clock,
            operations: DashMap::new(),
            config_events: Mutex::new(VecDeque::new()),
            dropped_events: AtomicU64::new(0),
        }
    }

    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub const fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Events dropped because the operation cap was reached
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Operations currently tracked, sorted
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    fn cutoff(&self, now: Instant) -> Option<Instant> {
        now.checked_sub(self.policy.window())
    }

    fn push(&self, operation: &str, entry: Entry) {
        let now = self.clock.now();

        if !self.operations.contains_key(operation)
            && self.operations.len() >= self.policy.max_tracked_operations
        {
            let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                operation,
                limit = self.policy.max_tracked_operations,
                dropped,
                "Metrics operation limit reached, dropping event"
            );
            return;
        }

        let mut buffer =
            self.operations.entry(operation.to_string()).or_insert_with(OperationBuffer::new);
        if let Entry::Transition { to } = entry {
            buffer.circuit_state = to;
        }
        buffer.entries.push_back((now, entry));
        buffer.prune_before(self.cutoff(now));
        while buffer.entries.len() > self.policy.max_records_per_operation {
            buffer.entries.pop_front();
        }
    }

    fn push_config(&self, record: ConfigLoadRecord) {
        let now = self.clock.now();
        let cutoff = self.cutoff(now);
        let mut events = self.config_events.lock();
        events.push_back((now, record));
        while events.len() > self.policy.max_config_events
            || events.front().is_some_and(|(at, _)| cutoff.is_some_and(|c| *at < c))
        {
            events.pop_front();
        }
    }

    /// Apply the time window to every buffer
    ///
    /// Operations with nothing left in the window and a closed circuit are
    /// forgotten. Returns the number of entries removed.
    pub fn prune(&self) -> usize {
        let cutoff = self.cutoff(self.clock.now());
        let mut removed = 0;
        self.operations.retain(|_, buffer| {
            removed += buffer.prune_before(cutoff);
            !buffer.entries.is_empty() || buffer.circuit_state != CircuitState::Closed
        });

        let mut events = self.config_events.lock();
        while events.front().is_some_and(|(at, _)| cutoff.is_some_and(|c| *at < c)) {
            events.pop_front();
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, "Pruned metrics");
        }
        removed
    }

    /// Aggregated counters for `operation`, or for every operation when `None`
    ///
    /// Unknown operations produce an all-zero snapshot.
    pub fn snapshot(&self, operation: Option<&str>) -> MetricsSnapshot {
        let cutoff = self.cutoff(self.clock.now());
        match operation {
            Some(name) => {
                let mut snapshot =
                    MetricsSnapshot::empty(Some(name.to_string()), self.policy.window_secs);
                if let Some(buffer) = self.operations.get(name) {
                    let mut acc = Accumulator::default();
                    acc.add(&buffer, cutoff);
                    acc.fill(&mut snapshot);
                    snapshot.circuit_state = Some(buffer.circuit_state);
                }
                snapshot
            }
            None => {
                let mut acc = Accumulator::default();
                for buffer in self.operations.iter() {
                    acc.add(buffer.value(), cutoff);
                }
                let mut snapshot = MetricsSnapshot::empty(None, self.policy.window_secs);
                acc.fill(&mut snapshot);
                snapshot
            }
        }
    }

    /// Per-operation snapshots, sorted by operation name
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.operations().iter().map(|op| self.snapshot(Some(op))).collect()
    }

    /// Configuration loads still inside the window, oldest first
    pub fn config_events(&self) -> Vec<ConfigLoadRecord> {
        let cutoff = self.cutoff(self.clock.now());
        self.config_events
            .lock()
            .iter()
            .filter(|(at, _)| cutoff.map_or(true, |c| *at >= c))
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Alerts derived from the current window
    pub fn alerts(&self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for snapshot in self.snapshots() {
            self.operation_alerts(&snapshot, &mut alerts);
        }

        let failures: Vec<ConfigLoadRecord> =
            self.config_events().into_iter().filter(|event| !event.success).collect();
        if let Some(last) = failures.last() {
            alerts.push(Alert {
                kind: AlertKind::ConfigLoadFailures,
                severity: ErrorSeverity::Critical,
                operation: None,
                message: format!(
                    "{} configuration load failure(s); last from {}: {}",
                    failures.len(),
                    last.source,
                    last.message.as_deref().unwrap_or("no details")
                ),
                value: failures.len() as f64,
                threshold: 0.0,
            });
        }
        alerts
    }

    fn operation_alerts(&self, snapshot: &MetricsSnapshot, alerts: &mut Vec<Alert>) {
        let operation = snapshot.operation.clone().unwrap_or_default();
        let limits = &self.thresholds;
        let enough_calls = snapshot.calls >= limits.min_calls;

        if enough_calls && snapshot.retry_rate > limits.retry_rate {
            alerts.push(Alert {
                kind: AlertKind::HighRetryRate,
                severity: ErrorSeverity::Warning,
                operation: Some(operation.clone()),
                message: format!(
                    "{operation}: {:.0}% of attempts are retries",
                    snapshot.retry_rate * 100.0
                ),
                value: snapshot.retry_rate,
                threshold: limits.retry_rate,
            });
        }

        if enough_calls && snapshot.failure_rate > limits.failure_rate {
            let severity = if snapshot.failure_rate >= limits.failure_rate * 2.0 {
                ErrorSeverity::Critical
            } else {
                ErrorSeverity::Warning
            };
            alerts.push(Alert {
                kind: AlertKind::HighFailureRate,
                severity,
                operation: Some(operation.clone()),
                message: format!(
                    "{operation}: {:.0}% of calls failed",
                    snapshot.failure_rate * 100.0
                ),
                value: snapshot.failure_rate,
                threshold: limits.failure_rate,
            });
        }

        if snapshot.circuit_opens >= limits.circuit_opens {
            alerts.push(Alert {
                kind: AlertKind::FrequentCircuitOpens,
                severity: ErrorSeverity::Critical,
                operation: Some(operation.clone()),
                message: format!(
                    "{operation}: circuit opened {} times in {}s",
                    snapshot.circuit_opens, snapshot.window_secs
                ),
                value: snapshot.circuit_opens as f64,
                threshold: limits.circuit_opens as f64,
            });
        }

        if snapshot.circuit_state == Some(CircuitState::Open) {
            alerts.push(Alert {
                kind: AlertKind::CircuitOpen,
                severity: ErrorSeverity::Warning,
                operation: Some(operation.clone()),
                message: format!("{operation}: circuit is open, calls are being rejected"),
                value: 1.0,
                threshold: 0.0,
            });
        }
    }

    /// Drop everything collected so far
    pub fn reset(&self) {
        self.operations.clear();
        self.config_events.lock().clear();
        self.dropped_events.store(0, Ordering::Relaxed);
    }
}

impl<C: Clock> ResilienceEventSink for MetricsCollector<C> {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::Attempt(record) => self.push(
                &record.operation,
                Entry::Attempt { retry: record.is_retry(), outcome: record.outcome },
            ),
            MetricsEvent::CallCompleted { operation, outcome, latency, .. } => {
                self.push(&operation, Entry::Call { outcome, latency });
            }
            MetricsEvent::CircuitTransition { operation, to, .. } => {
                self.push(&operation, Entry::Transition { to });
            }
            MetricsEvent::CallRejected { operation } => self.push(&operation, Entry::Rejected),
            MetricsEvent::ConfigLoaded { preset, source, success, message } => {
                self.push_config(ConfigLoadRecord {
                    recorded_at: DateTime::<Utc>::from(self.clock.system_time()),
                    preset,
                    source,
                    success,
                    message,
                });
            }
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    calls: u64,
    successes: u64,
    failures: u64,
    cancellations: u64,
    attempts: u64,
    retries: u64,
    circuit_opens: u64,
    rejections: u64,
    latency_total: Duration,
}

impl Accumulator {
    fn add(&mut self, buffer: &OperationBuffer, cutoff: Option<Instant>) {
        let live = buffer.entries.iter().filter(|(at, _)| cutoff.map_or(true, |c| *at >= c));
        for (_, entry) in live {
            match *entry {
                Entry::Attempt { retry, outcome } => {
                    if outcome != AttemptOutcome::Cancelled {
                        self.attempts += 1;
                        self.retries += u64::from(retry);
                    }
                }
                Entry::Call { outcome, latency } => {
                    self.calls += 1;
                    self.latency_total += latency;
                    match outcome {
                        CallOutcome::Success => self.successes += 1,
                        CallOutcome::PermanentFailure | CallOutcome::Exhausted => {
                            self.failures += 1;
                        }
                        CallOutcome::Cancelled => self.cancellations += 1,
                        CallOutcome::Rejected => {}
                    }
                }
                Entry::Transition { to } => {
                    if to == CircuitState::Open {
                        self.circuit_opens += 1;
                    }
                }
                Entry::Rejected => self.rejections += 1,
            }
        }
    }

    fn fill(&self, snapshot: &mut MetricsSnapshot) {
        snapshot.calls = self.calls;
        snapshot.successes = self.successes;
        snapshot.failures = self.failures;
        snapshot.cancellations = self.cancellations;
        snapshot.attempts = self.attempts;
        snapshot.retries = self.retries;
        snapshot.circuit_opens = self.circuit_opens;
        snapshot.rejections = self.rejections;
        if self.calls > 0 {
            let calls = self.calls as f64;
            snapshot.avg_latency_ms = self.latency_total.as_secs_f64() * 1_000.0 / calls;
            snapshot.success_rate = self.successes as f64 / calls;
            snapshot.failure_rate = self.failures as f64 / calls;
        }
        if self.attempts > 0 {
            snapshot.retry_rate = self.retries as f64 / self.attempts as f64;
        }
    }
}
