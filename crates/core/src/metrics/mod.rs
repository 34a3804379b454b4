//! Resilience metrics
//!
//! The collector keeps a bounded, time-windowed buffer of events per
//! operation and aggregates on read. Alerts are never stored: they are
//! derived from a snapshot each time they are requested.

mod collector;
mod export;
pub mod pruning;

use std::time::Duration;

use bulwark_common::error::ErrorSeverity;
use bulwark_common::resilience::{AttemptRecord, CallOutcome, CircuitState};
use bulwark_domain::constants::{
    DEFAULT_CIRCUIT_OPENS_ALERT, DEFAULT_FAILURE_RATE_ALERT, DEFAULT_MAX_CONFIG_EVENTS,
    DEFAULT_MAX_RECORDS_PER_OPERATION, DEFAULT_MAX_TRACKED_OPERATIONS, DEFAULT_METRICS_WINDOW_SECS,
    DEFAULT_MIN_CALLS_FOR_ALERT, DEFAULT_RETRY_RATE_ALERT,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use collector::MetricsCollector;
pub use export::MetricsReport;

/// Something the resilience layer observed
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsEvent {
    Attempt(AttemptRecord),
    CallCompleted { operation: String, outcome: CallOutcome, attempts: u32, latency: Duration },
    CircuitTransition { operation: String, from: CircuitState, to: CircuitState },
    ConfigLoaded { preset: String, source: String, success: bool, message: Option<String> },
    CallRejected { operation: String },
}

impl MetricsEvent {
    /// Operation the event belongs to; `None` for configuration events
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::Attempt(record) => Some(&record.operation),
            Self::CallCompleted { operation, .. }
            | Self::CircuitTransition { operation, .. }
            | Self::CallRejected { operation } => Some(operation),
            Self::ConfigLoaded { .. } => None,
        }
    }
}

/// Bounds on what the collector keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Events older than this are dropped
    pub window_secs: u64,
    pub max_records_per_operation: usize,
    /// Events for operations beyond this many are dropped and logged
    pub max_tracked_operations: usize,
    pub max_config_events: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_METRICS_WINDOW_SECS,
            max_records_per_operation: DEFAULT_MAX_RECORDS_PER_OPERATION,
            max_tracked_operations: DEFAULT_MAX_TRACKED_OPERATIONS,
            max_config_events: DEFAULT_MAX_CONFIG_EVENTS,
        }
    }
}

impl RetentionPolicy {
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Limits alerts are derived against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Retries per attempt above which a high-retry alert fires
    pub retry_rate: f64,
    /// Failed calls per call above which a high-failure alert fires
    pub failure_rate: f64,
    /// Circuit opens within the window that count as frequent
    pub circuit_opens: u64,
    /// Rate alerts need at least this many calls in the window
    pub min_calls: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            retry_rate: DEFAULT_RETRY_RATE_ALERT,
            failure_rate: DEFAULT_FAILURE_RATE_ALERT,
            circuit_opens: DEFAULT_CIRCUIT_OPENS_ALERT,
            min_calls: DEFAULT_MIN_CALLS_FOR_ALERT,
        }
    }
}

/// Aggregated counters for one operation, or all of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// `None` for the all-operations aggregate
    pub operation: Option<String>,
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub cancellations: u64,
    pub attempts: u64,
    pub retries: u64,
    pub circuit_opens: u64,
    pub rejections: u64,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub retry_rate: f64,
    pub window_secs: u64,
    pub circuit_state: Option<CircuitState>,
}

impl MetricsSnapshot {
    pub(crate) fn empty(operation: Option<String>, window_secs: u64) -> Self {
        Self {
            operation,
            calls: 0,
            successes: 0,
            failures: 0,
            cancellations: 0,
            attempts: 0,
            retries: 0,
            circuit_opens: 0,
            rejections: 0,
            avg_latency_ms: 0.0,
            success_rate: 0.0,
            failure_rate: 0.0,
            retry_rate: 0.0,
            window_secs,
            circuit_state: None,
        }
    }
}

/// Kind of derived alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighRetryRate,
    HighFailureRate,
    FrequentCircuitOpens,
    CircuitOpen,
    ConfigLoadFailures,
}

/// Threshold breach found when reading metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: ErrorSeverity,
    pub operation: Option<String>,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// One configuration load, as kept for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLoadRecord {
    pub recorded_at: DateTime<Utc>,
    pub preset: String,
    pub source: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors from metrics export
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
