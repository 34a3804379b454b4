//! # Bulwark Core
//!
//! Resilience orchestration logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Configuration resolution: presets, legacy overrides, custom overrides
//! - The standalone configuration validator and preset recommendation
//! - The metrics collector with retention and derived alerts
//! - The orchestrator facade that composes breakers and retry executors
//! - Port interfaces (traits) for resilience event sinks
//!
//! ## Architecture Principles
//! - Only depends on `bulwark-common` and `bulwark-domain`
//! - No environment, file or network access
//! - All external collaborators via traits
//! - No global state: the host constructs one [`Orchestrator`] and passes it
//!   to request handlers

pub mod config;
pub mod metrics;
pub mod orchestrator;

// Infrastructure ports
pub mod resilience_event_ports;

pub use config::{
    is_valid_operation_name, list_presets, recommend, recommend_preset, resolve,
    resolve_operation, validate, validate_json, validate_operation_name, ConfigOverrides,
    CustomOverrides, LegacyOverrides, OverrideFields, PresetRecommendation, ResilienceSettings,
};
pub use metrics::pruning::spawn_pruning_task;
pub use metrics::{
    Alert, AlertKind, AlertThresholds, ConfigLoadRecord, MetricsCollector, MetricsError,
    MetricsEvent, MetricsReport, MetricsSnapshot, RetentionPolicy,
};
pub use orchestrator::{HealthReport, HealthStatus, Orchestrator, OrchestratorBuilder};
pub use resilience_event_ports::{NoopEventSink, ResilienceEventSink};
