//! Metrics exporters
//!
//! Exporters render collected metrics for external monitoring systems.

pub mod prometheus;

// Re-export exporter types for convenience
pub use self::prometheus::{ExportError, PrometheusExporter, METRIC_PREFIX};
