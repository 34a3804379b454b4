//! Prometheus text exporter for resilience metrics
//!
//! Values are windowed aggregates, so everything is exported as a gauge and
//! rewritten on each [`PrometheusExporter::update`]. Operations that left the
//! retention window disappear from the next scrape.

use bulwark_common::resilience::{CircuitState, Clock};
use bulwark_core::{Alert, MetricsCollector, MetricsSnapshot};
use prometheus::{Encoder, GaugeVec, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Prefix of every exported metric name
pub const METRIC_PREFIX: &str = "bulwark_resilience";

/// Errors from Prometheus export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Prometheus output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Renders metrics snapshots in the Prometheus text format
///
/// Owns a private [`Registry`], so several exporters can coexist in one
/// process without name clashes.
pub struct PrometheusExporter {
    registry: Registry,
    /// calls, successes, failures, cancellations, attempts, retries,
    /// circuit_opens, rejections
    counts: [IntGaugeVec; 8],
    success_rate: GaugeVec,
    failure_rate: GaugeVec,
    retry_rate: GaugeVec,
    avg_latency_ms: GaugeVec,
    /// 0=closed, 1=open, 2=half-open
    circuit_state: IntGaugeVec,
    alerts: IntGaugeVec,
}

impl PrometheusExporter {
    /// Create an exporter with all metric families registered
    ///
    /// # Errors
    /// Returns [`ExportError::Prometheus`] if a metric cannot be registered.
    pub fn new() -> Result<Self, ExportError> {
        let registry = Registry::new();

        let counts = [
            int_gauge(&registry, "calls", "Calls completed in the window")?,
            int_gauge(&registry, "successes", "Successful calls in the window")?,
            int_gauge(&registry, "failures", "Failed calls in the window")?,
            int_gauge(&registry, "cancellations", "Cancelled calls in the window")?,
            int_gauge(&registry, "attempts", "Attempts made in the window")?,
            int_gauge(&registry, "retries", "Retries made in the window")?,
            int_gauge(&registry, "circuit_opens", "Circuit openings in the window")?,
            int_gauge(&registry, "rejections", "Calls rejected by an open circuit")?,
        ];

        let success_rate = gauge(&registry, "success_rate", "Successful calls per call")?;
        let failure_rate = gauge(&registry, "failure_rate", "Failed calls per call")?;
        let retry_rate = gauge(&registry, "retry_rate", "Retries per attempt")?;
        let avg_latency_ms = gauge(&registry, "avg_latency_ms", "Mean call latency in ms")?;
        let circuit_state = int_gauge(
            &registry,
            "circuit_state",
            "Current circuit state (0=closed, 1=open, 2=half-open)",
        )?;

        let alerts = IntGaugeVec::new(
            Opts::new(format!("{METRIC_PREFIX}_alerts"), "Active alerts by kind and severity"),
            &["kind", "severity"],
        )?;
        registry.register(Box::new(alerts.clone()))?;

        Ok(Self {
            registry,
            counts,
            success_rate,
            failure_rate,
            retry_rate,
            avg_latency_ms,
            circuit_state,
            alerts,
        })
    }

    /// Replace exported values with `snapshots` and `alerts`
    ///
    /// Snapshots without an operation (the aggregate) are skipped.
    pub fn update(&self, snapshots: &[MetricsSnapshot], alerts: &[Alert]) {
        for family in &self.counts {
            family.reset();
        }
        for family in [&self.success_rate, &self.failure_rate, &self.retry_rate, &self.avg_latency_ms]
        {
            family.reset();
        }
        self.circuit_state.reset();
        self.alerts.reset();

        for snapshot in snapshots {
            let Some(operation) = snapshot.operation.as_deref() else {
                continue;
            };
            let labels = [operation];

            let values = [
                snapshot.calls,
                snapshot.successes,
                snapshot.failures,
                snapshot.cancellations,
                snapshot.attempts,
                snapshot.retries,
                snapshot.circuit_opens,
                snapshot.rejections,
            ];
            for (family, value) in self.counts.iter().zip(values) {
                family.with_label_values(&labels).set(saturating_i64(value));
            }

            self.success_rate.with_label_values(&labels).set(snapshot.success_rate);
            self.failure_rate.with_label_values(&labels).set(snapshot.failure_rate);
            self.retry_rate.with_label_values(&labels).set(snapshot.retry_rate);
            self.avg_latency_ms.with_label_values(&labels).set(snapshot.avg_latency_ms);

            if let Some(state) = snapshot.circuit_state {
                self.circuit_state.with_label_values(&labels).set(state_value(state));
            }
        }

        for alert in alerts {
            let kind = serde_json::to_value(alert.kind)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default();
            let severity = alert.severity.to_string().to_ascii_lowercase();
            self.alerts.with_label_values(&[kind.as_str(), severity.as_str()]).inc();
        }
    }

    /// Encode the current values in the text exposition format
    ///
    /// # Errors
    /// Returns an [`ExportError`] if encoding fails.
    pub fn render(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Update from `collector` and render in one step
    ///
    /// # Errors
    /// Returns an [`ExportError`] if encoding fails.
    pub fn export<C: Clock>(&self, collector: &MetricsCollector<C>) -> Result<String, ExportError> {
        self.update(&collector.snapshots(), &collector.alerts());
        self.render()
    }
}

fn int_gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGaugeVec, ExportError> {
    let family = IntGaugeVec::new(Opts::new(format!("{METRIC_PREFIX}_{name}"), help), &["operation"])?;
    registry.register(Box::new(family.clone()))?;
    Ok(family)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec, ExportError> {
    let family = GaugeVec::new(Opts::new(format!("{METRIC_PREFIX}_{name}"), help), &["operation"])?;
    registry.register(Box::new(family.clone()))?;
    Ok(family)
}

const fn state_value(state: CircuitState) -> i64 {
    match state {
        CircuitState::Closed => 0,
        CircuitState::Open => 1,
        CircuitState::HalfOpen => 2,
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
