//! Structured dumps of collected metrics for monitoring endpoints

use bulwark_common::resilience::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Alert, ConfigLoadRecord, MetricsCollector, MetricsError, MetricsSnapshot};

/// Everything the collector knows, at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub window_secs: u64,
    pub overall: MetricsSnapshot,
    pub operations: Vec<MetricsSnapshot>,
    pub alerts: Vec<Alert>,
    pub config_events: Vec<ConfigLoadRecord>,
    pub dropped_events: u64,
}

impl<C: Clock> MetricsCollector<C> {
    /// Build a report of the current window
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            generated_at: Utc::now(),
            window_secs: self.policy().window_secs,
            overall: self.snapshot(None),
            operations: self.snapshots(),
            alerts: self.alerts(),
            config_events: self.config_events(),
            dropped_events: self.dropped_events(),
        }
    }

    /// Pretty JSON document of [`MetricsCollector::report`]
    ///
    /// # Errors
    /// Returns [`MetricsError::Json`] if serialization fails.
    pub fn export_json(&self) -> Result<String, MetricsError> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }

    /// One CSV row per operation snapshot, with a header
    ///
    /// # Errors
    /// Returns [`MetricsError::Csv`] if a row cannot be written.
    pub fn export_csv(&self) -> Result<String, MetricsError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for snapshot in self.snapshots() {
            writer.serialize(snapshot)?;
        }
        let bytes = writer.into_inner().map_err(|err| csv::Error::from(err.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}
