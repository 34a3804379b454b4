//! Health view over circuit breaker states

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse health of the resilience layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No circuit open or half-open
    Healthy,
    /// At least one circuit open or probing
    Degraded,
    /// Every known circuit is open
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Answer to a health query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub open_circuits: Vec<String>,
    /// Probing circuits, plus open ones whose recovery timeout has elapsed
    pub half_open_circuits: Vec<String>,
    /// Circuits considered by this report
    pub checked_circuits: usize,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Derive the status from the circuits that were checked
    pub(crate) fn from_circuits(
        mut open_circuits: Vec<String>,
        mut half_open_circuits: Vec<String>,
        checked_circuits: usize,
    ) -> Self {
        open_circuits.sort_unstable();
        half_open_circuits.sort_unstable();

        let status = if checked_circuits > 0 && open_circuits.len() == checked_circuits {
            HealthStatus::Unhealthy
        } else if open_circuits.is_empty() && half_open_circuits.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self { status, open_circuits, half_open_circuits, checked_circuits, checked_at: Utc::now() }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
