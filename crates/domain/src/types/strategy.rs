//! Named bundles of resilience defaults

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::impl_named_enum;
use crate::types::config::{BackoffKind, ResilienceConfig};

/// Resilience strategy assigned to an operation
///
/// Each strategy carries a fixed parameter table; see
/// [`OperationStrategy::parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStrategy {
    /// Fail fast: few attempts, short delays, trips early
    Aggressive,
    /// General purpose default for unregistered operations
    #[default]
    Balanced,
    /// More attempts and longer waits, tolerant breaker
    Conservative,
    /// Maximum persistence for calls that must not be dropped
    Critical,
}

impl_named_enum!(OperationStrategy {
    Aggressive => "aggressive",
    Balanced => "balanced",
    Conservative => "conservative",
    Critical => "critical",
});

impl OperationStrategy {
    /// Every strategy, in escalating order of persistence
    pub const ALL: [Self; 4] = [Self::Aggressive, Self::Balanced, Self::Conservative, Self::Critical];

    /// Parse a strategy name, producing a [`ConfigError`] on failure
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownStrategy`] listing the valid names.
    pub fn parse_named(name: &str) -> ConfigResult<Self> {
        name.parse().map_err(|_| ConfigError::UnknownStrategy {
            name: name.to_string(),
            valid: Self::names().iter().map(ToString::to_string).collect(),
        })
    }

    /// Default retry and circuit breaker parameters for this strategy
    pub const fn parameters(self) -> ResilienceConfig {
        match self {
            Self::Aggressive => ResilienceConfig {
                max_attempts: 2,
                base_delay_ms: 100,
                max_delay_ms: 2_000,
                jitter: true,
                failure_threshold: 3,
                recovery_timeout_ms: 15_000,
                half_open_max_calls: 1,
                backoff: BackoffKind::Exponential,
            },
            Self::Balanced => ResilienceConfig {
                max_attempts: 3,
                base_delay_ms: 500,
                max_delay_ms: 10_000,
                jitter: true,
                failure_threshold: 5,
                recovery_timeout_ms: 30_000,
                half_open_max_calls: 1,
                backoff: BackoffKind::Exponential,
            },
            Self::Conservative => ResilienceConfig {
                max_attempts: 5,
                base_delay_ms: 1_000,
                max_delay_ms: 30_000,
                jitter: true,
                failure_threshold: 8,
                recovery_timeout_ms: 60_000,
                half_open_max_calls: 2,
                backoff: BackoffKind::Exponential,
            },
            Self::Critical => ResilienceConfig {
                max_attempts: 7,
                base_delay_ms: 1_000,
                max_delay_ms: 60_000,
                jitter: true,
                failure_threshold: 10,
                recovery_timeout_ms: 120_000,
                half_open_max_calls: 3,
                backoff: BackoffKind::Exponential,
            },
        }
    }
}
