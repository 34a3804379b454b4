//! Resolved resilience configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::impl_named_enum;

/// How retry delays grow between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Constant `base_delay_ms` between attempts
    Fixed,
    /// `base_delay_ms * 2^(attempt-1)`, optionally jittered
    #[default]
    Exponential,
}

impl_named_enum!(BackoffKind {
    Fixed => "fixed",
    Exponential => "exponential",
});

/// Retry + circuit breaker parameters for one operation
///
/// Produced by resolving a preset plus overrides. Once resolved the value is
/// immutable and shared freely between callers.
///
/// Invariants (checked by [`ResilienceConfig::check_invariants`]):
/// `max_attempts >= 1`, `failure_threshold >= 1`, `half_open_max_calls >= 1`,
/// `base_delay_ms <= max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub half_open_max_calls: u32,
    #[serde(default)]
    pub backoff: BackoffKind,
}

impl Default for ResilienceConfig {
    /// Hard-coded library default, identical to the `balanced` strategy
    fn default() -> Self {
        crate::OperationStrategy::Balanced.parameters()
    }
}

impl ResilienceConfig {
    /// Delay before the first retry
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Upper bound for any single retry delay
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Time an open circuit waits before admitting trial calls
    pub const fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    /// Number of retries after the first attempt
    pub const fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Check the structural invariants every resolved config must satisfy
    ///
    /// # Errors
    /// Returns the first violated invariant as [`ConfigError::InvalidValue`].
    pub fn check_invariants(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid_value("max_attempts", "must be at least 1"));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid_value("failure_threshold", "must be at least 1"));
        }
        if self.half_open_max_calls == 0 {
            return Err(ConfigError::invalid_value("half_open_max_calls", "must be at least 1"));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::invalid_value(
                "base_delay_ms",
                format!(
                    "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                    self.base_delay_ms, self.max_delay_ms
                ),
            ));
        }
        Ok(())
    }
}
