//! Domain constants
//!
//! Centralized location for the numeric bounds, key names and defaults used
//! by configuration resolution and validation.

// Validation ranges (inclusive)
pub const MAX_ATTEMPTS_RANGE: (u64, u64) = (1, 10);
pub const BASE_DELAY_MS_RANGE: (u64, u64) = (0, 60_000);
pub const MAX_DELAY_MS_RANGE: (u64, u64) = (1, 300_000);
pub const FAILURE_THRESHOLD_RANGE: (u64, u64) = (1, 50);
pub const RECOVERY_TIMEOUT_MS_RANGE: (u64, u64) = (0, 600_000);
pub const HALF_OPEN_MAX_CALLS_RANGE: (u64, u64) = (1, 10);

// Advisory thresholds (produce warnings, not errors)
pub const HIGH_MAX_ATTEMPTS_WARNING: u64 = 7;
pub const LOW_RECOVERY_TIMEOUT_WARNING_MS: u64 = 1_000;

// Raw override payload limits
pub const MAX_OVERRIDE_PAYLOAD_BYTES: usize = 4_096;
pub const MAX_OVERRIDE_NESTING_DEPTH: usize = 4;
pub const MAX_OPERATION_NAME_LENGTH: usize = 64;

// Custom override keys
pub const KEY_MAX_ATTEMPTS: &str = "max_attempts";
pub const KEY_BASE_DELAY_MS: &str = "base_delay_ms";
pub const KEY_MAX_DELAY_MS: &str = "max_delay_ms";
pub const KEY_JITTER: &str = "jitter";
pub const KEY_FAILURE_THRESHOLD: &str = "failure_threshold";
pub const KEY_RECOVERY_TIMEOUT_MS: &str = "recovery_timeout_ms";
pub const KEY_HALF_OPEN_MAX_CALLS: &str = "half_open_max_calls";
pub const KEY_BACKOFF: &str = "backoff";
pub const KEY_DEFAULT_STRATEGY: &str = "default_strategy";
pub const KEY_OPERATION_OVERRIDES: &str = "operation_overrides";

// Legacy environment-style keys
pub const LEGACY_RETRY_MAX_ATTEMPTS: &str = "RETRY_MAX_ATTEMPTS";
pub const LEGACY_RETRY_BASE_DELAY_MS: &str = "RETRY_BASE_DELAY_MS";
pub const LEGACY_RETRY_MAX_DELAY_MS: &str = "RETRY_MAX_DELAY_MS";
pub const LEGACY_RETRY_JITTER: &str = "RETRY_JITTER";
pub const LEGACY_CB_FAILURE_THRESHOLD: &str = "CIRCUIT_BREAKER_FAILURE_THRESHOLD";
pub const LEGACY_CB_RECOVERY_TIMEOUT_MS: &str = "CIRCUIT_BREAKER_RECOVERY_TIMEOUT_MS";
pub const LEGACY_CB_HALF_OPEN_MAX_CALLS: &str = "CIRCUIT_BREAKER_HALF_OPEN_MAX_CALLS";
pub const LEGACY_DEFAULT_STRATEGY: &str = "DEFAULT_RESILIENCE_STRATEGY";
pub const LEGACY_OPERATION_STRATEGY_SUFFIX: &str = "_RESILIENCE_STRATEGY";

/// Every scalar legacy key, in the order they are applied.
pub const LEGACY_SCALAR_KEYS: [&str; 8] = [
    LEGACY_RETRY_MAX_ATTEMPTS,
    LEGACY_RETRY_BASE_DELAY_MS,
    LEGACY_RETRY_MAX_DELAY_MS,
    LEGACY_RETRY_JITTER,
    LEGACY_CB_FAILURE_THRESHOLD,
    LEGACY_CB_RECOVERY_TIMEOUT_MS,
    LEGACY_CB_HALF_OPEN_MAX_CALLS,
    LEGACY_DEFAULT_STRATEGY,
];

// Process environment
pub const ENV_PRESET: &str = "BULWARK_RESILIENCE_PRESET";
pub const ENV_CUSTOM_CONFIG: &str = "BULWARK_RESILIENCE_CUSTOM_CONFIG";
pub const ENV_ENVIRONMENT_HINTS: [&str; 2] = ["BULWARK_ENV", "ENVIRONMENT"];

// Metrics retention defaults
pub const DEFAULT_METRICS_WINDOW_SECS: u64 = 3_600;
pub const DEFAULT_MAX_RECORDS_PER_OPERATION: usize = 1_000;
pub const DEFAULT_MAX_TRACKED_OPERATIONS: usize = 500;
pub const DEFAULT_MAX_CONFIG_EVENTS: usize = 200;

// Alert thresholds
pub const DEFAULT_RETRY_RATE_ALERT: f64 = 0.5;
pub const DEFAULT_FAILURE_RATE_ALERT: f64 = 0.25;
pub const DEFAULT_CIRCUIT_OPENS_ALERT: u64 = 3;
pub const DEFAULT_MIN_CALLS_FOR_ALERT: u64 = 10;
