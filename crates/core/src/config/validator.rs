//! Configuration validator
//!
//! Standalone: it knows the override schema and the numeric ranges, nothing
//! about presets or running services, so a CLI can call it directly. It never
//! fails; every problem found is reported in the returned
//! [`ValidationResult`].

use bulwark_common::validation::{ValidationCollector, ValidationResult};
use bulwark_domain::constants::{
    BASE_DELAY_MS_RANGE, FAILURE_THRESHOLD_RANGE, HALF_OPEN_MAX_CALLS_RANGE,
    HIGH_MAX_ATTEMPTS_WARNING, KEY_BACKOFF, KEY_BASE_DELAY_MS, KEY_DEFAULT_STRATEGY,
    KEY_FAILURE_THRESHOLD, KEY_HALF_OPEN_MAX_CALLS, KEY_JITTER, KEY_MAX_ATTEMPTS,
    KEY_MAX_DELAY_MS, KEY_OPERATION_OVERRIDES, KEY_RECOVERY_TIMEOUT_MS,
    LOW_RECOVERY_TIMEOUT_WARNING_MS, MAX_ATTEMPTS_RANGE, MAX_DELAY_MS_RANGE,
    MAX_OPERATION_NAME_LENGTH, MAX_OVERRIDE_NESTING_DEPTH, MAX_OVERRIDE_PAYLOAD_BYTES,
    RECOVERY_TIMEOUT_MS_RANGE,
};
use bulwark_domain::{BackoffKind, ConfigError, ConfigResult, OperationStrategy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static OPERATION_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]{0,63}$")
        .expect("OPERATION_NAME_REGEX should compile - this is a bug")
});

/// Numeric fields with their inclusive ranges
const NUMERIC_FIELDS: [(&str, (u64, u64)); 6] = [
    (KEY_MAX_ATTEMPTS, MAX_ATTEMPTS_RANGE),
    (KEY_BASE_DELAY_MS, BASE_DELAY_MS_RANGE),
    (KEY_MAX_DELAY_MS, MAX_DELAY_MS_RANGE),
    (KEY_FAILURE_THRESHOLD, FAILURE_THRESHOLD_RANGE),
    (KEY_RECOVERY_TIMEOUT_MS, RECOVERY_TIMEOUT_MS_RANGE),
    (KEY_HALF_OPEN_MAX_CALLS, HALF_OPEN_MAX_CALLS_RANGE),
];

/// Whether `name` is an acceptable operation name
pub fn is_valid_operation_name(name: &str) -> bool {
    OPERATION_NAME_REGEX.is_match(name)
}

/// Check an operation name
///
/// # Errors
/// Returns [`ConfigError::InvalidOperationName`] describing the rule broken.
pub fn validate_operation_name(name: &str) -> ConfigResult<()> {
    if is_valid_operation_name(name) {
        return Ok(());
    }
    let reason = if name.is_empty() {
        "must not be empty".to_string()
    } else if name.len() > MAX_OPERATION_NAME_LENGTH {
        format!("must be at most {MAX_OPERATION_NAME_LENGTH} characters")
    } else {
        "must start with a lowercase letter and contain only lowercase letters, digits and '_'"
            .to_string()
    };
    Err(ConfigError::InvalidOperationName { name: name.to_string(), reason })
}

/// Validate raw override text (JSON)
///
/// Oversized or unparseable payloads produce a single error; otherwise the
/// parsed value goes through [`validate`].
pub fn validate_json(text: &str) -> ValidationResult {
    let mut collector = ValidationCollector::new();
    if text.len() > MAX_OVERRIDE_PAYLOAD_BYTES {
        collector.error_with_code(
            "",
            format!(
                "payload is {} bytes, limit is {MAX_OVERRIDE_PAYLOAD_BYTES}",
                text.len()
            ),
            "payload_too_large",
        );
        return collector.finish();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate(&value),
        Err(err) => {
            collector.error_with_code("", format!("invalid JSON: {err}"), "parse_error");
            collector.finish()
        }
    }
}

/// Validate a parsed override payload
pub fn validate(raw: &Value) -> ValidationResult {
    let mut collector = ValidationCollector::new();

    let Some(object) = raw.as_object() else {
        collector.error_with_code("", "configuration must be a JSON object", "not_an_object");
        return collector.finish();
    };

    let depth = nesting_depth(raw);
    if depth > MAX_OVERRIDE_NESTING_DEPTH {
        collector.error_with_code(
            "",
            format!("nesting depth {depth} exceeds limit of {MAX_OVERRIDE_NESTING_DEPTH}"),
            "too_deep",
        );
    }

    for (key, value) in object {
        match key.as_str() {
            KEY_JITTER => {
                if !value.is_boolean() {
                    collector.error_with_code(key, "must be a boolean", "wrong_type");
                }
            }
            KEY_BACKOFF => check_named::<BackoffKind>(&mut collector, key, value),
            KEY_DEFAULT_STRATEGY => check_named::<OperationStrategy>(&mut collector, key, value),
            KEY_OPERATION_OVERRIDES => check_operation_overrides(&mut collector, value),
            other => {
                if let Some((_, range)) = NUMERIC_FIELDS.iter().find(|(name, _)| *name == other) {
                    check_integer(&mut collector, key, value, *range);
                } else {
                    collector.warning(key, "unknown key, ignored");
                }
            }
        }
    }

    check_consistency(&mut collector, object);
    check_advisories(&mut collector, object);

    collector.finish()
}

fn check_integer(collector: &mut ValidationCollector, key: &str, value: &Value, range: (u64, u64)) {
    let number = value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from));
    match number {
        Some(n) => {
            collector.check_range(key, n, range);
        }
        None if value.is_number() => {
            collector.error_with_code(key, "must be an integer", "wrong_type");
        }
        None => {
            collector.error_with_code(key, "must be a number", "wrong_type");
        }
    }
}

fn check_named<T>(collector: &mut ValidationCollector, key: &str, value: &Value)
where
    T: std::str::FromStr<Err = String>,
{
    match value.as_str() {
        Some(name) => {
            if let Err(message) = name.parse::<T>() {
                collector.error_with_code(key, message, "unknown_name");
            }
        }
        None => collector.error_with_code(key, "must be a string", "wrong_type"),
    }
}

fn check_operation_overrides(collector: &mut ValidationCollector, value: &Value) {
    let Some(overrides) = value.as_object() else {
        collector.error_with_code(
            KEY_OPERATION_OVERRIDES,
            "must be an object mapping operation names to strategies",
            "wrong_type",
        );
        return;
    };

    collector.push_path(KEY_OPERATION_OVERRIDES);
    for (operation, strategy) in overrides {
        if let Err(err) = validate_operation_name(operation) {
            collector.error_with_code(operation, err.to_string(), "invalid_operation_name");
        }
        check_named::<OperationStrategy>(collector, operation, strategy);
    }
    collector.pop_path();
}

fn integer_field(object: &Map<String, Value>, key: &str) -> Option<u64> {
    object.get(key).and_then(Value::as_u64)
}

fn check_consistency(collector: &mut ValidationCollector, object: &Map<String, Value>) {
    if let (Some(base), Some(max)) =
        (integer_field(object, KEY_BASE_DELAY_MS), integer_field(object, KEY_MAX_DELAY_MS))
    {
        if base > max {
            collector.error_with_code(
                KEY_BASE_DELAY_MS,
                format!("base_delay_ms ({base}) must not exceed max_delay_ms ({max})"),
                "inconsistent",
            );
        }
    }
}

fn check_advisories(collector: &mut ValidationCollector, object: &Map<String, Value>) {
    let max_attempts = integer_field(object, KEY_MAX_ATTEMPTS);
    if let Some(attempts) = max_attempts {
        if attempts > HIGH_MAX_ATTEMPTS_WARNING && attempts <= MAX_ATTEMPTS_RANGE.1 {
            collector.warning(
                KEY_MAX_ATTEMPTS,
                format!("{attempts} attempts can hold callers for a long time"),
            );
        }
    }

    if let Some(recovery) = integer_field(object, KEY_RECOVERY_TIMEOUT_MS) {
        if recovery < LOW_RECOVERY_TIMEOUT_WARNING_MS {
            collector.warning(
                KEY_RECOVERY_TIMEOUT_MS,
                format!("{recovery}ms recovery lets an open circuit probe a failing upstream very often"),
            );
        }
    }

    let jitter_off = object.get(KEY_JITTER).and_then(Value::as_bool) == Some(false);
    let exponential = object
        .get(KEY_BACKOFF)
        .and_then(Value::as_str)
        .map_or(true, |name| name.parse::<BackoffKind>() == Ok(BackoffKind::Exponential));
    if jitter_off && exponential && max_attempts.is_some_and(|n| n >= 5) {
        collector.warning(
            KEY_JITTER,
            "exponential backoff without jitter makes concurrent callers retry in lockstep",
        );
    }
}

fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(nesting_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}
