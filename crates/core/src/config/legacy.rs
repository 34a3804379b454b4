//! Legacy individual-variable overrides
//!
//! Older deployments configure resilience through flat environment-style
//! variables (`RETRY_MAX_ATTEMPTS`, `CIRCUIT_BREAKER_FAILURE_THRESHOLD`,
//! `SUMMARIZE_RESILIENCE_STRATEGY`, ...). This shim only recognises those keys,
//! converts them into the custom-override schema and runs the same validator,
//! so legacy values can never reach the resolver unchecked.

use std::collections::BTreeMap;

use bulwark_domain::constants::{
    KEY_BASE_DELAY_MS, KEY_DEFAULT_STRATEGY, KEY_FAILURE_THRESHOLD, KEY_HALF_OPEN_MAX_CALLS,
    KEY_JITTER, KEY_MAX_ATTEMPTS, KEY_MAX_DELAY_MS, KEY_OPERATION_OVERRIDES,
    KEY_RECOVERY_TIMEOUT_MS, LEGACY_CB_FAILURE_THRESHOLD, LEGACY_CB_HALF_OPEN_MAX_CALLS,
    LEGACY_CB_RECOVERY_TIMEOUT_MS, LEGACY_DEFAULT_STRATEGY, LEGACY_OPERATION_STRATEGY_SUFFIX,
    LEGACY_RETRY_BASE_DELAY_MS, LEGACY_RETRY_JITTER, LEGACY_RETRY_MAX_ATTEMPTS,
    LEGACY_RETRY_MAX_DELAY_MS,
};
use bulwark_domain::{ConfigError, ConfigResult, OperationStrategy, ResilienceConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::validator::{is_valid_operation_name, validate};
use super::{reject_invalid, OverrideFields};

/// Legacy key to override-schema key, for the numeric variables
const NUMERIC_KEYS: [(&str, &str); 6] = [
    (LEGACY_RETRY_MAX_ATTEMPTS, KEY_MAX_ATTEMPTS),
    (LEGACY_RETRY_BASE_DELAY_MS, KEY_BASE_DELAY_MS),
    (LEGACY_RETRY_MAX_DELAY_MS, KEY_MAX_DELAY_MS),
    (LEGACY_CB_FAILURE_THRESHOLD, KEY_FAILURE_THRESHOLD),
    (LEGACY_CB_RECOVERY_TIMEOUT_MS, KEY_RECOVERY_TIMEOUT_MS),
    (LEGACY_CB_HALF_OPEN_MAX_CALLS, KEY_HALF_OPEN_MAX_CALLS),
];

/// Overrides taken from legacy individual variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyOverrides {
    #[serde(flatten)]
    pub fields: OverrideFields,
    /// From `<OPERATION>_RESILIENCE_STRATEGY`, keyed by lowercased operation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operation_strategies: BTreeMap<String, OperationStrategy>,
}

impl LegacyOverrides {
    /// Detect legacy variables among `vars`
    ///
    /// Returns `Ok(None)` when no legacy key is present. Unrelated keys are
    /// ignored, as are `*_RESILIENCE_STRATEGY` keys whose prefix is not a
    /// valid operation name.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidOverride`] listing every unparseable or
    /// out-of-range value.
    pub fn detect<I, K, V>(vars: I) -> ConfigResult<Option<Self>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut object = Map::new();
        let mut operations = Map::new();
        let mut errors = Vec::new();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());

            if let Some((_, target)) = NUMERIC_KEYS.iter().find(|(legacy, _)| *legacy == key) {
                match value.parse::<i64>() {
                    Ok(number) => {
                        object.insert((*target).to_string(), Value::from(number));
                    }
                    Err(_) => errors.push(format!("{key}: expected an integer, got '{value}'")),
                }
            } else if key == LEGACY_RETRY_JITTER {
                match parse_flag(value) {
                    Some(flag) => {
                        object.insert(KEY_JITTER.to_string(), Value::Bool(flag));
                    }
                    None => errors.push(format!("{key}: expected a boolean, got '{value}'")),
                }
            } else if key == LEGACY_DEFAULT_STRATEGY {
                object.insert(KEY_DEFAULT_STRATEGY.to_string(), Value::from(value));
            } else if let Some(operation) = legacy_operation_name(key) {
                operations.insert(operation, Value::from(value));
            } else if key.ends_with(LEGACY_OPERATION_STRATEGY_SUFFIX) {
                warn!(key, "Ignoring strategy variable with an invalid operation name");
            }
        }

        if object.is_empty() && operations.is_empty() && errors.is_empty() {
            return Ok(None);
        }
        if !errors.is_empty() {
            return Err(ConfigError::InvalidOverride { errors });
        }

        if !operations.is_empty() {
            object.insert(KEY_OPERATION_OVERRIDES.to_string(), Value::Object(operations.clone()));
        }
        reject_invalid(validate(&Value::Object(object.clone())), "legacy")?;

        let operation_strategies = operations
            .iter()
            .filter_map(|(op, strategy)| {
                let strategy = strategy.as_str()?.parse().ok()?;
                Some((op.clone(), strategy))
            })
            .collect();

        let overrides =
            Self { fields: OverrideFields::from_validated(&object), operation_strategies };
        debug!(?overrides, "Detected legacy resilience overrides");
        Ok(Some(overrides))
    }

    /// Overlay the scalar overrides onto `config`
    pub fn apply(&self, config: &mut ResilienceConfig) {
        self.fields.apply(config);
    }

    /// Strategy a legacy variable assigns to `operation`
    pub fn strategy_for(&self, operation: &str) -> Option<OperationStrategy> {
        self.operation_strategies.get(operation).copied()
    }
}

/// Operation named by a `<OPERATION>_RESILIENCE_STRATEGY` key
///
/// The prefix is lowercased and must be a valid operation name.
pub fn legacy_operation_name(key: &str) -> Option<String> {
    let operation = key.strip_suffix(LEGACY_OPERATION_STRATEGY_SUFFIX)?.to_ascii_lowercase();
    is_valid_operation_name(&operation).then_some(operation)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
