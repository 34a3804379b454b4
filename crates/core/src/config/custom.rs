//! Structured custom overrides
//!
//! The highest-precedence layer: a JSON object using the same keys as
//! [`ResilienceConfig`], plus `backoff`, `default_strategy` and
//! `operation_overrides`. Payloads are validated before they are converted,
//! so an invalid payload is rejected at the boundary and never partially
//! applied.

use std::collections::BTreeMap;

use bulwark_domain::constants::KEY_OPERATION_OVERRIDES;
use bulwark_domain::{ConfigError, ConfigResult, OperationStrategy, ResilienceConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validator::{validate, validate_json};
use super::{reject_invalid, OverrideFields};

/// Validated custom override payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOverrides {
    #[serde(flatten)]
    pub fields: OverrideFields,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operation_overrides: BTreeMap<String, OperationStrategy>,
}

impl CustomOverrides {
    /// Parse and validate override JSON text
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidOverride`] listing every validation
    /// error when the payload is rejected.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        reject_invalid(validate_json(text), "custom")?;
        let value: Value =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(Self::from_validated(&value))
    }

    /// Validate and convert an already parsed payload
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidOverride`] when validation fails.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        reject_invalid(validate(value), "custom")?;
        Ok(Self::from_validated(value))
    }

    fn from_validated(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let operation_overrides = object
            .get(KEY_OPERATION_OVERRIDES)
            .and_then(Value::as_object)
            .map(|overrides| {
                overrides
                    .iter()
                    .filter_map(|(op, strategy)| {
                        Some((op.clone(), strategy.as_str()?.parse().ok()?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { fields: OverrideFields::from_validated(object), operation_overrides }
    }

    /// Whether the payload changes nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.operation_overrides.is_empty()
    }

    /// Overlay the scalar overrides onto `config`
    pub fn apply(&self, config: &mut ResilienceConfig) {
        self.fields.apply(config);
    }

    /// Strategy the payload assigns to `operation`
    pub fn strategy_for(&self, operation: &str) -> Option<OperationStrategy> {
        self.operation_overrides.get(operation).copied()
    }
}

#[cfg(test)]
mod tests {
    use bulwark_domain::BackoffKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_full_payload() {
        let custom = CustomOverrides::from_json(
            r#"{
                "max_attempts": 5,
                "base_delay_ms": 10,
                "backoff": "fixed",
                "default_strategy": "Conservative",
                "operation_overrides": {"qa": "critical"}
            }"#,
        )
        .unwrap();

        assert_eq!(custom.fields.max_attempts, Some(5));
        assert_eq!(custom.fields.base_delay_ms, Some(10));
        assert_eq!(custom.fields.backoff, Some(BackoffKind::Fixed));
        assert_eq!(custom.fields.default_strategy, Some(OperationStrategy::Conservative));
        assert_eq!(custom.strategy_for("qa"), Some(OperationStrategy::Critical));
    }

    #[test]
    fn invalid_payload_is_rejected_whole() {
        let err = CustomOverrides::from_value(&json!({
            "max_attempts": 50,
            "half_open_max_calls": 0,
        }))
        .unwrap_err();

        match err {
            ConfigError::InvalidOverride { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_only_warn() {
        let custom = CustomOverrides::from_value(&json!({"colour": "blue"})).unwrap();
        assert!(custom.is_empty());
    }

    #[test]
    fn malformed_text_is_an_override_error() {
        assert!(matches!(
            CustomOverrides::from_json("{\"max_attempts\": "),
            Err(ConfigError::InvalidOverride { .. })
        ));
    }
}
