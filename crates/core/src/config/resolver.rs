//! Preset resolver
//!
//! Pure functions: the same preset and overrides always produce the same
//! [`ResilienceConfig`].

use bulwark_domain::{ConfigResult, OperationStrategy, PresetName, ResilienceConfig};
use tracing::trace;

use super::validator::validate_operation_name;
use super::ConfigOverrides;

/// Resolve the config for operations without a specific strategy
///
/// # Errors
/// Returns [`bulwark_domain::ConfigError::UnknownPreset`] for unknown preset
/// names, or an invariant violation of the layered result.
pub fn resolve(preset: &str, overrides: &ConfigOverrides) -> ConfigResult<ResilienceConfig> {
    let preset = PresetName::parse_named(preset)?;
    resolve_layers(preset, overrides, None, None)
}

/// Resolve the config for one operation
///
/// `registered` is the strategy the operation was registered with, if any.
///
/// # Errors
/// As [`resolve`], plus [`bulwark_domain::ConfigError::InvalidOperationName`].
pub fn resolve_operation(
    preset: &str,
    overrides: &ConfigOverrides,
    operation: &str,
    registered: Option<OperationStrategy>,
) -> ConfigResult<ResilienceConfig> {
    let preset = PresetName::parse_named(preset)?;
    validate_operation_name(operation)?;
    resolve_layers(preset, overrides, Some(operation), registered)
}

/// Pick the strategy for an operation
///
/// Order: custom operation override, legacy operation variable, explicit
/// registration, preset operation table, custom default, legacy default,
/// preset default.
pub(crate) fn select_strategy(
    preset: PresetName,
    overrides: &ConfigOverrides,
    operation: Option<&str>,
    registered: Option<OperationStrategy>,
) -> OperationStrategy {
    let custom = overrides.custom.as_ref();
    let legacy = overrides.legacy.as_ref();
    let preset = preset.preset();

    let per_operation = operation.and_then(|op| {
        custom
            .and_then(|c| c.strategy_for(op))
            .or_else(|| legacy.and_then(|l| l.strategy_for(op)))
            .or(registered)
            .or_else(|| preset.strategy_for(op))
    });

    per_operation
        .or_else(|| custom.and_then(|c| c.fields.default_strategy))
        .or_else(|| legacy.and_then(|l| l.fields.default_strategy))
        .unwrap_or(preset.default_strategy)
}

pub(crate) fn resolve_layers(
    preset: PresetName,
    overrides: &ConfigOverrides,
    operation: Option<&str>,
    registered: Option<OperationStrategy>,
) -> ConfigResult<ResilienceConfig> {
    let strategy = select_strategy(preset, overrides, operation, registered);
    let definition = preset.preset();

    let mut config = if strategy == definition.default_strategy {
        definition.config
    } else {
        strategy.parameters()
    };

    if let Some(legacy) = &overrides.legacy {
        legacy.apply(&mut config);
    }
    if let Some(custom) = &overrides.custom {
        custom.apply(&mut config);
    }

    config.check_invariants()?;
    trace!(%preset, operation = operation.unwrap_or("<default>"), %strategy, "Resolved resilience config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use bulwark_domain::ConfigError;

    use super::*;
    use crate::config::{CustomOverrides, LegacyOverrides};

    #[test]
    fn custom_override_beats_preset_default() {
        let overrides = ConfigOverrides::none().with_custom(
            CustomOverrides::from_json(r#"{"max_attempts": 5, "base_delay_ms": 10}"#).unwrap(),
        );
        let config = resolve("development", &overrides).unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.max_delay_ms, 2_000);
    }

    #[test]
    fn custom_beats_legacy_beats_preset() {
        let legacy = LegacyOverrides::detect([("RETRY_MAX_ATTEMPTS", "4"), ("RETRY_BASE_DELAY_MS", "50")])
            .unwrap()
            .unwrap();
        let custom = CustomOverrides::from_json(r#"{"max_attempts": 6}"#).unwrap();
        let overrides = ConfigOverrides::none().with_legacy(legacy).with_custom(custom);

        let config = resolve("simple", &overrides).unwrap();
        assert_eq!(config.max_attempts, 6);
        assert_eq!(config.base_delay_ms, 50);
    }

    #[test]
    fn unknown_preset_names_valid_presets() {
        match resolve("staging", &ConfigOverrides::none()).unwrap_err() {
            ConfigError::UnknownPreset { valid, .. } => {
                assert_eq!(valid, vec!["simple", "development", "production"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let overrides = ConfigOverrides::none()
            .with_custom(CustomOverrides::from_json(r#"{"jitter": false}"#).unwrap());
        let first = resolve_operation("production", &overrides, "qa", None).unwrap();
        let second = resolve_operation("production", &overrides, "qa", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn operation_strategy_precedence() {
        let none = ConfigOverrides::none();
        let production = PresetName::Production;

        assert_eq!(select_strategy(production, &none, Some("qa"), None), OperationStrategy::Critical);
        assert_eq!(
            select_strategy(production, &none, Some("qa"), Some(OperationStrategy::Balanced)),
            OperationStrategy::Balanced
        );
        assert_eq!(
            select_strategy(production, &none, Some("translate"), None),
            OperationStrategy::Conservative
        );

        let custom = CustomOverrides::from_json(
            r#"{"default_strategy": "aggressive", "operation_overrides": {"qa": "balanced"}}"#,
        )
        .unwrap();
        let overrides = ConfigOverrides::none().with_custom(custom);
        assert_eq!(
            select_strategy(production, &overrides, Some("qa"), Some(OperationStrategy::Critical)),
            OperationStrategy::Balanced
        );
        assert_eq!(
            select_strategy(production, &overrides, Some("translate"), None),
            OperationStrategy::Aggressive
        );
    }

    #[test]
    fn non_default_strategy_uses_strategy_table() {
        let config = resolve_operation("production", &ConfigOverrides::none(), "qa", None).unwrap();
        assert_eq!(config, OperationStrategy::Critical.parameters());

        let summarize =
            resolve_operation("production", &ConfigOverrides::none(), "summarize", None).unwrap();
        assert_eq!(summarize, PresetName::Production.preset().config);
    }

    #[test]
    fn layered_result_must_hold_invariants() {
        let custom = CustomOverrides::from_json(r#"{"base_delay_ms": 5000}"#).unwrap();
        let overrides = ConfigOverrides::none().with_custom(custom);
        assert!(resolve("development", &overrides).is_err());
    }

    #[test]
    fn invalid_operation_names_are_rejected() {
        assert!(matches!(
            resolve_operation("simple", &ConfigOverrides::none(), "Summarize!", None),
            Err(ConfigError::InvalidOperationName { .. })
        ));
    }
}
