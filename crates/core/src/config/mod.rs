//! Resilience configuration resolution
//!
//! A [`ResilienceConfig`] for an operation is layered, highest wins:
//!
//! 1. structured custom overrides ([`CustomOverrides`])
//! 2. legacy individual variables ([`LegacyOverrides`])
//! 3. the selected built-in preset
//! 4. the library default (`balanced`)
//!
//! Both override layers pass through the [`validator`] before they reach the
//! resolver, so resolution itself only has to check the structural invariants
//! of the combined result.

pub mod custom;
pub mod legacy;
pub mod recommend;
pub mod resolver;
pub mod validator;

use bulwark_common::validation::ValidationResult;
use bulwark_domain::constants::{
    KEY_BACKOFF, KEY_BASE_DELAY_MS, KEY_DEFAULT_STRATEGY, KEY_FAILURE_THRESHOLD,
    KEY_HALF_OPEN_MAX_CALLS, KEY_JITTER, KEY_MAX_ATTEMPTS, KEY_MAX_DELAY_MS,
    KEY_RECOVERY_TIMEOUT_MS,
};
use bulwark_domain::{
    BackoffKind, ConfigError, ConfigResult, OperationStrategy, PresetName, ResilienceConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub use custom::CustomOverrides;
pub use legacy::{legacy_operation_name, LegacyOverrides};
pub use recommend::{list_presets, recommend, recommend_preset, PresetRecommendation};
pub use resolver::{resolve, resolve_operation};
pub use validator::{is_valid_operation_name, validate, validate_json, validate_operation_name};

/// Typed scalar overrides shared by the legacy and custom layers
///
/// Every field is optional; absent fields leave the underlying value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_open_max_calls: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_strategy: Option<OperationStrategy>,
}

impl OverrideFields {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay every set field onto `config`
    pub fn apply(&self, config: &mut ResilienceConfig) {
        if let Some(value) = self.max_attempts {
            config.max_attempts = value;
        }
        if let Some(value) = self.base_delay_ms {
            config.base_delay_ms = value;
        }
        if let Some(value) = self.max_delay_ms {
            config.max_delay_ms = value;
        }
        if let Some(value) = self.jitter {
            config.jitter = value;
        }
        if let Some(value) = self.failure_threshold {
            config.failure_threshold = value;
        }
        if let Some(value) = self.recovery_timeout_ms {
            config.recovery_timeout_ms = value;
        }
        if let Some(value) = self.half_open_max_calls {
            config.half_open_max_calls = value;
        }
        if let Some(value) = self.backoff {
            config.backoff = value;
        }
    }

    /// Read fields from an object that already passed [`validate`]
    pub(crate) fn from_validated(object: &Map<String, Value>) -> Self {
        let u64_field = |key: &str| object.get(key).and_then(Value::as_u64);
        let u32_field = |key: &str| u64_field(key).and_then(|n| u32::try_from(n).ok());
        let named = |key: &str| object.get(key).and_then(Value::as_str);

        Self {
            max_attempts: u32_field(KEY_MAX_ATTEMPTS),
            base_delay_ms: u64_field(KEY_BASE_DELAY_MS),
            max_delay_ms: u64_field(KEY_MAX_DELAY_MS),
            jitter: object.get(KEY_JITTER).and_then(Value::as_bool),
            failure_threshold: u32_field(KEY_FAILURE_THRESHOLD),
            recovery_timeout_ms: u64_field(KEY_RECOVERY_TIMEOUT_MS),
            half_open_max_calls: u32_field(KEY_HALF_OPEN_MAX_CALLS),
            backoff: named(KEY_BACKOFF).and_then(|name| name.parse().ok()),
            default_strategy: named(KEY_DEFAULT_STRATEGY).and_then(|name| name.parse().ok()),
        }
    }
}

/// Both override layers, as handed to the resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy: Option<LegacyOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomOverrides>,
}

impl ConfigOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_legacy(mut self, legacy: LegacyOverrides) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_custom(mut self, custom: CustomOverrides) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Names of every operation either layer mentions
    pub fn mentioned_operations(&self) -> Vec<&str> {
        let legacy = self.legacy.iter().flat_map(|l| l.operation_strategies.keys());
        let custom = self.custom.iter().flat_map(|c| c.operation_overrides.keys());
        let mut names: Vec<&str> = legacy.chain(custom).map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Complete configuration source for one orchestrator
///
/// Built by the host at startup, usually through the infra loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResilienceSettings {
    #[serde(default)]
    pub preset: PresetName,
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
}

impl ResilienceSettings {
    pub fn new(preset: PresetName) -> Self {
        Self { preset, overrides: ConfigOverrides::default() }
    }

    /// Settings for a preset given by name
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownPreset`] for names that are not built in.
    pub fn for_preset(name: &str) -> ConfigResult<Self> {
        PresetName::parse_named(name).map(Self::new)
    }

    pub fn with_legacy(mut self, legacy: LegacyOverrides) -> Self {
        self.overrides.legacy = Some(legacy);
        self
    }

    pub fn with_custom(mut self, custom: CustomOverrides) -> Self {
        self.overrides.custom = Some(custom);
        self
    }

    /// Resolved config for operations without a specific strategy
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the layered result breaks an invariant.
    pub fn resolve(&self) -> ConfigResult<ResilienceConfig> {
        resolver::resolve_layers(self.preset, &self.overrides, None, None)
    }

    /// Resolved config for one operation
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for invalid operation names or when the
    /// layered result breaks an invariant.
    pub fn resolve_operation(
        &self,
        operation: &str,
        registered: Option<OperationStrategy>,
    ) -> ConfigResult<ResilienceConfig> {
        validate_operation_name(operation)?;
        resolver::resolve_layers(self.preset, &self.overrides, Some(operation), registered)
    }

    /// Strategy used for operations nothing else assigns one to
    pub fn default_strategy(&self) -> OperationStrategy {
        resolver::select_strategy(self.preset, &self.overrides, None, None)
    }

    /// Strategy selected for `operation`
    pub fn strategy_for(
        &self,
        operation: &str,
        registered: Option<OperationStrategy>,
    ) -> OperationStrategy {
        resolver::select_strategy(self.preset, &self.overrides, Some(operation), registered)
    }

    /// Resolve the default config and every operation the settings name
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        self.resolve()?;
        let preset_operations = self.preset.preset().operation_strategies.iter().map(|(op, _)| *op);
        for operation in preset_operations.chain(self.overrides.mentioned_operations()) {
            self.resolve_operation(operation, None)?;
        }
        Ok(())
    }
}

/// Turn a failed validation into [`ConfigError::InvalidOverride`]
///
/// Warnings are logged and do not block.
pub(crate) fn reject_invalid(result: ValidationResult, layer: &str) -> ConfigResult<()> {
    for warning in result.warnings() {
        warn!(layer, field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if result.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidOverride { errors: result.error_messages() })
    }
}
