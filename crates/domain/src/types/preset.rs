//! Built-in deployment presets
//!
//! Presets are static data: defined at compile time, never mutated. A preset
//! names a default strategy, a base [`ResilienceConfig`] for operations that
//! use that strategy, and a table of per-operation strategy overrides.

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::impl_named_enum;
use crate::types::config::{BackoffKind, ResilienceConfig};
use crate::types::strategy::OperationStrategy;

/// Name of a built-in preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    #[default]
    Simple,
    Development,
    Production,
}

impl_named_enum!(PresetName {
    Simple => "simple",
    Development => "development",
    Production => "production",
});

impl PresetName {
    /// Every built-in preset name
    pub const ALL: [Self; 3] = [Self::Simple, Self::Development, Self::Production];

    /// Parse a preset name, producing a [`ConfigError`] on failure
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownPreset`] naming the valid presets.
    pub fn parse_named(name: &str) -> ConfigResult<Self> {
        name.parse().map_err(|_| ConfigError::UnknownPreset {
            name: name.to_string(),
            valid: Self::names().iter().map(ToString::to_string).collect(),
        })
    }

    /// The static preset definition for this name
    pub fn preset(self) -> &'static Preset {
        match self {
            Self::Simple => &PRESETS[0],
            Self::Development => &PRESETS[1],
            Self::Production => &PRESETS[2],
        }
    }
}

/// Immutable preset definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub name: PresetName,
    pub description: &'static str,
    pub default_strategy: OperationStrategy,
    pub config: ResilienceConfig,
    pub operation_strategies: &'static [(&'static str, OperationStrategy)],
    pub environments: &'static [&'static str],
}

impl Preset {
    /// Strategy the preset assigns to `operation`, if it names one
    pub fn strategy_for(&self, operation: &str) -> Option<OperationStrategy> {
        self.operation_strategies
            .iter()
            .find(|(name, _)| *name == operation)
            .map(|(_, strategy)| *strategy)
    }
}

/// Built-in presets, indexed in [`PresetName::ALL`] order
pub static PRESETS: [Preset; 3] = [
    Preset {
        name: PresetName::Simple,
        description: "Balanced defaults for every operation; a safe starting point",
        default_strategy: OperationStrategy::Balanced,
        config: OperationStrategy::Balanced.parameters(),
        operation_strategies: &[],
        environments: &["testing", "staging", "general"],
    },
    Preset {
        name: PresetName::Development,
        description: "Fast feedback: few quick retries, breakers trip and recover early",
        default_strategy: OperationStrategy::Aggressive,
        config: ResilienceConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            jitter: false,
            failure_threshold: 3,
            recovery_timeout_ms: 10_000,
            half_open_max_calls: 1,
            backoff: BackoffKind::Exponential,
        },
        operation_strategies: &[
            ("sentiment", OperationStrategy::Aggressive),
            ("key_points", OperationStrategy::Aggressive),
        ],
        environments: &["development", "local", "test"],
    },
    Preset {
        name: PresetName::Production,
        description: "Persistent retries with jitter and tolerant breakers for live traffic",
        default_strategy: OperationStrategy::Conservative,
        config: ResilienceConfig {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: true,
            failure_threshold: 8,
            recovery_timeout_ms: 60_000,
            half_open_max_calls: 2,
            backoff: BackoffKind::Exponential,
        },
        operation_strategies: &[
            ("qa", OperationStrategy::Critical),
            ("summarize", OperationStrategy::Conservative),
            ("sentiment", OperationStrategy::Aggressive),
        ],
        environments: &["production", "prod", "live"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_table_matches_names() {
        for name in PresetName::ALL {
            assert_eq!(name.preset().name, name);
        }
    }

    #[test]
    fn every_preset_config_satisfies_invariants() {
        for preset in &PRESETS {
            assert!(preset.config.check_invariants().is_ok(), "{} is invalid", preset.name);
        }
    }

    #[test]
    fn development_defaults_to_three_attempts() {
        assert_eq!(PresetName::Development.preset().config.max_attempts, 3);
    }

    #[test]
    fn strategy_for_uses_operation_table() {
        let production = PresetName::Production.preset();
        assert_eq!(production.strategy_for("qa"), Some(OperationStrategy::Critical));
        assert_eq!(production.strategy_for("translate"), None);
    }

    #[test]
    fn unknown_preset_names_valid_presets() {
        let err = PresetName::parse_named("staging").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("simple"));
        assert!(message.contains("development"));
        assert!(message.contains("production"));
    }
}
