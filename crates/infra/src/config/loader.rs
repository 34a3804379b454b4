//! Configuration loader
//!
//! Loads resilience settings from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If the environment names a preset, a custom payload or any legacy key,
//!    the environment is authoritative
//! 2. Otherwise probes for a config file
//! 3. Falls back to environment defaults (preset from the environment hint,
//!    else `simple`)
//!
//! ## Environment Variables
//! - `BULWARK_RESILIENCE_PRESET`: Preset name (`simple`, `development`,
//!   `production`)
//! - `BULWARK_RESILIENCE_CUSTOM_CONFIG`: Custom override payload (JSON)
//! - `BULWARK_ENV` / `ENVIRONMENT`: Environment hint used to recommend a preset
//!   when none is set
//! - `RETRY_*`, `CIRCUIT_BREAKER_*`, `DEFAULT_RESILIENCE_STRATEGY`,
//!   `<OPERATION>_RESILIENCE_STRATEGY`: Legacy individual overrides
//!
//! ## File Format
//! TOML or JSON, detected by extension:
//!
//! ```toml
//! preset = "production"
//!
//! [custom]
//! max_attempts = 4
//!
//! [custom.operation_overrides]
//! qa = "critical"
//!
//! [legacy]
//! RETRY_JITTER = false
//!
//! [metrics.retention]
//! window_secs = 1800
//!
//! [metrics.alerts]
//! failure_rate = 0.3
//! ```
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./bulwark.toml` or `./bulwark.json` (current working directory)
//! 2. Relative to executable location

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bulwark_core::config::{
    legacy_operation_name, recommend_preset, CustomOverrides, LegacyOverrides,
};
use bulwark_core::{AlertThresholds, ResilienceSettings, RetentionPolicy};
use bulwark_domain::constants::{
    ENV_CUSTOM_CONFIG, ENV_ENVIRONMENT_HINTS, ENV_PRESET, LEGACY_SCALAR_KEYS,
};
use bulwark_domain::{ConfigError, PresetName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File names probed by [`probe_config_paths`], in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["bulwark.toml", "bulwark.json"];

const SOURCE_ENV: &str = "env";

const KEY_PRESET: &str = "preset";
const KEY_CUSTOM: &str = "custom";
const KEY_LEGACY: &str = "legacy";
const KEY_METRICS: &str = "metrics";

/// Metrics retention and alert settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub retention: RetentionPolicy,
    pub alerts: AlertThresholds,
}

/// Everything the loader produces
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub settings: ResilienceSettings,
    pub metrics: MetricsSettings,
    /// `env` or the path of the file the configuration came from
    pub source: String,
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No config file found in any of the standard locations")]
    NoConfigFile,

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {format} format: {message}")]
    Format { format: &'static str, message: String },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for configuration loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns a [`LoadError`] when the selected source is invalid. A broken
/// source is never skipped in favour of the next one.
pub fn load() -> LoadResult<LoadedConfig> {
    let vars: BTreeMap<String, String> = std::env::vars().collect();

    if env_is_configured(&vars) {
        let loaded = from_vars(vars)?;
        info!(preset = %loaded.settings.preset, "Configuration loaded from environment variables");
        return Ok(loaded);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            debug!("No resilience configuration found, using environment defaults");
            from_vars(vars)
        }
    }
}

/// Load configuration from the process environment
///
/// Missing variables fall back to defaults; only present-but-invalid values
/// are errors.
///
/// # Errors
/// Returns [`LoadError::Config`] for an unknown preset, an invalid custom
/// payload or unparseable legacy values.
pub fn load_from_env() -> LoadResult<LoadedConfig> {
    from_vars(std::env::vars())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns a [`LoadError`] if the file is missing, unreadable, malformed, or
/// describes an invalid configuration.
pub fn load_from_file(path: Option<PathBuf>) -> LoadResult<LoadedConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LoadError::NotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(LoadError::NoConfigFile)?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|source| LoadError::Read { path: config_path.clone(), source })?;

    parse_config(&contents, &config_path)
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Build configuration from an explicit set of variables
pub(crate) fn from_vars<I, K, V>(vars: I) -> LoadResult<LoadedConfig>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: BTreeMap<String, String> =
        vars.into_iter().map(|(key, value)| (key.into(), value.into())).collect();

    let mut settings = ResilienceSettings::new(select_preset(&vars)?);

    if let Some(legacy) = LegacyOverrides::detect(vars.iter())? {
        warn!("Legacy resilience variables detected; prefer {ENV_CUSTOM_CONFIG}");
        settings = settings.with_legacy(legacy);
    }

    if let Some(payload) = non_empty(&vars, ENV_CUSTOM_CONFIG) {
        settings = settings.with_custom(CustomOverrides::from_json(payload)?);
    }

    settings.validate()?;
    Ok(LoadedConfig {
        settings,
        metrics: MetricsSettings::default(),
        source: SOURCE_ENV.to_string(),
    })
}

fn select_preset(vars: &BTreeMap<String, String>) -> LoadResult<PresetName> {
    if let Some(name) = non_empty(vars, ENV_PRESET) {
        return Ok(PresetName::parse_named(name)?);
    }

    let hint = ENV_ENVIRONMENT_HINTS.iter().find_map(|key| non_empty(vars, key));
    match hint {
        Some(hint) => {
            let recommended = recommend_preset(hint);
            info!(hint, preset = %recommended, "Preset selected from environment hint");
            Ok(PresetName::parse_named(&recommended)?)
        }
        None => Ok(PresetName::default()),
    }
}

fn env_is_configured(vars: &BTreeMap<String, String>) -> bool {
    vars.keys().any(|key| {
        key == ENV_PRESET
            || key == ENV_CUSTOM_CONFIG
            || LEGACY_SCALAR_KEYS.contains(&key.as_str())
            || legacy_operation_name(key).is_some()
    })
}

fn non_empty<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> LoadResult<LoadedConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let document = match extension {
        "toml" => {
            let table: toml::Table = toml::from_str(contents)
                .map_err(|e| LoadError::Format { format: "TOML", message: e.to_string() })?;
            serde_json::to_value(table)
                .map_err(|e| LoadError::Format { format: "TOML", message: e.to_string() })?
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| LoadError::Format { format: "JSON", message: e.to_string() })?,
        _ => return Err(LoadError::UnsupportedFormat(extension.to_string())),
    };

    from_document(&document, path.display().to_string())
}

fn from_document(document: &Value, source: String) -> LoadResult<LoadedConfig> {
    let Some(object) = document.as_object() else {
        return Err(ConfigError::Parse("configuration must be a table".to_string()).into());
    };

    for key in object.keys() {
        if ![KEY_PRESET, KEY_CUSTOM, KEY_LEGACY, KEY_METRICS].contains(&key.as_str()) {
            warn!(key, source, "Ignoring unknown configuration key");
        }
    }

    let preset = match object.get(KEY_PRESET) {
        None => PresetName::default(),
        Some(Value::String(name)) => PresetName::parse_named(name)?,
        Some(_) => return Err(ConfigError::invalid_value(KEY_PRESET, "expected a string").into()),
    };
    let mut settings = ResilienceSettings::new(preset);

    if let Some(legacy) = object.get(KEY_LEGACY) {
        let vars = legacy_vars(legacy)?;
        if let Some(legacy) = LegacyOverrides::detect(vars)? {
            settings = settings.with_legacy(legacy);
        }
    }

    if let Some(custom) = object.get(KEY_CUSTOM) {
        settings = settings.with_custom(CustomOverrides::from_value(custom)?);
    }

    let metrics = match object.get(KEY_METRICS) {
        Some(section) => serde_json::from_value(section.clone())
            .map_err(|e| ConfigError::Parse(format!("{KEY_METRICS}: {e}")))?,
        None => MetricsSettings::default(),
    };

    settings.validate()?;
    Ok(LoadedConfig { settings, metrics, source })
}

/// Flatten a `[legacy]` table into variable-style pairs
fn legacy_vars(section: &Value) -> LoadResult<Vec<(String, String)>> {
    let empty = Map::new();
    let table = match section {
        Value::Object(table) => table,
        Value::Null => &empty,
        _ => return Err(ConfigError::invalid_value(KEY_LEGACY, "expected a table").into()),
    };

    table
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => {
                    return Err(ConfigError::invalid_value(
                        format!("{KEY_LEGACY}.{key}"),
                        "expected a scalar",
                    )
                    .into())
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}
