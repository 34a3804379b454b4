//! Subcommand implementations
//!
//! Each command renders into a `String` first so the output can be tested
//! without capturing stdout.

use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use bulwark_common::validation::ValidationResult;
use bulwark_core::config::{self, CustomOverrides, PresetRecommendation};
use bulwark_core::ResilienceSettings;
use bulwark_domain::{OperationStrategy, PresetName, ResilienceConfig, PRESETS};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Resolved configuration as printed by `resolve`
#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub preset: PresetName,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub strategy: OperationStrategy,
    pub config: ResilienceConfig,
}

pub fn validate(
    file: Option<&Path>,
    json: Option<&str>,
    json_output: bool,
) -> anyhow::Result<ExitCode> {
    let result = match (file, json) {
        (Some(path), _) => validate_file(path)?,
        (None, Some(text)) => config::validate_json(text),
        (None, None) => bail!("either --file or --json is required"),
    };
    debug!(
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "Validated override payload"
    );

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_validation(&result));
    }

    Ok(if result.is_valid() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

pub fn presets(details: bool) -> anyhow::Result<ExitCode> {
    print!("{}", render_presets(details)?);
    Ok(ExitCode::SUCCESS)
}

pub fn recommend(hint: &str) -> anyhow::Result<ExitCode> {
    print!("{}", render_recommendation(&config::recommend(hint)));
    Ok(ExitCode::SUCCESS)
}

pub fn resolve(
    preset: Option<&str>,
    custom: Option<&str>,
    operation: Option<&str>,
    strategy: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let output = resolve_output(preset, custom, operation, strategy)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

/// Validate a payload file; TOML is converted to the JSON data model first
pub(crate) fn validate_file(path: &Path) -> anyhow::Result<ValidationResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            debug!(path = %path.display(), "Reading TOML payload");
            let table: toml::Table = toml::from_str(&text)
                .with_context(|| format!("{} is not valid TOML", path.display()))?;
            let value = serde_json::to_value(table)?;
            Ok(config::validate(&value))
        }
        Some("json") => Ok(config::validate_json(&text)),
        other => {
            warn!(path = %path.display(), extension = ?other, "Unknown payload extension, parsing as JSON");
            Ok(config::validate_json(&text))
        }
    }
}

pub(crate) fn render_validation(result: &ValidationResult) -> String {
    let mut out = String::new();
    for error in result.errors() {
        let _ = writeln!(out, "error: {}: {}", error.field, error.message);
    }
    for warning in result.warnings() {
        let _ = writeln!(out, "warning: {}: {}", warning.field, warning.message);
    }

    let verdict = if result.is_valid() { "valid" } else { "invalid" };
    let _ = writeln!(
        out,
        "{verdict} ({} error(s), {} warning(s))",
        result.errors().len(),
        result.warnings().len()
    );
    out
}

pub(crate) fn render_presets(details: bool) -> anyhow::Result<String> {
    let mut out = String::new();
    if !details {
        for name in config::list_presets() {
            let _ = writeln!(out, "{name}");
        }
        return Ok(out);
    }

    let strategies = OperationStrategy::names().join(", ");
    for preset in &PRESETS {
        let _ = writeln!(out, "{}", preset.name);
        let _ = writeln!(out, "  {}", preset.description);
        let _ = writeln!(out, "  default strategy: {}", preset.default_strategy);
        let _ = writeln!(out, "  allowed strategies: {strategies}");
        let _ = writeln!(out, "  environments: {}", preset.environments.join(", "));
        for (operation, strategy) in preset.operation_strategies {
            let _ = writeln!(out, "  operation {operation}: {strategy}");
        }
        let _ = writeln!(out, "  config: {}", serde_json::to_string(&preset.config)?);
    }
    Ok(out)
}

pub(crate) fn render_recommendation(recommendation: &PresetRecommendation) -> String {
    format!(
        "{} (confidence {:.2})\n{}\n",
        recommendation.preset, recommendation.confidence, recommendation.reasoning
    )
}

pub(crate) fn resolve_output(
    preset: Option<&str>,
    custom: Option<&str>,
    operation: Option<&str>,
    strategy: Option<&str>,
) -> anyhow::Result<ResolveOutput> {
    let (mut settings, source) = match preset {
        Some(name) => (ResilienceSettings::for_preset(name)?, "arguments".to_string()),
        None => {
            let loaded = bulwark_infra::load().context("failed to load configuration")?;
            info!(source = %loaded.source, preset = %loaded.settings.preset, "Loaded configuration");
            (loaded.settings, loaded.source)
        }
    };

    if let Some(payload) = custom {
        debug!(bytes = payload.len(), "Applying custom overrides from arguments");
        settings = settings.with_custom(CustomOverrides::from_json(payload)?);
    }

    let registered = strategy.map(OperationStrategy::parse_named).transpose()?;

    let (strategy, config) = match operation {
        Some(op) => (
            settings.strategy_for(op, registered),
            settings.resolve_operation(op, registered)?,
        ),
        None => (settings.default_strategy(), settings.resolve()?),
    };

    Ok(ResolveOutput {
        preset: settings.preset,
        source,
        operation: operation.map(str::to_string),
        strategy,
        config,
    })
}
