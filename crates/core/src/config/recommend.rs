//! Preset recommendation from an environment hint

use bulwark_domain::{PresetName, PRESETS};
use serde::Serialize;

const EXACT_CONFIDENCE: f64 = 0.95;
const PARTIAL_CONFIDENCE: f64 = 0.75;
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Suggested preset with how sure we are and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetRecommendation {
    pub preset: PresetName,
    pub confidence: f64,
    pub reasoning: String,
}

/// Names of every built-in preset
pub fn list_presets() -> Vec<String> {
    PresetName::names().iter().map(ToString::to_string).collect()
}

/// Recommend a preset for an environment hint such as `"prod"` or `"local"`
///
/// An exact environment match wins; otherwise the first preset whose
/// environment appears inside the hint (`"prod-eu-1"`). Anything else falls
/// back to `simple`.
pub fn recommend(hint: &str) -> PresetRecommendation {
    let normalized = hint.trim().to_ascii_lowercase();

    if !normalized.is_empty() {
        let exact = PRESETS
            .iter()
            .find(|preset| preset.environments.contains(&normalized.as_str()));
        if let Some(preset) = exact {
            return PresetRecommendation {
                preset: preset.name,
                confidence: EXACT_CONFIDENCE,
                reasoning: format!("'{normalized}' is a {} environment", preset.name),
            };
        }

        // Production first so "prod-test" errs toward the persistent preset
        let partial = PRESETS.iter().rev().find_map(|preset| {
            preset
                .environments
                .iter()
                .find(|env| normalized.contains(**env))
                .map(|env| (preset, *env))
        });
        if let Some((preset, env)) = partial {
            return PresetRecommendation {
                preset: preset.name,
                confidence: PARTIAL_CONFIDENCE,
                reasoning: format!("'{normalized}' mentions '{env}', a {} environment", preset.name),
            };
        }
    }

    PresetRecommendation {
        preset: PresetName::Simple,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: format!("no known environment in '{normalized}'; simple is the general default"),
    }
}

/// Name of the recommended preset
pub fn recommend_preset(hint: &str) -> String {
    recommend(hint).preset.to_string()
}
