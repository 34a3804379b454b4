//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! handing it to an orchestrator.

use std::io::Write;
use std::path::PathBuf;

use bulwark_core::{MetricsCollector, OrchestratorBuilder};
use bulwark_domain::{OperationStrategy, PresetName};
use bulwark_infra::config::{self, LoadError};
use tempfile::{Builder, NamedTempFile};

fn write_config(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .prefix("bulwark")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_toml_file() {
    let file = write_config(
        r#"
preset = "production"

[custom]
max_attempts = 6

[custom.operation_overrides]
summarize = "critical"

[metrics.retention]
window_secs = 900
max_tracked_operations = 50
"#,
        ".toml",
    );

    let loaded = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert_eq!(loaded.settings.preset, PresetName::Production);
    assert_eq!(loaded.source, file.path().display().to_string());
    assert_eq!(loaded.settings.strategy_for("summarize", None), OperationStrategy::Critical);
    assert_eq!(loaded.metrics.retention.window_secs, 900);
    assert_eq!(loaded.metrics.retention.max_tracked_operations, 50);

    let qa = loaded.settings.resolve_operation("qa", None).expect("qa should resolve");
    assert_eq!(qa.max_attempts, 6);
    assert_eq!(qa.failure_threshold, 10);
}

#[test]
fn test_load_config_from_json_file() {
    let file = write_config(
        r#"{
            "preset": "development",
            "legacy": { "RETRY_MAX_ATTEMPTS": 2, "QA_RESILIENCE_STRATEGY": "balanced" },
            "metrics": { "alerts": { "retry_rate": 0.8 } }
        }"#,
        ".json",
    );

    let loaded = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(loaded.settings.preset, PresetName::Development);
    assert_eq!(loaded.settings.strategy_for("qa", None), OperationStrategy::Balanced);
    assert_eq!(loaded.settings.resolve().expect("default should resolve").max_attempts, 2);
    assert!((loaded.metrics.alerts.retry_rate - 0.8).abs() < f64::EPSILON);
}

#[test]
fn test_loaded_config_builds_orchestrator() {
    let file = write_config(
        r#"
preset = "simple"

[metrics.alerts]
min_calls = 1
"#,
        ".toml",
    );
    let loaded = config::load_from_file(Some(file.path().to_path_buf())).expect("config loads");

    let metrics = std::sync::Arc::new(MetricsCollector::with_policy(
        loaded.metrics.retention,
        loaded.metrics.alerts,
    ));
    let orchestrator = OrchestratorBuilder::new(loaded.settings)
        .with_metrics(std::sync::Arc::clone(&metrics))
        .with_config_source(loaded.source)
        .build()
        .expect("orchestrator builds");

    orchestrator
        .register("summarize", OperationStrategy::Conservative)
        .expect("registration succeeds");
    assert_eq!(
        orchestrator.registered_operations(),
        vec![("summarize".to_string(), OperationStrategy::Conservative)]
    );

    let events = metrics.config_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].preset, "simple");
}

#[test]
fn test_invalid_override_in_file_is_rejected() {
    let file = write_config(
        r#"
[custom]
max_attempts = 42
"#,
        ".toml",
    );

    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, LoadError::Config(_)), "unexpected error: {err}");
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_malformed_file_reports_format() {
    let file = write_config("{ \"preset\": ", ".json");
    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, LoadError::Format { format: "JSON", .. }));
}

#[test]
fn test_missing_file() {
    let err = config::load_from_file(Some(PathBuf::from("/nonexistent/bulwark.json"))).unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}
