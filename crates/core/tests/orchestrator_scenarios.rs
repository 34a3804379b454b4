//! End-to-end scenarios through the orchestrator
//!
//! Every test runs on paused Tokio time (retry sleeps complete instantly)
//! and a mock clock for breaker recovery timeouts.

mod support;

use std::time::Duration;

use bulwark_common::error::UpstreamError;
use bulwark_common::resilience::{CircuitState, ExecutionContext, ResilienceErrorKind};
use bulwark_common::{ResilienceError, ResilienceResult};
use bulwark_core::{AlertKind, CustomOverrides, HealthStatus, ResilienceSettings};
use bulwark_domain::{OperationStrategy, PresetName};
use support::{bad_request, network_error, CallCounter, Harness};
use tokio_util::sync::CancellationToken;

fn with_custom(preset: PresetName, json: &str) -> ResilienceSettings {
    ResilienceSettings::new(preset).with_custom(CustomOverrides::from_json(json).unwrap())
}

/// Validates that an unregistered operation under `simple` retries a
/// transient failure exactly `max_attempts` times.
///
/// # Test Steps
/// 1. Build an orchestrator on the `simple` preset
/// 2. Execute an unregistered operation that always fails with a network
///    error
/// 3. Verify three invocations, a `TransientExhausted` error and three
///    attempt records in metrics
#[tokio::test(start_paused = true)]
async fn test_unregistered_operation_exhausts_default_attempts() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Simple));
    let calls = CallCounter::default();

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute("translate", || {
            calls.hit();
            async { Err(network_error()) }
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ResilienceErrorKind::TransientExhausted);
    assert_eq!(err.attempts(), 3);
    assert_eq!(calls.count(), 3);
    assert_eq!(harness.orchestrator.circuit_state("translate"), Some(CircuitState::Closed));

    let snapshot = harness.metrics.snapshot(Some("translate"));
    assert_eq!(snapshot.attempts, 3);
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.failures, 1);
}

/// Validates that a low failure threshold opens the circuit mid-loop while
/// the loop still finishes its attempts.
#[tokio::test(start_paused = true)]
async fn test_circuit_opens_mid_loop_with_low_threshold() {
    let harness = Harness::new(with_custom(PresetName::Simple, r#"{"failure_threshold": 2}"#));
    let calls = CallCounter::default();

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute("translate", || {
            calls.hit();
            async { Err(network_error()) }
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ResilienceErrorKind::TransientExhausted);
    assert_eq!(calls.count(), 3);
    assert_eq!(harness.orchestrator.circuit_state("translate"), Some(CircuitState::Open));
    assert_eq!(harness.metrics.snapshot(Some("translate")).circuit_opens, 1);
}

/// Validates that a permanent failure is surfaced after one attempt with no
/// retry delay.
#[tokio::test(start_paused = true)]
async fn test_permanent_failure_is_not_retried() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Production));
    let calls = CallCounter::default();
    let started = tokio::time::Instant::now();

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute("qa", || {
            calls.hit();
            async { Err(bad_request()) }
        })
        .await;

    match result.unwrap_err() {
        ResilienceError::PermanentUpstream { operation, source } => {
            assert_eq!(operation, "qa");
            assert!(matches!(source, UpstreamError::Http { status: 400, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

/// Validates recovery of an open circuit after `recovery_timeout_ms`.
///
/// # Test Steps
/// 1. Trip a circuit configured with a 1000ms recovery timeout
/// 2. Confirm the next call is rejected without invoking the function
/// 3. Advance mock time by 1000ms and confirm health lists it as half-open
/// 4. Confirm the next call is admitted as a trial and closes the circuit
#[tokio::test(start_paused = true)]
async fn test_open_circuit_admits_trial_after_recovery_timeout() {
    let harness = Harness::new(with_custom(
        PresetName::Simple,
        r#"{"max_attempts": 1, "failure_threshold": 1, "recovery_timeout_ms": 1000}"#,
    ));
    let calls = CallCounter::default();
    let orchestrator = &harness.orchestrator;

    let _: ResilienceResult<(), UpstreamError> = orchestrator
        .execute("summarize", || {
            calls.hit();
            async { Err(network_error()) }
        })
        .await;
    assert_eq!(orchestrator.circuit_state("summarize"), Some(CircuitState::Open));
    assert_eq!(orchestrator.health(None).status, HealthStatus::Unhealthy);

    let rejected: ResilienceResult<(), UpstreamError> = orchestrator
        .execute("summarize", || {
            calls.hit();
            async { Ok(()) }
        })
        .await;
    match rejected.unwrap_err() {
        ResilienceError::CircuitOpen { retry_after, .. } => {
            assert_eq!(retry_after, Duration::from_millis(1_000));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.count(), 1);

    harness.clock.advance_millis(1_000);
    let health = orchestrator.health(None);
    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.half_open_circuits, vec!["summarize".to_string()]);
    assert!(health.open_circuits.is_empty());

    let recovered: ResilienceResult<&str, UpstreamError> = orchestrator
        .execute("summarize", || {
            calls.hit();
            async { Ok("summary") }
        })
        .await;

    assert_eq!(recovered.unwrap(), "summary");
    assert_eq!(calls.count(), 2);
    assert_eq!(orchestrator.circuit_state("summarize"), Some(CircuitState::Closed));
    assert!(orchestrator.health(Some("summarize")).is_healthy());

    let snapshot = harness.metrics.snapshot(Some("summarize"));
    assert_eq!(snapshot.rejections, 1);
    assert_eq!(snapshot.circuit_state, Some(CircuitState::Closed));
}

/// Validates that custom overrides take precedence over the preset.
#[test]
fn test_custom_override_beats_development_default() {
    let harness = Harness::new(with_custom(
        PresetName::Development,
        r#"{"max_attempts": 5, "base_delay_ms": 10}"#,
    ));
    let config = harness.orchestrator.operation_config("sentiment").unwrap();
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.base_delay_ms, 10);
}

/// Validates that `max_attempts = 1` means exactly one invocation for both
/// failure classes.
#[tokio::test(start_paused = true)]
async fn test_single_attempt_means_no_retries() {
    let harness = Harness::new(with_custom(PresetName::Simple, r#"{"max_attempts": 1}"#));

    for failure in [network_error(), bad_request()] {
        let calls = CallCounter::default();
        let result: ResilienceResult<(), UpstreamError> = harness
            .orchestrator
            .execute("qa", || {
                calls.hit();
                let failure = failure.clone();
                async move { Err(failure) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.count(), 1);
    }
}

/// Validates that the call after `failure_threshold` consecutive failures is
/// rejected without invoking the wrapped function.
#[tokio::test(start_paused = true)]
async fn test_call_after_threshold_is_rejected() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Production));
    harness.orchestrator.register("key_points", OperationStrategy::Aggressive).unwrap();
    let calls = CallCounter::default();

    // aggressive: two attempts per call, threshold three, so the circuit
    // opens on the third attempt and the fourth still runs
    for _ in 0..2 {
        let _: ResilienceResult<(), UpstreamError> = harness
            .orchestrator
            .execute("key_points", || {
                calls.hit();
                async { Err(network_error()) }
            })
            .await;
    }
    assert_eq!(calls.count(), 4);

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute("key_points", || {
            calls.hit();
            async { Ok(()) }
        })
        .await;
    assert_eq!(result.unwrap_err().kind(), ResilienceErrorKind::CircuitOpen);
    assert_eq!(calls.count(), 4);
}

/// Validates that a success resets the consecutive failure count.
#[tokio::test(start_paused = true)]
async fn test_success_resets_consecutive_failures() {
    let harness = Harness::new(with_custom(
        PresetName::Simple,
        r#"{"max_attempts": 1, "failure_threshold": 2}"#,
    ));
    let orchestrator = &harness.orchestrator;

    for _ in 0..3 {
        let _: ResilienceResult<(), UpstreamError> =
            orchestrator.execute("qa", || async { Err(network_error()) }).await;
        let _: ResilienceResult<(), UpstreamError> =
            orchestrator.execute("qa", || async { Ok(()) }).await;
        let metrics = orchestrator.circuit_metrics("qa").unwrap();
        assert_eq!(metrics.consecutive_failures, 0);
        assert_eq!(metrics.state, CircuitState::Closed);
    }
}

/// Validates that attempt timeouts count as transient failures.
#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_is_retried_then_exhausted() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Simple));
    let calls = CallCounter::default();
    let context = ExecutionContext::new().with_attempt_timeout(Duration::from_millis(50));

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute_with_context("summarize", &context, || {
            calls.hit();
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ResilienceErrorKind::TransientExhausted);
    assert_eq!(calls.count(), 3);
}

/// Validates that caller cancellation stops retrying without counting as a
/// breaker failure.
#[tokio::test(start_paused = true)]
async fn test_cancellation_propagates_without_retry() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Simple));
    let token = CancellationToken::new();
    token.cancel();
    let context = ExecutionContext::new().with_cancellation(token);
    let calls = CallCounter::default();

    let result: ResilienceResult<(), UpstreamError> = harness
        .orchestrator
        .execute_with_context("qa", &context, || {
            calls.hit();
            async { Err(network_error()) }
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ResilienceErrorKind::Cancelled);
    assert_eq!(calls.count(), 0);
    assert_eq!(harness.orchestrator.circuit_metrics("qa").unwrap().consecutive_failures, 0);
}

/// Validates that a reset circuit is reported through metrics and alerts
/// clear once the circuit closes.
#[tokio::test(start_paused = true)]
async fn test_manual_reset_clears_open_circuit_alert() {
    let harness = Harness::new(with_custom(
        PresetName::Simple,
        r#"{"max_attempts": 1, "failure_threshold": 1}"#,
    ));
    let _: ResilienceResult<(), UpstreamError> =
        harness.orchestrator.execute("qa", || async { Err(network_error()) }).await;

    let kinds: Vec<AlertKind> = harness.metrics.alerts().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::CircuitOpen]);

    assert!(harness.orchestrator.reset_circuit("qa"));
    assert_eq!(harness.orchestrator.circuit_state("qa"), Some(CircuitState::Closed));
    assert!(harness.metrics.alerts().is_empty());
}

/// Validates that a failed reconfiguration is recorded as a config-load
/// failure alert.
#[test]
fn test_rejected_reconfiguration_raises_alert() {
    let harness = Harness::new(ResilienceSettings::new(PresetName::Production));
    let bad = with_custom(PresetName::Development, r#"{"base_delay_ms": 50000}"#);

    assert!(harness.orchestrator.reconfigure(bad, "reload").is_err());

    let events = harness.metrics.config_events();
    assert_eq!(events.len(), 2);
    assert!(events[0].success);
    assert!(!events[1].success);
    assert!(harness.metrics.alerts().iter().any(|a| a.kind == AlertKind::ConfigLoadFailures));
}
