//! Integration tests for resilience module
//!
//! Exercises circuit breaker and retry executor together across concurrent
//! callers and mock time.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::error::UpstreamError;
use bulwark_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, ExecutionContext, MockClock,
    ResilienceErrorKind, ResilienceResult, RetryExecutor,
};
use bulwark_domain::ResilienceConfig;

fn fast_config(max_attempts: u32, failure_threshold: u32, half_open_max_calls: u32) -> ResilienceConfig {
    ResilienceConfig {
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter: false,
        failure_threshold,
        recovery_timeout_ms: 1_000,
        half_open_max_calls,
        ..ResilienceConfig::default()
    }
}

/// Validates recovery of an open circuit under mock time.
///
/// # Test Steps
/// 1. Trip a breaker with `recovery_timeout_ms = 1000`
/// 2. Confirm calls are rejected before the timeout elapses
/// 3. Advance the clock by 1000ms
/// 4. Confirm the next call is admitted as a half-open trial and closes the
///    circuit on success
#[tokio::test(flavor = "multi_thread")]
async fn test_open_circuit_recovers_after_timeout() {
    let clock = MockClock::new();
    let config = fast_config(1, 1, 1);
    let breaker = Arc::new(
        CircuitBreaker::with_clock(
            "qa",
            CircuitBreakerConfig::from(&config),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );
    let executor = RetryExecutor::new("qa", config, Arc::clone(&breaker));
    let ctx = ExecutionContext::new();

    let tripped: ResilienceResult<(), UpstreamError> =
        executor.execute(&ctx, || async { Err(UpstreamError::network("down")) }).await;
    assert_eq!(tripped.unwrap_err().kind(), ResilienceErrorKind::TransientExhausted);
    assert_eq!(breaker.state(), CircuitState::Open);

    clock.advance_millis(500);
    let rejected: ResilienceResult<(), UpstreamError> =
        executor.execute(&ctx, || async { Ok(()) }).await;
    assert_eq!(rejected.unwrap_err().kind(), ResilienceErrorKind::CircuitOpen);

    clock.advance_millis(500);
    let recovered: ResilienceResult<&str, UpstreamError> =
        executor.execute(&ctx, || async { Ok("ok") }).await;
    assert_eq!(recovered.unwrap(), "ok");
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Validates that a half-open circuit never serves more concurrent trial
/// calls than `half_open_max_calls`.
///
/// # Test Steps
/// 1. Trip a breaker allowing two half-open trials and let it recover
/// 2. Launch eight concurrent calls that hold their trial slot, then fail
/// 3. Track the maximum number of calls running at once
/// 4. Verify exactly two trials ran and the other six were rejected
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_half_open_concurrency_is_bounded() {
    let clock = MockClock::new();
    let config = fast_config(1, 1, 2);
    let breaker = Arc::new(
        CircuitBreaker::with_clock(
            "summarize",
            CircuitBreakerConfig::from(&config),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );
    let executor = Arc::new(RetryExecutor::new("summarize", config, Arc::clone(&breaker)));

    let _: ResilienceResult<(), UpstreamError> = executor
        .execute(&ExecutionContext::new(), || async { Err(UpstreamError::http(503, "x")) })
        .await;
    assert_eq!(breaker.state(), CircuitState::Open);
    clock.advance_millis(1_000);

    let running = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();

    for _ in 0..8 {
        let executor = Arc::clone(&executor);
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            let result: ResilienceResult<(), UpstreamError> = executor
                .execute(&ExecutionContext::new(), || {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Err(UpstreamError::network("still down"))
                    }
                })
                .await;
            result
        }));
    }

    let mut rejected = 0;
    let mut attempted = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap_err().kind() {
            ResilienceErrorKind::CircuitOpen => rejected += 1,
            ResilienceErrorKind::TransientExhausted => attempted += 1,
            other => panic!("unexpected error kind: {other}"),
        }
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(attempted, 2);
    assert_eq!(rejected, 6);
    assert_eq!(breaker.state(), CircuitState::Open);
}

/// Validates that the very next call after `failure_threshold` consecutive
/// transient failures is rejected without invoking the wrapped function.
#[tokio::test(flavor = "multi_thread")]
async fn test_next_call_after_threshold_is_rejected() {
    let config = fast_config(1, 3, 1);
    let breaker =
        Arc::new(CircuitBreaker::new("sentiment", CircuitBreakerConfig::from(&config)).unwrap());
    let executor = RetryExecutor::new("sentiment", config, Arc::clone(&breaker));
    let invocations = Arc::new(AtomicU32::new(0));
    let ctx = ExecutionContext::new();

    for _ in 0..3 {
        let invocations = Arc::clone(&invocations);
        let _: ResilienceResult<(), UpstreamError> = executor
            .execute(&ctx, || {
                invocations.fetch_add(1, Ordering::SeqCst);
                async { Err(UpstreamError::network("reset")) }
            })
            .await;
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    let result: ResilienceResult<(), UpstreamError> = executor
        .execute(&ctx, || {
            invocations.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ResilienceErrorKind::CircuitOpen);
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

/// Validates that breakers for different operations are independent.
#[tokio::test(flavor = "multi_thread")]
async fn test_operations_do_not_share_breakers() {
    let config = fast_config(1, 1, 1);
    let qa = Arc::new(CircuitBreaker::new("qa", CircuitBreakerConfig::from(&config)).unwrap());
    let summarize =
        Arc::new(CircuitBreaker::new("summarize", CircuitBreakerConfig::from(&config)).unwrap());
    let ctx = ExecutionContext::new();

    let _: ResilienceResult<(), UpstreamError> = RetryExecutor::new("qa", config, Arc::clone(&qa))
        .execute(&ctx, || async { Err(UpstreamError::network("down")) })
        .await;

    let ok: ResilienceResult<u8, UpstreamError> =
        RetryExecutor::new("summarize", config, Arc::clone(&summarize))
            .execute(&ctx, || async { Ok(1) })
            .await;

    assert_eq!(qa.state(), CircuitState::Open);
    assert_eq!(summarize.state(), CircuitState::Closed);
    assert_eq!(ok.unwrap(), 1);
}
