//! Resilience benchmarks
//!
//! Benchmarks for circuit breaker admission, backoff calculation and the
//! retry executor's async hot path.
//!
//! Run with: `cargo bench --bench resilience_bench -p bulwark-common
//! --features runtime`

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::{
    classify, BackoffPolicy, CircuitBreaker, CircuitBreakerConfig, ExecutionContext,
    ResilienceResult, RetryExecutor,
};
use bulwark_common::UpstreamError;
use bulwark_domain::ResilienceConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Builder as RuntimeBuilder;

#[derive(Debug)]
struct BenchError;

impl Display for BenchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "bench error")
    }
}

impl Error for BenchError {}

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker_admission");

    group.bench_function("closed_acquire_success", |b| {
        let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::default())
            .unwrap_or_else(|err| panic!("default breaker config rejected: {err}"));
        b.iter(|| {
            if let Ok(permit) = breaker.try_acquire() {
                permit.record_success();
            }
        });
    });

    group.bench_function("open_short_circuit", |b| {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .recovery_timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|err| panic!("benchmark breaker config rejected: {err}"));
        let breaker = CircuitBreaker::new("bench", config)
            .unwrap_or_else(|err| panic!("benchmark breaker rejected: {err}"));
        if let Ok(permit) = breaker.try_acquire() {
            permit.record_failure();
        }

        b.iter(|| black_box(breaker.try_acquire().is_err()));
    });

    group.finish();
}

// ============================================================================
// Backoff and classification
// ============================================================================

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff_next_delay");
    let plain = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(30));
    let jittered = plain.with_jitter(true);

    for attempt in [1u32, 4, 16] {
        group.bench_with_input(BenchmarkId::new("exponential", attempt), &attempt, |b, &n| {
            b.iter(|| black_box(plain.next_delay(n)));
        });
        group.bench_with_input(BenchmarkId::new("jittered", attempt), &attempt, |b, &n| {
            b.iter(|| black_box(jittered.next_delay(n)));
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let upstream = UpstreamError::http(503, "unavailable");
    let unknown = BenchError;

    c.bench_function("classify_upstream", |b| b.iter(|| black_box(classify(&upstream))));
    c.bench_function("classify_unknown", |b| b.iter(|| black_box(classify(&unknown))));
}

// ============================================================================
// Retry executor
// ============================================================================

fn bench_retry_executor(c: &mut Criterion) {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("tokio runtime failed to build: {err}"));
    let config = ResilienceConfig { base_delay_ms: 0, jitter: false, ..ResilienceConfig::default() };
    let breaker = Arc::new(
        CircuitBreaker::new("bench", CircuitBreakerConfig::from(&config))
            .unwrap_or_else(|err| panic!("benchmark breaker rejected: {err}")),
    );
    let executor = RetryExecutor::new("bench", config, breaker);
    let ctx = ExecutionContext::new();

    c.bench_function("retry_executor_success", |b| {
        b.to_async(&runtime).iter(|| async {
            let result: ResilienceResult<u32, BenchError> =
                executor.execute(&ctx, || async { Ok(7) }).await;
            black_box(result.is_ok())
        });
    });
}

criterion_group!(
    benches,
    bench_circuit_breaker_admission,
    bench_backoff,
    bench_classify,
    bench_retry_executor
);
criterion_main!(benches);
