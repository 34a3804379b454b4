//! Retry executor composed with a circuit breaker
//!
//! One call runs as: a single admission check against the breaker, then up to
//! `max_attempts` invocations. Each attempt's outcome is reported to the
//! breaker and to the attached [`AttemptObserver`]. Permanent failures stop
//! the loop at once; transient ones back off and retry until attempts run
//! out. Caller cancellation stops everything without counting as a failure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bulwark_domain::ResilienceConfig;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::backoff::BackoffPolicy;
use super::circuit_breaker::{CircuitBreaker, Clock, SystemClock};
use super::classify::{Classification, DefaultClassifier, FailureClass, FailureClassifier};
use super::error::{AttemptError, ResilienceError, ResilienceResult};

/// Caller-supplied bounds for one execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    attempt_timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every attempt; an attempt that overruns counts as a transient
    /// failure
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Abort the call, including any backoff sleep, when `token` fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub const fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientError,
    PermanentError,
    Cancelled,
}

/// One invocation of the wrapped call
///
/// Handed to the observer as soon as the attempt finishes and not kept by
/// the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub operation: Arc<str>,
    pub attempt_number: u32,
    pub started_at: SystemTime,
    pub duration: Duration,
    pub outcome: AttemptOutcome,
    pub exception_kind: Option<String>,
}

impl AttemptRecord {
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether this attempt was a retry rather than the first try
    pub const fn is_retry(&self) -> bool {
        self.attempt_number > 1
    }
}

/// Terminal outcome of a whole call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    PermanentFailure,
    Exhausted,
    Rejected,
    Cancelled,
}

impl CallOutcome {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Summary of a whole call, emitted once per execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    pub operation: Arc<str>,
    pub outcome: CallOutcome,
    pub attempts: u32,
    pub latency: Duration,
    pub total_delay: Duration,
}

/// Receives attempt records and call summaries
///
/// Implementations must not panic and should return quickly; they run on the
/// caller's task.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, record: &AttemptRecord);

    fn on_call_complete(&self, summary: &CallSummary) {
        let _ = summary;
    }
}

/// Result of an execution plus statistics about how it went
#[derive(Debug)]
pub struct RetryOutcome<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub result: ResilienceResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> ResilienceResult<T, E> {
        self.result
    }
}

enum Step<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Done(T),
    Failed(AttemptError<E>),
    Cancelled,
}

/// Drives the attempt loop for one operation
pub struct RetryExecutor<C: Clock = SystemClock> {
    operation: Arc<str>,
    config: ResilienceConfig,
    backoff: BackoffPolicy,
    breaker: Arc<CircuitBreaker<C>>,
    classifier: Arc<dyn FailureClassifier>,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl<C: Clock> fmt::Debug for RetryExecutor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("operation", &self.operation)
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> RetryExecutor<C> {
    /// Executor using the default classifier and the backoff described by
    /// `config`
    pub fn new(
        operation: impl Into<Arc<str>>,
        config: ResilienceConfig,
        breaker: Arc<CircuitBreaker<C>>,
    ) -> Self {
        Self {
            operation: operation.into(),
            backoff: BackoffPolicy::from_config(&config),
            config,
            breaker,
            classifier: Arc::new(DefaultClassifier),
            observer: None,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub const fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Execute an operation with retry and circuit breaker protection
    ///
    /// # Errors
    /// Returns the terminal [`ResilienceError`] when the call is rejected,
    /// fails permanently, exhausts its attempts or is cancelled.
    pub async fn execute<F, Fut, T, E>(
        &self,
        context: &ExecutionContext,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.execute_with_outcome(context, operation).await.into_result()
    }

    /// Execute an operation and return outcome statistics.
    #[instrument(
        skip_all,
        fields(operation = %self.operation, max_attempts = self.config.max_attempts)
    )]
    pub async fn execute_with_outcome<F, Fut, T, E>(
        &self,
        context: &ExecutionContext,
        mut operation: F,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let started = Instant::now();
        let mut total_delay = Duration::ZERO;

        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(rejection) => {
                let error = ResilienceError::CircuitOpen {
                    operation: self.operation.to_string(),
                    retry_after: rejection.retry_after,
                };
                return self.finish(CallOutcome::Rejected, 0, total_delay, started, Err(error));
            }
        };

        if context.is_cancelled() {
            let error = self.cancelled(0);
            return self.finish(CallOutcome::Cancelled, 0, total_delay, started, Err(error));
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started_at = self.breaker.clock().system_time();
            let attempt_start = Instant::now();
            let step = Self::run_attempt(context, &mut operation).await;
            let duration = attempt_start.elapsed();

            let error = match step {
                Step::Done(value) => {
                    permit.record_success();
                    self.record_attempt(attempt, started_at, duration, AttemptOutcome::Success, None);
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return self.finish(CallOutcome::Success, attempt, total_delay, started, Ok(value));
                }
                Step::Cancelled => {
                    self.record_attempt(attempt, started_at, duration, AttemptOutcome::Cancelled, None);
                    debug!(attempt, "Operation cancelled by caller");
                    // the interrupted attempt is not counted
                    let completed = attempt - 1;
                    let error = self.cancelled(completed);
                    return self.finish(CallOutcome::Cancelled, completed, total_delay, started, Err(error));
                }
                Step::Failed(error) => error,
            };

            let classification = self.classify(&error);
            permit.record_failure();

            let error = match (classification.class, error) {
                (FailureClass::Permanent, AttemptError::Failed(source)) => {
                    self.record_attempt(
                        attempt,
                        started_at,
                        duration,
                        AttemptOutcome::PermanentError,
                        Some(classification.kind.clone()),
                    );
                    warn!(
                        attempt,
                        kind = %classification.kind,
                        error = %source,
                        "Permanent failure, not retrying"
                    );
                    let error = ResilienceError::PermanentUpstream {
                        operation: self.operation.to_string(),
                        source,
                    };
                    return self.finish(
                        CallOutcome::PermanentFailure,
                        attempt,
                        total_delay,
                        started,
                        Err(error),
                    );
                }
                (_, error) => error,
            };

            self.record_attempt(
                attempt,
                started_at,
                duration,
                AttemptOutcome::TransientError,
                Some(classification.kind.clone()),
            );

            if attempt >= max_attempts {
                warn!(attempts = attempt, kind = %classification.kind, error = %error, "Retries exhausted");
                let error = ResilienceError::TransientExhausted {
                    operation: self.operation.to_string(),
                    attempts: attempt,
                    source: error,
                };
                return self.finish(CallOutcome::Exhausted, attempt, total_delay, started, Err(error));
            }

            let delay = self.backoff.next_delay(attempt);
            debug!(
                attempt,
                kind = %classification.kind,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying"
            );
            if !Self::sleep(context, delay).await {
                let error = self.cancelled(attempt);
                return self.finish(CallOutcome::Cancelled, attempt, total_delay, started, Err(error));
            }
            total_delay += delay;
        }
    }

    async fn run_attempt<F, Fut, T, E>(context: &ExecutionContext, operation: &mut F) -> Step<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let call = operation();
        let guarded = async {
            match context.attempt_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(value)) => Step::Done(value),
                    Ok(Err(error)) => Step::Failed(AttemptError::Failed(error)),
                    Err(_) => Step::Failed(AttemptError::TimedOut { timeout }),
                },
                None => match call.await {
                    Ok(value) => Step::Done(value),
                    Err(error) => Step::Failed(AttemptError::Failed(error)),
                },
            }
        };

        match &context.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Step::Cancelled,
                step = guarded => step,
            },
            None => guarded.await,
        }
    }

    /// Sleep between attempts; returns `false` if cancelled first
    async fn sleep(context: &ExecutionContext, delay: Duration) -> bool {
        match &context.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(delay) => true,
            },
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    fn classify<E>(&self, error: &AttemptError<E>) -> Classification
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match error {
            AttemptError::Failed(source) => self.classifier.classify(source),
            AttemptError::TimedOut { .. } => Classification::transient("attempt_timeout"),
        }
    }

    fn cancelled<E>(&self, attempts: u32) -> ResilienceError<E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ResilienceError::Cancelled { operation: self.operation.to_string(), attempts }
    }

    fn record_attempt(
        &self,
        attempt_number: u32,
        started_at: SystemTime,
        duration: Duration,
        outcome: AttemptOutcome,
        exception_kind: Option<String>,
    ) {
        if let Some(observer) = &self.observer {
            observer.on_attempt(&AttemptRecord {
                operation: Arc::clone(&self.operation),
                attempt_number,
                started_at,
                duration,
                outcome,
                exception_kind,
            });
        }
    }

    fn finish<T, E>(
        &self,
        outcome: CallOutcome,
        attempts: u32,
        total_delay: Duration,
        started: Instant,
        result: ResilienceResult<T, E>,
    ) -> RetryOutcome<T, E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let elapsed = started.elapsed();
        if let Some(observer) = &self.observer {
            observer.on_call_complete(&CallSummary {
                operation: Arc::clone(&self.operation),
                outcome,
                attempts,
                latency: elapsed,
                total_delay,
            });
        }
        RetryOutcome { result, attempts, total_delay, elapsed }
    }
}
