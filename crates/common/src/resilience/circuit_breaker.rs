//! Per-operation circuit breaker
//!
//! Each breaker guards one named operation. State lives behind a single
//! mutex so transitions for an operation are strictly ordered; breakers for
//! different operations share nothing.
//!
//! Admission hands out a [`CallPermit`]. Outcomes are reported through the
//! permit, which also releases its half-open trial slot when dropped. Every
//! transition bumps a generation counter; outcomes from permits admitted in
//! an earlier generation update the totals but never move the state machine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bulwark_domain::{ConfigError, ConfigResult, ResilienceConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Circuit breakers use real system time in production and controlled mock
/// time in tests, so recovery timeouts can be exercised without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let millis =
            self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed offset, so a test can keep one handle and
/// advance time seen by every breaker built from it.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.elapsed()
    }
}

//==============================================================================
// State and configuration
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited trial requests
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait before transitioning from open to half-open
    pub recovery_timeout: Duration,
    /// Maximum number of concurrent trial calls in half-open state
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for CircuitBreakerConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: config.recovery_timeout(),
            half_open_max_calls: config.half_open_max_calls,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a zero threshold or a zero
    /// half-open limit.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid_value(
                "failure_threshold",
                "must be greater than 0",
            ));
        }
        if self.half_open_max_calls == 0 {
            return Err(ConfigError::invalid_value(
                "half_open_max_calls",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    #[must_use]
    pub const fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.config.half_open_max_calls = max_calls;
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    /// See [`CircuitBreakerConfig::validate`].
    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Receives every state transition of a breaker
///
/// Called while the breaker's lock is held so events for one operation are
/// delivered in transition order. Implementations must be quick and must not
/// call back into the breaker.
pub trait TransitionListener: Send + Sync {
    fn on_transition(&self, operation: &str, from: CircuitState, to: CircuitState);
}

/// Circuit breaker metrics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_in_flight: u32,
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub opened_at: Option<Instant>,
    pub state_changed_at: Instant,
}

/// Why admission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    /// State that refused the call
    pub state: CircuitState,
    /// Time until the breaker will admit a trial call; zero when the
    /// half-open trial slots are merely busy
    pub retry_after: Duration,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    generation: u64,
    state_changed_at: Instant,
    config: CircuitBreakerConfig,
}

//==============================================================================
// Circuit breaker
//==============================================================================

/// Circuit breaker guarding a single named operation
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: Arc<str>,
    inner: Mutex<BreakerState>,
    total_calls: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    rejected_calls: AtomicU64,
    listener: Option<Arc<dyn TransitionListener>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .field("config", &inner.config)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a breaker driven by the system clock
    ///
    /// # Errors
    /// Returns an error if `config` is invalid.
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a breaker with a custom clock (useful for testing)
    ///
    /// # Errors
    /// Returns an error if `config` is invalid.
    pub fn with_clock(
        name: impl Into<Arc<str>>,
        config: CircuitBreakerConfig,
        clock: Arc<C>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_in_flight: 0,
                generation: 0,
                state_changed_at: now,
                config,
            }),
            total_calls: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
            listener: None,
            clock,
        })
    }

    /// Attach a transition listener
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TransitionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Operation this breaker guards
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock driving recovery timeouts
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Current state, without applying the recovery timeout
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Current configuration
    pub fn config(&self) -> CircuitBreakerConfig {
        self.inner.lock().config
    }

    /// Ask for admission
    ///
    /// An open breaker whose recovery timeout has elapsed moves to half-open
    /// here and admits the caller as the first trial.
    ///
    /// # Errors
    /// Returns a [`Rejection`] when the circuit is open or every half-open
    /// trial slot is taken.
    pub fn try_acquire(&self) -> Result<CallPermit<'_, C>, Rejection> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let opened_at = inner.opened_at.unwrap_or(inner.state_changed_at);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed < inner.config.recovery_timeout {
                    self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                    let retry_after = inner.config.recovery_timeout - elapsed;
                    debug!(
                        operation = %self.name,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Circuit open, rejecting call"
                    );
                    return Err(Rejection { state: CircuitState::Open, retry_after });
                }
                self.transition(&mut inner, CircuitState::HalfOpen, now);
                true
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= inner.config.half_open_max_calls {
                    self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        operation = %self.name,
                        in_flight = inner.half_open_in_flight,
                        "Half-open trial slots exhausted, rejecting call"
                    );
                    return Err(Rejection {
                        state: CircuitState::HalfOpen,
                        retry_after: Duration::ZERO,
                    });
                }
                true
            }
        };

        if trial {
            inner.half_open_in_flight += 1;
        }
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        Ok(CallPermit { breaker: self, generation: inner.generation, trial })
    }

    /// Force the breaker back to closed
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        if inner.state == CircuitState::Closed {
            inner.consecutive_failures = 0;
        } else {
            self.transition(&mut inner, CircuitState::Closed, now);
        }
        info!(operation = %self.name, "Circuit breaker reset");
    }

    /// Replace the configuration, keeping the current state
    ///
    /// # Errors
    /// Returns an error if `config` is invalid; the old configuration stays.
    pub fn update_config(&self, config: CircuitBreakerConfig) -> ConfigResult<()> {
        config.validate()?;
        self.inner.lock().config = config;
        Ok(())
    }

    /// Time until an open circuit admits a trial call
    pub fn retry_after(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        if inner.state != CircuitState::Open {
            return None;
        }
        let opened_at = inner.opened_at.unwrap_or(inner.state_changed_at);
        let elapsed = self.clock.now().saturating_duration_since(opened_at);
        Some(inner.config.recovery_timeout.saturating_sub(elapsed))
    }

    /// Snapshot of state and counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            half_open_in_flight: inner.half_open_in_flight,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            opened_at: inner.opened_at,
            state_changed_at: inner.state_changed_at,
        }
    }

    fn on_success(&self, generation: u64) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(operation = %self.name, "Ignoring success from an earlier circuit generation");
            return;
        }
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                let now = self.clock.now();
                self.transition(&mut inner, CircuitState::Closed, now);
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(operation = %self.name, "Ignoring failure from an earlier circuit generation");
            return;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let now = self.clock.now();
        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= inner.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open, now),
            CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation
            && inner.state == CircuitState::HalfOpen
            && inner.half_open_in_flight > 0
        {
            inner.half_open_in_flight -= 1;
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.state_changed_at = now;
        inner.generation = inner.generation.wrapping_add(1);
        inner.half_open_in_flight = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
                warn!(
                    operation = %self.name,
                    from = %from,
                    consecutive_failures = inner.consecutive_failures,
                    recovery_timeout_ms = inner.config.recovery_timeout.as_millis() as u64,
                    "Circuit opened"
                );
            }
            CircuitState::HalfOpen => {
                info!(operation = %self.name, from = %from, "Circuit half-open, admitting trial calls");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                info!(operation = %self.name, from = %from, "Circuit closed");
            }
        }

        if let Some(listener) = &self.listener {
            listener.on_transition(&self.name, from, to);
        }
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`]
///
/// Report each attempt's outcome through the permit. Dropping it frees the
/// half-open trial slot it may hold.
#[must_use = "dropping a permit immediately releases it without recording an outcome"]
pub struct CallPermit<'a, C: Clock = SystemClock> {
    breaker: &'a CircuitBreaker<C>,
    generation: u64,
    trial: bool,
}

impl<C: Clock> fmt::Debug for CallPermit<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("operation", &self.breaker.name())
            .field("generation", &self.generation)
            .field("trial", &self.trial)
            .finish()
    }
}

impl<C: Clock> CallPermit<'_, C> {
    /// Whether this permit holds a half-open trial slot
    pub const fn is_trial(&self) -> bool {
        self.trial
    }

    /// Report a successful attempt
    pub fn record_success(&self) {
        self.breaker.on_success(self.generation);
    }

    /// Report a failed attempt
    pub fn record_failure(&self) {
        self.breaker.on_failure(self.generation);
    }
}

impl<C: Clock> Drop for CallPermit<'_, C> {
    fn drop(&mut self) {
        if self.trial {
            self.breaker.release(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn breaker(threshold: u32, recovery_ms: u64, half_open: u32) -> (CircuitBreaker<MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(threshold)
            .recovery_timeout(Duration::from_millis(recovery_ms))
            .half_open_max_calls(half_open)
            .build()
            .unwrap();
        let cb = CircuitBreaker::with_clock("summarize", config, Arc::new(clock.clone())).unwrap();
        (cb, clock)
    }

    fn fail(cb: &CircuitBreaker<MockClock>) {
        cb.try_acquire().unwrap().record_failure();
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<(String, CircuitState, CircuitState)>>,
        count: AtomicUsize,
    }

    impl TransitionListener for RecordingListener {
        fn on_transition(&self, operation: &str, from: CircuitState, to: CircuitState) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.events.lock().push((operation.to_string(), from, to));
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    #[test]
    fn test_config_validation() {
        assert!(CircuitBreakerConfig::builder().failure_threshold(0).build().is_err());
        assert!(CircuitBreakerConfig::builder().half_open_max_calls(0).build().is_err());
        assert!(CircuitBreakerConfig::builder().build().is_ok());
    }

    #[test]
    fn test_opens_at_threshold() {
        let (cb, _clock) = breaker(3, 1000, 1);
        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        let rejection = cb.try_acquire().unwrap_err();
        assert_eq!(rejection.state, CircuitState::Open);
        assert_eq!(rejection.retry_after, Duration::from_millis(1000));
        assert_eq!(cb.metrics().rejected_calls, 1);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let (cb, _clock) = breaker(3, 1000, 1);
        fail(&cb);
        fail(&cb);
        cb.try_acquire().unwrap().record_success();
        assert_eq!(cb.metrics().consecutive_failures, 0);
        fail(&cb);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_recovery_timeout_moves_to_half_open() {
        let (cb, clock) = breaker(1, 1000, 1);
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance_millis(999);
        assert!(cb.try_acquire().is_err());

        clock.advance_millis(1);
        let permit = cb.try_acquire().unwrap();
        assert!(permit.is_trial());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        permit.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.metrics().consecutive_failures, 0);
    }

    #[test]
    fn test_half_open_failure_reopens_with_fresh_timestamp() {
        let (cb, clock) = breaker(1, 1000, 1);
        fail(&cb);
        clock.advance_millis(1500);

        let permit = cb.try_acquire().unwrap();
        permit.record_failure();
        drop(permit);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.retry_after(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_half_open_limits_concurrent_trials() {
        let (cb, clock) = breaker(1, 100, 2);
        fail(&cb);
        clock.advance_millis(100);

        let first = cb.try_acquire().unwrap();
        let second = cb.try_acquire().unwrap();
        let third = cb.try_acquire().unwrap_err();
        assert_eq!(third.state, CircuitState::HalfOpen);
        assert_eq!(cb.metrics().half_open_in_flight, 2);

        drop(first);
        assert_eq!(cb.metrics().half_open_in_flight, 1);
        let replacement = cb.try_acquire().unwrap();

        drop(second);
        drop(replacement);
        assert_eq!(cb.metrics().half_open_in_flight, 0);
    }

    #[test]
    fn test_stale_permits_do_not_move_state() {
        let (cb, _clock) = breaker(1, 1000, 1);
        let stale = cb.try_acquire().unwrap();
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Open);

        stale.record_success();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.metrics().total_successes, 1);
    }

    #[test]
    fn test_listener_sees_every_transition_in_order() {
        let listener = Arc::new(RecordingListener::default());
        let (cb, clock) = breaker(1, 10, 1);
        let cb = cb.with_listener(listener.clone());

        fail(&cb);
        clock.advance_millis(10);
        cb.try_acquire().unwrap().record_success();

        let events = listener.events.lock().clone();
        assert_eq!(
            events,
            vec![
                ("summarize".to_string(), CircuitState::Closed, CircuitState::Open),
                ("summarize".to_string(), CircuitState::Open, CircuitState::HalfOpen),
                ("summarize".to_string(), CircuitState::HalfOpen, CircuitState::Closed),
            ]
        );
        assert_eq!(listener.count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_reset_and_update_config() {
        let (cb, _clock) = breaker(1, 1000, 1);
        fail(&cb);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);

        let bigger = CircuitBreakerConfig { failure_threshold: 4, ..cb.config() };
        cb.update_config(bigger).unwrap();
        fail(&cb);
        assert_eq!(cb.state(), CircuitState::Closed);

        let invalid = CircuitBreakerConfig { failure_threshold: 0, ..bigger };
        assert!(cb.update_config(invalid).is_err());
        assert_eq!(cb.config().failure_threshold, 4);
    }

    #[test]
    fn test_config_from_resilience_config() {
        let resolved = ResilienceConfig { recovery_timeout_ms: 2500, ..ResilienceConfig::default() };
        let config = CircuitBreakerConfig::from(&resolved);
        assert_eq!(config.recovery_timeout, Duration::from_millis(2500));
        assert_eq!(config.failure_threshold, resolved.failure_threshold);
    }

    #[test]
    fn test_mock_clock_shared_between_clones() {
        let clock = MockClock::new();
        let other = clock.clone();
        let before = clock.now();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - before, Duration::from_secs(5));
        assert_eq!(clock.millis_since_epoch(), 5000);
    }
}
