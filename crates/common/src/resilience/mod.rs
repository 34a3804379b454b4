//! Resilience primitives for calls to unreliable upstream services
//!
//! This module provides **generic, reusable** building blocks:
//! - **Classification**: maps a failure to transient or permanent
//! - **Backoff**: fixed, exponential and jittered exponential delays
//! - **Circuit Breaker**: per-operation state machine gating admission
//! - **Retry Executor**: the attempt loop tying the three together
//!
//! Nothing here knows about presets or operation registries. The
//! orchestration layer in `bulwark-core` resolves a `ResilienceConfig` per
//! operation and hands it to these types.
//!
//! ## Composition
//!
//! ```rust,ignore
//! let breaker = Arc::new(CircuitBreaker::new("summarize", (&config).into())?);
//! let executor = RetryExecutor::new("summarize", config, breaker)
//!     .with_observer(metrics.clone());
//!
//! let summary = executor
//!     .execute(&ExecutionContext::new(), || client.summarize(&doc))
//!     .await?;
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod classify;
pub mod error;
pub mod retry;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder,
    CircuitBreakerMetrics, CircuitState, Clock, MockClock, Rejection, SystemClock,
    TransitionListener,
};
pub use classify::{classify, Classification, DefaultClassifier, FailureClass, FailureClassifier};
pub use error::{AttemptError, ResilienceError, ResilienceErrorKind, ResilienceResult};
pub use retry::{
    AttemptObserver, AttemptOutcome, AttemptRecord, CallOutcome, CallSummary, ExecutionContext,
    RetryExecutor, RetryOutcome,
};
