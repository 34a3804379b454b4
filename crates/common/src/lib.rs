//! Generic resilience primitives shared across Bulwark crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: upstream error taxonomy, error classification, validation
//!   results
//! - `runtime`: async resilience primitives (clock, backoff, circuit breaker,
//!   retry executor)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity, UpstreamError, UpstreamResult};
#[cfg(feature = "runtime")]
pub use resilience::{
    classify, AttemptObserver, AttemptOutcome, AttemptRecord, BackoffPolicy, CallOutcome,
    CallPermit, CallSummary, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics,
    CircuitState, Clock, DefaultClassifier, ExecutionContext, FailureClass, FailureClassifier,
    MockClock, ResilienceError, ResilienceErrorKind, ResilienceResult, RetryExecutor,
    RetryOutcome, SystemClock, TransitionListener,
};
#[cfg(feature = "foundation")]
pub use validation::{FieldError, ValidationCollector, ValidationResult};
