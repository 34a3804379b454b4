//! Upstream error taxonomy and classification
//!
//! Bulwark wraps calls to remote model APIs. Those calls fail in a small set
//! of recurring ways, captured by [`UpstreamError`]. Anything that wants to
//! take part in retry decisions implements [`ErrorClassification`].
//!
//! # Error Handling Architecture
//!
//! 1. **`UpstreamError`**: the failures an upstream call can produce (network,
//!    HTTP status, rate limiting, timeouts, malformed requests, ...)
//!
//! 2. **`ErrorClassification` trait**: a standard interface for classifying
//!    errors by their characteristics (retryability, severity, criticality)
//!
//! 3. **`ErrorSeverity` enum**: severity levels shared by alerts and logs
//!
//! ## Composing with module errors
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum SummarizeError {
//!     #[error("Document too large: {0} bytes")]
//!     TooLarge(usize),
//!
//!     #[error(transparent)]
//!     Upstream(#[from] UpstreamError),
//! }
//!
//! impl ErrorClassification for SummarizeError {
//!     fn is_retryable(&self) -> bool {
//!         match self {
//!             Self::TooLarge(_) => false,
//!             Self::Upstream(e) => e.is_retryable(),
//!         }
//!     }
//!     // ... implement other trait methods
//! }
//! ```
//!
//! ## HTTP status mapping
//!
//! | Status | Retryable | Reason |
//! |--------|-----------|--------|
//! | 429 | yes | Rate limited |
//! | 5xx | yes | Server side failure |
//! | other 4xx | no | The request itself is wrong |
//! | anything else | yes | Unknown conditions are treated as transient |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures produced by a call to an upstream service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Connection refused, reset, DNS failure and similar
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-success HTTP response
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Upstream throttled the caller
    #[error("Rate limited{}", format_retry_after(*.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// The upstream did not answer within the deadline
    #[error("Upstream call timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The request was rejected as malformed or invalid
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Credentials missing, expired or insufficient
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The response body could not be decoded
    #[error("Malformed {format} response: {message}")]
    MalformedResponse { format: String, message: String },

    /// Local misconfiguration of the upstream client
    #[error("Client configuration error: {message}")]
    Configuration { message: String },
}

fn format_retry_after(retry_after: Option<Duration>) -> String {
    retry_after.map_or_else(String::new, |d| format!(" (retry after {}ms)", d.as_millis()))
}

impl UpstreamError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// Create a rate limit error with an optional server-provided delay
    pub const fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create a timeout error
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Create an authorization error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create a malformed response error
    pub fn malformed_response(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse { format: format.into(), message: message.into() }
    }

    /// Create a client configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether an HTTP status code describes a transient condition
    pub const fn is_retryable_status(status: u16) -> bool {
        match status {
            429 => true,
            400..=499 => false,
            _ => true,
        }
    }

    /// Short, stable label used in attempt records and metrics
    pub fn kind_label(&self) -> String {
        match self {
            Self::Network { .. } => "network".to_string(),
            Self::Http { status, .. } => format!("http_{status}"),
            Self::RateLimited { .. } => "rate_limited".to_string(),
            Self::Timeout { .. } => "timeout".to_string(),
            Self::InvalidRequest { .. } => "invalid_request".to_string(),
            Self::Unauthorized { .. } => "unauthorized".to_string(),
            Self::MalformedResponse { .. } => "malformed_response".to_string(),
            Self::Configuration { .. } => "configuration".to_string(),
        }
    }
}

impl ErrorClassification for UpstreamError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => Self::is_retryable_status(*status),
            Self::InvalidRequest { .. }
            | Self::Unauthorized { .. }
            | Self::MalformedResponse { .. }
            | Self::Configuration { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Http { status, .. } if *status >= 500 => ErrorSeverity::Warning,
            Self::Configuration { .. } | Self::Unauthorized { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Unauthorized { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for upstream calls
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Standard error classification trait
///
/// Every error that flows through a retry decision should implement this so
/// that retryability and alert severity stay consistent across crates.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient conditions that may succeed if the call
    /// is repeated: network failures, throttling, timeouts, 5xx responses.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when the upstream asked for a specific delay
    /// (for example through a `Retry-After` header).
    fn retry_after(&self) -> Option<Duration>;
}

impl ErrorClassification for bulwark_domain::ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<std::io::Error> for UpstreamError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => Self::Timeout { duration: Duration::ZERO },
            ErrorKind::InvalidInput | ErrorKind::InvalidData => Self::invalid_request(err.to_string()),
            ErrorKind::PermissionDenied => Self::unauthorized(err.to_string()),
            _ => Self::network(err.to_string()),
        }
    }
}
