//! Terminal errors returned by resilient execution

use std::time::Duration;

use bulwark_domain::{impl_named_enum, ConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single attempt
#[derive(Debug, Error)]
pub enum AttemptError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The wrapped call returned an error
    #[error(transparent)]
    Failed(E),

    /// The attempt exceeded the caller's per-attempt timeout
    #[error("Attempt timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
}

impl<E> AttemptError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The wrapped call's error, if the attempt got that far
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Errors that cross the resilience boundary
///
/// Generic over the wrapped call's error type so the original failure stays
/// available through `source()`.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Invalid preset, strategy, override or operation name
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The call failed in a way retrying cannot fix
    #[error("Operation '{operation}' failed permanently")]
    PermanentUpstream {
        operation: String,
        #[source]
        source: E,
    },

    /// Every attempt failed with a transient error
    #[error("Operation '{operation}' failed after {attempts} attempts")]
    TransientExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: AttemptError<E>,
    },

    /// The circuit refused the call without invoking it
    #[error("Circuit open for operation '{operation}', retry after {}ms", .retry_after.as_millis())]
    CircuitOpen { operation: String, retry_after: Duration },

    /// The caller cancelled the call
    #[error("Operation '{operation}' cancelled after {attempts} attempts")]
    Cancelled { operation: String, attempts: u32 },
}

/// Result type for resilient execution
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Discriminant of [`ResilienceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResilienceErrorKind {
    Configuration,
    PermanentUpstream,
    TransientExhausted,
    CircuitOpen,
    Cancelled,
}

impl_named_enum!(ResilienceErrorKind {
    Configuration => "configuration",
    PermanentUpstream => "permanent_upstream",
    TransientExhausted => "transient_exhausted",
    CircuitOpen => "circuit_open",
    Cancelled => "cancelled",
});

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub const fn kind(&self) -> ResilienceErrorKind {
        match self {
            Self::Configuration(_) => ResilienceErrorKind::Configuration,
            Self::PermanentUpstream { .. } => ResilienceErrorKind::PermanentUpstream,
            Self::TransientExhausted { .. } => ResilienceErrorKind::TransientExhausted,
            Self::CircuitOpen { .. } => ResilienceErrorKind::CircuitOpen,
            Self::Cancelled { .. } => ResilienceErrorKind::Cancelled,
        }
    }

    /// Attempts made before the error, zero when the call never ran
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::PermanentUpstream { .. } => 1,
            Self::TransientExhausted { attempts, .. } | Self::Cancelled { attempts, .. } => {
                *attempts
            }
            Self::Configuration(_) | Self::CircuitOpen { .. } => 0,
        }
    }

    /// The last error produced by the wrapped call, if any
    pub fn into_upstream(self) -> Option<E> {
        match self {
            Self::PermanentUpstream { source, .. } => Some(source),
            Self::TransientExhausted { source, .. } => source.into_inner(),
            _ => None,
        }
    }

    /// Whether retrying the whole call later could succeed
    pub const fn is_retryable_later(&self) -> bool {
        matches!(self, Self::TransientExhausted { .. } | Self::CircuitOpen { .. })
    }
}
