//! Mapping of failures to transient or permanent
//!
//! Classification walks the error's `source()` chain and stops at the first
//! type it recognises. Errors nobody recognises are transient: retrying an
//! unknown failure is preferred over silently giving up.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use bulwark_domain::ConfigError;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorClassification, UpstreamError};

/// Retry disposition of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// May succeed if repeated
    Transient,
    /// Repeating the call cannot help
    Permanent,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Disposition plus a short label describing what failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: FailureClass,
    pub kind: String,
}

impl Classification {
    pub fn transient(kind: impl Into<String>) -> Self {
        Self { class: FailureClass::Transient, kind: kind.into() }
    }

    pub fn permanent(kind: impl Into<String>) -> Self {
        Self { class: FailureClass::Permanent, kind: kind.into() }
    }

    pub fn is_transient(&self) -> bool {
        self.class == FailureClass::Transient
    }
}

/// Decides whether a failure is worth retrying
///
/// Must be total: every error maps to a classification.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &(dyn StdError + 'static)) -> Classification;
}

impl<F> FailureClassifier for F
where
    F: Fn(&(dyn StdError + 'static)) -> Classification + Send + Sync,
{
    fn classify(&self, error: &(dyn StdError + 'static)) -> Classification {
        self(error)
    }
}

/// Classifier that knows the error types used across Bulwark
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn classify(&self, error: &(dyn StdError + 'static)) -> Classification {
        classify(error)
    }
}

/// Classify with the built-in rules
pub fn classify(error: &(dyn StdError + 'static)) -> Classification {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(classification) = classify_known(err) {
            return classification;
        }
        current = err.source();
    }
    Classification::transient("unknown")
}

fn classify_known(err: &(dyn StdError + 'static)) -> Option<Classification> {
    if let Some(upstream) = err.downcast_ref::<UpstreamError>() {
        let kind = upstream.kind_label();
        return Some(if upstream.is_retryable() {
            Classification::transient(kind)
        } else {
            Classification::permanent(kind)
        });
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return Some(Classification::permanent("configuration"));
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return Some(classify_io(io_err.kind()));
    }
    if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return Some(Classification::transient("timeout"));
    }
    None
}

fn classify_io(kind: io::ErrorKind) -> Classification {
    use io::ErrorKind;
    let label = format!("io_{kind:?}").to_lowercase();
    match kind {
        ErrorKind::InvalidInput
        | ErrorKind::InvalidData
        | ErrorKind::PermissionDenied
        | ErrorKind::Unsupported => Classification::permanent(label),
        _ => Classification::transient(label),
    }
}

#[cfg(test)]
mod tests {
    use thiserror::Error;

    use super::*;

    #[derive(Debug, Error)]
    #[error("wrapped: {inner}")]
    struct Wrapper {
        #[source]
        inner: UpstreamError,
    }

    #[derive(Debug, Error)]
    #[error("something odd")]
    struct Mystery;

    #[test]
    fn test_network_and_server_errors_are_transient() {
        assert!(classify(&UpstreamError::network("reset")).is_transient());
        assert!(classify(&UpstreamError::http(502, "bad gateway")).is_transient());
        assert!(classify(&UpstreamError::http(429, "slow down")).is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let c = classify(&UpstreamError::http(400, "bad request"));
        assert_eq!(c, Classification::permanent("http_400"));
        assert_eq!(
            classify(&UpstreamError::invalid_request("no prompt")).class,
            FailureClass::Permanent
        );
        assert_eq!(
            classify(&ConfigError::invalid_value("max_attempts", "0")).class,
            FailureClass::Permanent
        );
    }

    #[test]
    fn test_only_429_is_transient_among_client_statuses() {
        for status in [408, 425, 404] {
            let c = classify(&UpstreamError::http(status, "client error"));
            assert_eq!(c, Classification::permanent(format!("http_{status}")), "status {status}");
        }
        assert_eq!(
            classify(&UpstreamError::http(429, "slow down")),
            Classification::transient("http_429")
        );
    }

    #[test]
    fn test_unknown_errors_default_to_transient() {
        assert_eq!(classify(&Mystery), Classification::transient("unknown"));
    }

    #[test]
    fn test_source_chain_is_walked() {
        let wrapped = Wrapper { inner: UpstreamError::http(404, "gone") };
        assert_eq!(classify(&wrapped).class, FailureClass::Permanent);
    }

    #[test]
    fn test_io_errors() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let c = classify(&refused);
        assert!(c.is_transient());
        assert_eq!(c.kind, "io_connectionrefused");

        let invalid = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        assert_eq!(classify(&invalid).class, FailureClass::Permanent);
    }

    #[test]
    fn test_closure_classifier() {
        let strict = |err: &(dyn StdError + 'static)| {
            let c = classify(err);
            if c.kind == "unknown" {
                Classification::permanent("unknown")
            } else {
                c
            }
        };
        assert_eq!(strict.classify(&Mystery).class, FailureClass::Permanent);
        assert!(DefaultClassifier.classify(&Mystery).is_transient());
    }
}
