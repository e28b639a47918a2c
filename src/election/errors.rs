//! Election error types
//!
//! Every error returned from the election entry point is fatal for that
//! attempt. Callers are expected to exit and let the orchestrator restart
//! the process. Lock conflicts and malformed locks never surface here;
//! they drive the waiting loop instead.

use crate::store::StoreError;
use thiserror::Error;

/// Result type for election operations
pub type ElectionResult<T> = Result<T, ElectionError>;

/// Election error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionErrorKind {
    /// Deployment is misconfigured (namespace file, env var, own pod)
    Configuration,
    /// Unexpected orchestrator API failure
    Api,
    /// Caller cancelled the attempt
    Cancelled,
}

/// Election errors
#[derive(Debug, Clone, Error)]
pub enum ElectionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unexpected API failure: {0}")]
    Api(#[from] StoreError),

    #[error("election cancelled")]
    Cancelled,
}

impl ElectionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> ElectionErrorKind {
        match self {
            Self::Configuration(_) => ElectionErrorKind::Configuration,
            Self::Api(_) => ElectionErrorKind::Api,
            Self::Cancelled => ElectionErrorKind::Cancelled,
        }
    }

    /// Error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "PODLOCK_ELECTION_CONFIG",
            Self::Api(_) => "PODLOCK_ELECTION_API",
            Self::Cancelled => "PODLOCK_ELECTION_CANCELLED",
        }
    }

    /// Cancellation is requested by the caller; everything else is a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_kinds_and_codes() {
        let err = ElectionError::configuration("required env POD_NAME not set");
        assert_eq!(err.kind(), ElectionErrorKind::Configuration);
        assert_eq!(err.code(), "PODLOCK_ELECTION_CONFIG");
        assert!(err.is_fatal());

        let err: ElectionError = StoreError::unknown("timeout").into();
        assert_eq!(err.kind(), ElectionErrorKind::Api);
        assert!(err.source().is_some());

        assert!(!ElectionError::Cancelled.is_fatal());
    }

    #[test]
    fn test_display() {
        let err = ElectionError::configuration("namespace not found for current environment");
        assert_eq!(
            err.to_string(),
            "configuration error: namespace not found for current environment"
        );
    }
}
