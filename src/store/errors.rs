//! Token store error types
//!
//! Every orchestrator failure is classified into one of three kinds. The
//! election engine only ever branches on the kind; the message is for logs.

use thiserror::Error;

/// Result type for token store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Token store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{resource} {name:?} not found")]
    NotFound { resource: &'static str, name: String },

    #[error("{resource} {name:?} already exists")]
    AlreadyExists { resource: &'static str, name: String },

    #[error("orchestrator API error: {0}")]
    Unknown(String),
}

impl StoreError {
    pub fn not_found(resource: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    pub fn already_exists(resource: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource,
            name: name.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "PODLOCK_STORE_NOT_FOUND",
            Self::AlreadyExists { .. } => "PODLOCK_STORE_ALREADY_EXISTS",
            Self::Unknown(_) => "PODLOCK_STORE_UNKNOWN",
        }
    }
}
