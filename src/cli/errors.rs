//! CLI-specific error types
//!
//! All CLI errors are fatal: the process prints the error and exits 1.

use crate::election::{ElectionError, ElectionErrorKind};
use crate::store::StoreError;
use std::fmt;
use std::io;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Deployment configuration missing or invalid
    ConfigError,
    /// I/O error (stdout, runtime)
    IoError,
    /// Orchestrator API failure
    ApiError,
    /// Election interrupted by a signal
    Cancelled,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PODLOCK_CLI_CONFIG_ERROR",
            Self::IoError => "PODLOCK_CLI_IO_ERROR",
            Self::ApiError => "PODLOCK_CLI_API_ERROR",
            Self::Cancelled => "PODLOCK_CLI_CANCELLED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// API error
    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ApiError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::api_error(e.to_string())
    }
}

impl From<ElectionError> for CliError {
    fn from(e: ElectionError) -> Self {
        let code = match e.kind() {
            ElectionErrorKind::Configuration => CliErrorCode::ConfigError,
            ElectionErrorKind::Api => CliErrorCode::ApiError,
            ElectionErrorKind::Cancelled => CliErrorCode::Cancelled,
        };
        Self::new(code, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
