//! Core error type for Grantkit

use thiserror::Error;

/// Result type alias for Grantkit operations
pub type GrantResult<T> = Result<T, GrantError>;

/// Main error type for Grantkit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Invalid input, e.g. an unknown permission kind name
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// A platform authorization primitive could not answer
    #[error("Platform error for {kind}: {message}")]
    Platform { kind: String, message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },
}

impl GrantError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "GRANT_CONFIG",
            Self::InvalidInput { .. } => "GRANT_INVALID_INPUT",
            Self::Platform { .. } => "GRANT_PLATFORM",
            Self::Io { .. } => "GRANT_IO",
        }
    }

    /// Get the human-readable error message
    pub fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::InvalidInput { message, .. } => message,
            Self::Platform { message, .. } => message,
            Self::Io { message, .. } => message,
        }
    }

    /// Get optional context about the error
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            Self::InvalidInput { field, .. } => field.as_deref(),
            Self::Platform { kind, .. } => Some(kind),
            Self::Io { path, .. } => path.as_deref(),
        }
    }
}
