//! Error types for the Stellar theme hub core.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Stellar operations.
///
/// The rate limiter and the version format predicates never produce these;
/// they report facts and leave rejection to the caller.
#[derive(Error, Debug)]
pub enum StellarError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A submitted field failed validation
    #[error("Validation failed for {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A version string could not be used for arithmetic
    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    /// The version already exists for this theme
    #[error("Version {0} already exists")]
    DuplicateVersion(String),

    /// A theme, author or version lookup found nothing
    #[error("{0} not found")]
    NotFound(String),

    /// The caller does not own the theme
    #[error("User {user} does not own theme {theme_id}")]
    Forbidden { user: String, theme_id: Uuid },

    /// The persistence collaborator failed
    #[error("Store error: {0}")]
    Store(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StellarError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StellarError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for Stellar operations.
pub type Result<T> = std::result::Result<T, StellarError>;
