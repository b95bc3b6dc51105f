//! Error types for voy-auth.

use thiserror::Error;

/// Common error type for voy-auth.
#[derive(Error, Debug)]
pub enum VoyError {
    /// Database error.
    ///
    /// Wraps errors from whichever database backend is compiled in.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// A unique constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Unique violations are surfaced as a distinct kind so callers never have to
// inspect driver messages.
impl From<sqlx::Error> for VoyError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                VoyError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                VoyError::DatabaseConnection(e.to_string())
            }
            _ => VoyError::Database(e.to_string()),
        }
    }
}

/// Result type alias for voy-auth operations.
pub type Result<T> = std::result::Result<T, VoyError>;
