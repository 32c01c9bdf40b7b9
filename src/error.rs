//! Error types for Depot.

use thiserror::Error;

/// Common error type for Depot.
#[derive(Error, Debug)]
pub enum DepotError {
    /// Database error.
    ///
    /// This is a generic database error that wraps errors from any database
    /// backend. Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Target path does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Destination or path collision.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation is structurally invalid (empty path, malformed name,
    /// moving a directory into its own subtree).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A bounded wait (copy-completion polling) exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// One side of a two-store operation succeeded and the other did not.
    /// The detail names both paths so the inconsistency can be reconciled.
    #[error("partial failure in {operation}: {detail}")]
    PartialFailure {
        /// The logical operation that failed partway.
        operation: String,
        /// What succeeded, what did not, and where.
        detail: String,
    },

    /// Transport or connectivity failure from a backing store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for DepotError {
    fn from(e: sqlx::Error) -> Self {
        DepotError::Database(e.to_string())
    }
}

/// Result type alias for Depot operations.
pub type Result<T> = std::result::Result<T, DepotError>;
