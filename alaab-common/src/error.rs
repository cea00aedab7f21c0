//! Common error types for Alaab

use thiserror::Error;

/// Common result type for Alaab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Alaab services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Actor lacks the role required for the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation is not legal in the record's current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// SQLITE_BUSY and SQLITE_LOCKED, primary codes of the extended families
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for Error {
    /// A write that lost to a concurrent writer is a `Conflict`, not an
    /// infrastructure failure; callers may retry against the new state.
    fn from(err: sqlx::Error) -> Self {
        if let Some(code) = err
            .as_database_error()
            .and_then(|db| db.code())
            .and_then(|code| code.parse::<i32>().ok())
        {
            if matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED) {
                return Error::Conflict(format!("Concurrent update, try again ({})", err));
            }
        }
        Error::Database(err)
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Error::Internal(format!("Invalid UUID in database: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON encoding error: {}", err))
    }
}
