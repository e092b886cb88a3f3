//! Error types for SQLite operations.

use sift_query::error::QueryError;
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not open the database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement references a parameter that was not supplied.
    #[error("statement references :{0} but no value was bound")]
    MissingParameter(String),

    /// The statement uses a positional `?` placeholder.
    #[error("positional parameter #{0} is not supported; use :name")]
    PositionalParameter(usize),

    /// A result row could not be turned into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Recover an error raised inside a connection call.
    pub(crate) fn from_call(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Other(other) => match other.downcast::<SqliteError>() {
                Ok(err) => *err,
                Err(other) => Self::Sqlite(tokio_rusqlite::Error::Other(other)),
            },
            err => Self::Sqlite(err),
        }
    }

    /// Wrap for returning from inside a connection call.
    pub(crate) fn into_call(self) -> tokio_rusqlite::Error {
        tokio_rusqlite::Error::Other(Box::new(self))
    }

    /// Check if SQLite gave up waiting for a lock.
    pub fn is_busy(&self) -> bool {
        let Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err)) = self else {
            return false;
        };
        matches!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        let message = err.to_string();
        let busy = err.is_busy();
        match err {
            SqliteError::Sqlite(_) if busy => QueryError::timeout(message),
            SqliteError::Sqlite(_) => QueryError::database(message),
            SqliteError::Config(_) => QueryError::config(message),
            SqliteError::Connection(msg) => QueryError::connection(msg),
            // Statements are built by handlers and executors, not by callers.
            SqliteError::MissingParameter(_) | SqliteError::PositionalParameter(_) => {
                QueryError::internal(message)
            }
            SqliteError::Decode(msg) => QueryError::deserialization(msg),
        }
    }
}
