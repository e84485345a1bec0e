//! Error types for the repository SDK
//!
//! Provides unified error handling using thiserror, one enum per store.

use std::time::Duration;

use thiserror::Error;

// == Database Error Enum ==
/// Errors returned by the relational repository.
#[derive(Error, Debug)]
pub enum DbError {
    /// No row matched the identifier and scopes
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Unique, foreign key, check or not-null constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Any other backend or query failure
    #[error("Query error: {0}")]
    Query(String),

    /// The statement did not complete within the configured timeout
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Begin, commit or rollback failed
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::RecordNotFound("no rows returned".to_string()),
            sqlx::Error::Database(db_err) => {
                use sqlx::error::ErrorKind;
                match db_err.kind() {
                    ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation => {
                        DbError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => DbError::Query(db_err.message().to_string()),
                }
            }
            other => DbError::Query(other.to_string()),
        }
    }
}

// == Cache Error Enum ==
/// Errors returned by the cache repository and its backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key or field not present
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Value could not be encoded before writing
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Stored value does not match the requested shape
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Backend command failed
    #[error("Store error: {0}")]
    Store(String),

    /// The command did not complete within the configured timeout
    #[error("Cache command timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Store(err.to_string())
    }
}

// == Result Type Aliases ==
/// Convenience Result type for the relational side.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Convenience Result type for the cache side.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
