// src/error/types.rs
use crate::domain::species::UnknownSpecies;
use crate::domain::DomainError;
use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage did not respond within its timeout. Retryable by the
    /// caller with backoff; the background sweep retries next cycle.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A multi-record atomic update could not be completed as a unit.
    /// Always rolled back, never downgraded to a partial write.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Other error: {0}")]
    Other(String),
}

impl AppError {
    /// Whether the caller may retry the failed operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

// Busy/locked means the store did not respond inside its busy timeout,
// which callers treat as retryable rather than as a hard failure.
impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                AppError::StorageUnavailable(err.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Other(format!("UUID error: {}", err))
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::Other(format!("Date parse error: {}", err))
    }
}

// Pool checkout failures are timeouts waiting for a connection.
impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }
}

impl From<UnknownSpecies> for AppError {
    fn from(err: UnknownSpecies) -> Self {
        AppError::Configuration(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
