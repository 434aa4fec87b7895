//! Error types for the dealflow engine

use crate::types::RankError;
use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for dealflow operations
pub type Result<T> = std::result::Result<T, DealflowError>;

/// Errors that can occur in dealflow operations
#[derive(Debug, Error)]
pub enum DealflowError {
    /// Schema has not been migrated yet
    #[error("database not initialized at {path}")]
    NotInitialized { path: PathBuf },

    /// Card missing or soft-deleted
    #[error("card not found: {id}")]
    CardNotFound { id: String },

    /// Generic resource not found (neighbors, stages, records)
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Target column is not a valid discriminator value for the board
    #[error("invalid column '{column}' for {kind} board")]
    InvalidColumn { kind: String, column: String },

    /// Neighbors out of order or not in the target column (stale client)
    #[error("invalid ordering: {message}")]
    InvalidOrdering { message: String },

    /// Unknown feed filter value
    #[error("invalid filter {field}: {value}")]
    InvalidFilter { field: String, value: String },

    /// Invalid field value
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// No rank fits between the neighbors; the column needs re-ranking
    #[error("rank space exhausted (max {max_len} digits)")]
    RankExhausted { max_len: usize },

    /// Another writer took the same rank first
    #[error("rank conflict: {message}")]
    RankConflict { message: String },

    /// Database locked by another writer past the busy timeout
    #[error("database busy - another operation in progress")]
    Busy,

    /// Failure injected by a test fail point
    #[error("injected failure at {point}")]
    FailPoint { point: String },

    /// SQLite error
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl DealflowError {
    /// Create an invalid ordering error
    pub fn invalid_ordering(message: impl Into<String>) -> Self {
        Self::InvalidOrdering {
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Treat a unique-index violation as a rank conflict, anything else as usual
    pub(crate) fn from_position_write(err: rusqlite::Error, context: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::RankConflict {
                    message: context.to_string(),
                }
            }
            _ => err.into(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RankConflict { .. } | Self::Busy)
    }

    /// Validation failures caused by caller input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidColumn { .. }
                | Self::InvalidOrdering { .. }
                | Self::InvalidFilter { .. }
                | Self::InvalidValue { .. }
        )
    }
}

impl From<rusqlite::Error> for DealflowError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::Busy,
            _ => Self::Database(err),
        }
    }
}

impl From<figment::Error> for DealflowError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<RankError> for DealflowError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::Exhausted { max_len } => Self::RankExhausted { max_len },
            RankError::Unordered { .. } => Self::invalid_ordering(err.to_string()),
            other => Self::invalid_value("rank", other.to_string()),
        }
    }
}
