//! Error types for polydb

use polysource::MediaError;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Result type for polydb
pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for MediaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => MediaError::NotFound(what),
            DbError::InvalidRecord(what) => MediaError::Deserialization(what),
            other => MediaError::Io(other.to_string()),
        }
    }
}
