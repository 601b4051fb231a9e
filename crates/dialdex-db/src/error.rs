//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Unique constraint violated
    #[error("duplicate record")]
    Duplicate,
}

impl DbError {
    /// Map a sqlx error, turning unique-constraint violations into `Duplicate`
    pub fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate,
            _ => Self::Sqlx(err),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
