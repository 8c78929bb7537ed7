//! Database error types.

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur talking to Postgres.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("No product row with id {0}")]
    RowNotFound(i64),

    #[error("Migration {name} failed: {message}")]
    Migration { name: String, message: String },
}

impl DbError {
    pub fn migration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Migration {
            name: name.into(),
            message: message.into(),
        }
    }
}
