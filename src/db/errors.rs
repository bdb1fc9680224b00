//! # Database Errors

use std::error::Error as StdError;

use thiserror::Error;

/// Result type for connection resource operations
pub type DbResult<T> = Result<T, DbError>;

/// Connection resource errors
#[derive(Debug, Clone, Error)]
pub enum DbError {
    #[error("Invalid connection config: {0}")]
    Config(String),

    #[error("DB connect failed: {0}")]
    Connect(String),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("{0}")]
    Query(String),

    #[error("Cannot bind parameter: {0}")]
    Bind(String),

    #[error("Cannot decode column: {0}")]
    Decode(String),
}

impl DbError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            DbError::Config(_) => 500,
            DbError::Connect(_) => 503,
            DbError::Pool(_) => 503,
            DbError::Query(_) => 500,
            DbError::Bind(_) => 400,
            DbError::Decode(_) => 500,
        }
    }

    /// Text of a driver error
    ///
    /// Server-side errors carry the message raised by the stored function;
    /// anything else falls back to the driver's own description.
    pub fn describe(e: &tokio_postgres::Error) -> String {
        match e.as_db_error() {
            Some(db) => db.message().to_string(),
            None => e.to_string(),
        }
    }
}

/// First `DbError` in the source chain of `e`
///
/// Parameter encoding failures are raised as `DbError::Bind` inside the
/// driver and come back wrapped in its own error type.
fn find_in_sources(e: &(dyn StdError + 'static)) -> Option<DbError> {
    let mut current = e.source();
    while let Some(err) = current {
        if let Some(db) = err.downcast_ref::<DbError>() {
            return Some(db.clone());
        }
        current = err.source();
    }
    None
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        find_in_sources(&e).unwrap_or_else(|| DbError::Query(DbError::describe(&e)))
    }
}
