//! # Invocation Errors

use thiserror::Error;

use crate::db::DbError;

/// Result type for registry, catalog and invocation operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// JSON-RPC error codes
pub mod rpc_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const SERVER_ERROR: i64 = -32000;
}

/// Invocation errors
#[derive(Debug, Clone, Error)]
pub enum FunctionError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Missed required arg: {0}")]
    MissingRequiredArgument(String),

    /// A read-only call resolved to a method that writes
    #[error("Method {0} is not read-only; use POST /rpc")]
    NotReadOnly(String),

    /// A singular method did not return exactly one row
    #[error("Single row must be returned, got {0}")]
    Cardinality(usize),

    #[error("Catalog load failed: {0}")]
    CatalogLoad(String),

    /// Connection resource failure, passed through as-is
    #[error(transparent)]
    Database(#[from] DbError),
}

impl FunctionError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            FunctionError::MethodNotFound(_) => 404,
            FunctionError::MissingRequiredArgument(_) => 400,
            FunctionError::NotReadOnly(_) => 405,
            FunctionError::Cardinality(_) => 500,
            FunctionError::CatalogLoad(_) => 500,
            FunctionError::Database(e) => e.status_code(),
        }
    }

    /// Get JSON-RPC error code
    pub fn rpc_code(&self) -> i64 {
        match self {
            FunctionError::MethodNotFound(_) => rpc_codes::METHOD_NOT_FOUND,
            FunctionError::MissingRequiredArgument(_) => rpc_codes::INVALID_PARAMS,
            FunctionError::NotReadOnly(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::SERVER_ERROR,
        }
    }

    /// Stable error code string for CLI output
    pub fn code(&self) -> &'static str {
        match self {
            FunctionError::MethodNotFound(_) => "RPC_METHOD_NOT_FOUND",
            FunctionError::MissingRequiredArgument(_) => "RPC_MISSING_ARGUMENT",
            FunctionError::NotReadOnly(_) => "RPC_NOT_READ_ONLY",
            FunctionError::Cardinality(_) => "RPC_CARDINALITY",
            FunctionError::CatalogLoad(_) => "RPC_CATALOG_LOAD",
            FunctionError::Database(_) => "RPC_DATABASE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FunctionError::MethodNotFound("x".into()).status_code(), 404);
        assert_eq!(FunctionError::MissingRequiredArgument("id".into()).status_code(), 400);
        assert_eq!(FunctionError::Cardinality(0).status_code(), 500);
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(FunctionError::MethodNotFound("x".into()).rpc_code(), -32601);
        assert_eq!(FunctionError::MissingRequiredArgument("id".into()).rpc_code(), -32602);
        assert_eq!(FunctionError::Cardinality(2).rpc_code(), -32000);
    }

    #[test]
    fn test_database_error_is_transparent() {
        let err = FunctionError::from(DbError::Query("division by zero".into()));
        assert_eq!(err.to_string(), "division by zero");
    }
}
