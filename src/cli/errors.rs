//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::functions::FunctionError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or flag error
    #[error("DBRPC_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    /// I/O error (stdin/stdout)
    #[error("DBRPC_CLI_IO_ERROR: {0}")]
    Io(String),

    /// Connect or first catalog load failed
    #[error("DBRPC_CLI_STARTUP_FAILED: {0}")]
    Startup(String),

    /// HTTP listener failed
    #[error("DBRPC_CLI_SERVER_FAILED: {0}")]
    Server(String),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "DBRPC_CLI_CONFIG_ERROR",
            CliError::Io(_) => "DBRPC_CLI_IO_ERROR",
            CliError::Startup(_) => "DBRPC_CLI_STARTUP_FAILED",
            CliError::Server(_) => "DBRPC_CLI_SERVER_FAILED",
        }
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            CliError::Config(m) | CliError::Io(m) | CliError::Startup(m) | CliError::Server(m) => m,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}

impl From<FunctionError> for CliError {
    fn from(e: FunctionError) -> Self {
        CliError::Startup(e.to_string())
    }
}
