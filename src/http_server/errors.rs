//! # HTTP Errors
//!
//! Errors of the plain HTTP endpoints (everything except the JSON-RPC
//! envelope, which carries its own error object).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::functions::FunctionError;

/// Result type for HTTP handlers
pub type HttpResult<T> = Result<T, HttpError>;

/// HTTP endpoint errors
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// Malformed request body
    #[error("Invalid body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Function(#[from] FunctionError),
}

impl HttpError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            HttpError::Function(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<HttpError> for ErrorResponse {
    fn from(err: HttpError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
