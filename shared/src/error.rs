//! Error types for the calendar events API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::json_response;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving calendar requests.
#[derive(Error, Debug)]
pub enum Error {
    /// Query or procedure execution failed
    #[error("{0}")]
    Database(#[from] tiberius::error::Error),

    /// A pooled connection could not be established or checked out
    #[error("{0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed request parameter
    #[error("{0}")]
    BadRequest(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

impl<E: std::fmt::Display> From<bb8::RunError<E>> for Error {
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(e) => Error::Connection(e.to_string()),
            bb8::RunError::TimedOut => {
                Error::Connection("Timed out waiting for a database connection".to_string())
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        json_response(status, &serde_json::json!({ "error": self.to_string() }))
    }
}
