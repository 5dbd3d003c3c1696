//! Error types for the gateway
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Attempt Error ==
/// Why a single upstream attempt failed.
///
/// Never returned to callers of the fetcher; every variant is either retried
/// or folded into [`NetworkFailure`].
#[derive(Error, Debug)]
pub enum AttemptError {
    /// No response within the request deadline
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection refused, DNS failure, reset, and similar
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP error! status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Response body was not valid JSON
    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

// == Network Failure ==
/// The only error the fetcher surfaces: every attempt was used up.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Network request failed. Please check your connection.")]
pub struct NetworkFailure;

// == Config Error ==
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting has an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The outbound HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// == Gateway Error Enum ==
/// Errors returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream could not be reached after all retries
    #[error(transparent)]
    Network(#[from] NetworkFailure),
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;
