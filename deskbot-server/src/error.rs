//! Server error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop the server itself
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body of every failed API call
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Failure of a single API request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] deskbot_core::Error),

    /// The AI provider behind a direct query failed
    #[error("provider error: {0}")]
    Provider(#[from] deskbot_models::Error),
}

impl From<deskbot_core::storage::Error> for ApiError {
    fn from(err: deskbot_core::storage::Error) -> Self {
        Self::Core(err.into())
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Core(deskbot_core::Error::Validation(message.into()))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        use deskbot_core::Error;
        match self {
            Self::Core(Error::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Core(Error::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Core(Error::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION")
            }
            Self::Core(Error::DeliveryInFlight(_)) => (StatusCode::CONFLICT, "DELIVERY_IN_FLIGHT"),
            Self::Core(Error::Storage(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: code.into(),
            }),
        )
            .into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
