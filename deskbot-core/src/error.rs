//! Error types for deskbot-core

use thiserror::Error;

use crate::storage;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// User-visible failures of core operations.
///
/// Provider failures never appear here: retrieval, composition and
/// classification absorb them into degraded results.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Response {0} is already being delivered")]
    DeliveryInFlight(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::Error),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Failures while handing a response to the transport.
///
/// These are logged and swallowed by delivery; the response keeps its
/// pre-delivery status.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("No delivery sink is configured")]
    NotConfigured,

    #[error("Failed to record delivery: {0}")]
    Record(#[from] storage::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Send(err.to_string())
    }
}
