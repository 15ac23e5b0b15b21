//! API client error type.

use sonarcheck_core::error::{HarnessError, ServerError};

/// Errors raised while talking to the quality server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, ...)
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// Non-success HTTP status on an endpoint whose response is consumed
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Response body did not have the expected shape
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// Base URL rejected at construction
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<ApiError> for HarnessError {
    fn from(err: ApiError) -> Self {
        let server = match err {
            ApiError::Request { endpoint, reason } => ServerError::Request { endpoint, reason },
            ApiError::Status { endpoint, status } => ServerError::Status { endpoint, status },
            ApiError::Decode { endpoint, reason } => ServerError::Decode { endpoint, reason },
            ApiError::InvalidUrl { url, reason } => ServerError::Request {
                endpoint: url,
                reason,
            },
        };
        HarnessError::Server(server)
    }
}
