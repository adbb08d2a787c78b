//! Transport boundary for the content API.
//!
//! The feed controller only ever talks to a [`ContentGateway`]: an opaque
//! pair of "read" (fetch by path) and "submit" (fetch with a JSON body)
//! operations that return parsed JSON. [`HttpGateway`] is the production
//! implementation over `reqwest`.

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::{GatewayOptions, HttpGateway};

use crate::util::UrlValidationError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a gateway call.
///
/// Every variant is a transport-level failure from the controller's point of
/// view; "not found" and "empty" are decided from successfully parsed JSON.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Body could not be encoded, or the response was not the expected JSON shape
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Base URL failed validation
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
}

impl GatewayError {
    /// Returns true if this error is transient and the request should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout => true,
            // A request that could not even be built will fail the same way again
            GatewayError::Network(e) => !e.is_builder(),
            GatewayError::HttpStatus(status) => *status == 429 || *status >= 500,
            GatewayError::ResponseTooLarge(_)
            | GatewayError::Json(_)
            | GatewayError::InvalidBaseUrl(_) => false,
        }
    }
}

/// Read/submit access to the content API.
///
/// Both operations must be idempotent on the server side; callers may repeat
/// them freely.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Fetch the JSON document at `path`.
    async fn read(&self, path: &str) -> Result<Value, GatewayError>;

    /// Send `body` as JSON to `path` and return the JSON response.
    async fn submit(&self, path: &str, body: &Value) -> Result<Value, GatewayError>;
}

#[async_trait]
impl<G: ContentGateway + ?Sized> ContentGateway for Arc<G> {
    async fn read(&self, path: &str) -> Result<Value, GatewayError> {
        (**self).read(path).await
    }

    async fn submit(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        (**self).submit(path, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(GatewayError::HttpStatus(429).is_retryable());
        assert!(GatewayError::HttpStatus(503).is_retryable());
        assert!(!GatewayError::HttpStatus(404).is_retryable());
        assert!(GatewayError::Timeout.is_retryable());
        assert!(!GatewayError::ResponseTooLarge(10).is_retryable());
    }
}
