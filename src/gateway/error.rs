//! Error types for the job gateway.
//!
//! [`GatewayError`] covers the three ways a gateway call can go wrong: the
//! backend answered with a non-success status, the request never completed,
//! or the body could not be decoded.

use thiserror::Error;

/// Errors returned by a [`JobGateway`](super::JobGateway) call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend returned a non-2xx status.
    /// Carries the HTTP status code and the response body as message.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Underlying transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to parse gateway response: {0}")]
    Parse(String),
}

impl GatewayError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }
}
