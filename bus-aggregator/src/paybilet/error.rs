//! Paybilet API error types.

use crate::domain::Provider;
use crate::provider::ProviderError;

/// Errors that can occur when interacting with the Paybilet API.
#[derive(Debug, thiserror::Error)]
pub enum PaybiletError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed
    #[error("unauthorized: check PAYBILET_TOKEN")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Envelope reported `success: false`
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Requested station or race does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Client misconfigured (e.g. unusable token)
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<PaybiletError> for ProviderError {
    fn from(err: PaybiletError) -> Self {
        match err {
            PaybiletError::NotFound(what) => ProviderError::not_found(Provider::Paybilet, what),
            other => ProviderError::unavailable(Provider::Paybilet, other.to_string()),
        }
    }
}
