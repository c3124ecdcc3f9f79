//! GDS client error types.

use std::fmt;

use crate::domain::Provider;
use crate::provider::ProviderError;

/// Errors from the GDS gateway client.
#[derive(Debug)]
pub enum GdsError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// Gateway returned an error status code
    ApiError { status: u16, message: String },

    /// The SOAP service answered with a fault
    Fault { code: Option<String>, message: String },

    /// Invalid credentials
    Unauthorized,

    /// Requested point or race does not exist
    NotFound(String),
}

impl fmt::Display for GdsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GdsError::Http(e) => {
                if e.is_timeout() {
                    write!(f, "request timed out: {e}")
                } else {
                    write!(f, "HTTP error: {e}")
                }
            }
            GdsError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            GdsError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            GdsError::Fault { code, message } => match code {
                Some(code) => write!(f, "SOAP fault {code}: {message}"),
                None => write!(f, "SOAP fault: {message}"),
            },
            GdsError::Unauthorized => write!(f, "unauthorized (check GDS_USERNAME/GDS_PASSWORD)"),
            GdsError::NotFound(what) => write!(f, "{what} not found"),
        }
    }
}

impl std::error::Error for GdsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GdsError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GdsError {
    fn from(err: reqwest::Error) -> Self {
        GdsError::Http(err)
    }
}

impl From<GdsError> for ProviderError {
    fn from(err: GdsError) -> Self {
        match err {
            GdsError::NotFound(what) => ProviderError::not_found(Provider::Gds, what),
            other => ProviderError::unavailable(Provider::Gds, other.to_string()),
        }
    }
}
