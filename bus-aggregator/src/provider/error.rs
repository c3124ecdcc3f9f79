//! Provider-level error type.

use crate::domain::Provider;

/// Failure of one call to one provider.
///
/// Client-specific errors are folded into these two cases at the client
/// boundary, so callers never see transport or parse details as types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure, timeout, bad status, or unreadable response.
    #[error("{provider} unavailable: {cause}")]
    Unavailable { provider: Provider, cause: String },

    /// The requested record does not exist upstream (any more).
    #[error("{provider}: {what} not found")]
    NotFound { provider: Provider, what: String },
}

impl ProviderError {
    pub fn unavailable(provider: Provider, cause: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            provider,
            cause: cause.into(),
        }
    }

    pub fn not_found(provider: Provider, what: impl Into<String>) -> Self {
        ProviderError::NotFound {
            provider,
            what: what.into(),
        }
    }

    /// The provider that failed.
    pub fn provider(&self) -> Provider {
        match self {
            ProviderError::Unavailable { provider, .. } | ProviderError::NotFound { provider, .. } => {
                *provider
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}
