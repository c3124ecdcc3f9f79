//! Aggregation error type.

use crate::provider::ProviderError;
use crate::reconcile::ReconcileError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    /// Rejected before any provider was called.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every provider that was asked failed.
    #[error("all providers unavailable: {}", join_causes(.causes))]
    AllProvidersUnavailable { causes: Vec<ProviderError> },

    /// The one provider able to answer failed.
    #[error(transparent)]
    ProviderUnavailable(ProviderError),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

fn join_causes(causes: &[ProviderError]) -> String {
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
